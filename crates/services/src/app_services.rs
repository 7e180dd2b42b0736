use std::sync::Arc;

use focus_core::generator::SessionGenerator;
use storage::repository::Storage;

use crate::Clock;
use crate::account_service::AccountService;
use crate::auth::Authenticator;
use crate::dashboard_service::DashboardService;
use crate::error::AppServicesError;
use crate::history_service::HistoryService;
use crate::plan_service::PlanService;
use crate::progression_service::ProgressionService;
use crate::session_service::WorkSessionService;

/// Assembles host-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    accounts: Arc<AccountService>,
    plans: Arc<PlanService>,
    sessions: Arc<WorkSessionService>,
    dashboard: Arc<DashboardService>,
    history: Arc<HistoryService>,
    progression: Arc<ProgressionService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, running migrations first.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        horizon_weeks: u32,
        auth: Arc<dyn Authenticator>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        tracing::info!(horizon_weeks, fixed_clock = clock.is_fixed(), "services ready");
        Ok(Self::from_storage(
            &storage,
            clock,
            SessionGenerator::with_horizon_weeks(horizon_weeks),
            auth,
        ))
    }

    /// Build services over process-local storage.
    #[must_use]
    pub fn in_memory(clock: Clock, auth: Arc<dyn Authenticator>) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, SessionGenerator::new(), auth)
    }

    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        generator: SessionGenerator,
        auth: Arc<dyn Authenticator>,
    ) -> Self {
        let accounts = Arc::new(AccountService::new(Arc::clone(&storage.users), auth));
        let plans = Arc::new(PlanService::new(
            clock,
            generator,
            Arc::clone(&storage.plans),
            Arc::clone(&storage.ledger),
        ));
        let sessions = Arc::new(WorkSessionService::new(
            clock,
            Arc::clone(&storage.plans),
            Arc::clone(&storage.sessions),
        ));
        let dashboard = Arc::new(DashboardService::new(
            clock,
            Arc::clone(&storage.plans),
            Arc::clone(&storage.sessions),
        ));
        let history = Arc::new(HistoryService::new(clock, Arc::clone(&storage.sessions)));
        let progression = Arc::new(ProgressionService::new(
            clock,
            Arc::clone(&storage.plans),
            Arc::clone(&storage.progressions),
            Arc::clone(&storage.ledger),
        ));

        Self {
            clock,
            accounts,
            plans,
            sessions,
            dashboard,
            history,
            progression,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn accounts(&self) -> Arc<AccountService> {
        Arc::clone(&self.accounts)
    }

    #[must_use]
    pub fn plans(&self) -> Arc<PlanService> {
        Arc::clone(&self.plans)
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<WorkSessionService> {
        Arc::clone(&self.sessions)
    }

    #[must_use]
    pub fn dashboard(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard)
    }

    #[must_use]
    pub fn history(&self) -> Arc<HistoryService> {
        Arc::clone(&self.history)
    }

    #[must_use]
    pub fn progression(&self) -> Arc<ProgressionService> {
        Arc::clone(&self.progression)
    }
}
