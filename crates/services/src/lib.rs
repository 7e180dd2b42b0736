#![forbid(unsafe_code)]

pub mod account_service;
pub mod app_services;
pub mod auth;
pub mod dashboard_service;
pub mod error;
pub mod history_service;
pub mod plan_service;
pub mod progression_service;
pub mod session_service;
pub mod views;

pub use focus_core::Clock;

pub use account_service::AccountService;
pub use app_services::AppServices;
pub use auth::{AuthError, AuthSession, Authenticator};
pub use dashboard_service::DashboardService;
pub use error::{AccountError, AppServicesError, Fallback, ServiceError};
pub use history_service::HistoryService;
pub use plan_service::PlanService;
pub use progression_service::ProgressionService;
pub use session_service::WorkSessionService;
pub use views::{DashboardView, HistoryView, ProgressionStatus, SessionEntry};
