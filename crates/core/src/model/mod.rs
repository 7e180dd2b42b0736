mod ids;
mod plan;
mod progression;
mod user;
mod work_session;

pub use ids::{ParseIdError, PlanId, ProgressionId, SessionId, UserId};

pub use plan::{FocusDuration, Plan, PlanError, PlanPatch, WorkDays};
pub use progression::{Progression, ProgressionType, ProgressionTypeError};
pub use user::User;
pub use work_session::{
    DifficultyRating, SessionPatch, SessionStatus, WorkSession, WorkSessionError,
};
