use crate::model::ids::UserId;

/// An account holder. The password hash is opaque to the core; it is produced
/// and checked by the host's authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
}
