//! User accounts: registration, password login, profiles and sessions.

pub mod password;
pub mod session;
pub mod users;

use validator::ValidationErrors;

pub use self::users::{
    authenticate, create_superuser, find_user, find_user_by_email, get_profile, register,
    update_profile,
};

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("{0}")]
    Invalid(String),

    #[error("A user with that email already exists.")]
    EmailTaken,

    #[error("User not found")]
    NotFound,

    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl AccountError {
    /// Errors shown back to the user next to the form.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, AccountError::Invalid(_) | AccountError::EmailTaken)
    }
}

impl From<ValidationErrors> for AccountError {
    fn from(errors: ValidationErrors) -> Self {
        AccountError::Invalid(crate::forms::error_messages(&errors).join("; "))
    }
}
