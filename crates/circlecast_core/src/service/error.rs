//! Service-level error taxonomy.

use crate::credentials::{CredentialError, InputError};
use crate::model::circle::CircleId;
use crate::model::message::MessageId;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Coarse error class callers map to transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Authentication,
    Authorization,
    NotFound,
    /// The request cannot be answered; never a business outcome.
    Infrastructure,
}

#[derive(Debug)]
pub enum ServiceError {
    InvalidInput(InputError),
    EmptyContent,
    InvalidCircleName(String),
    CannotBlockSelf,
    HandleTaken(String),
    EmailTaken(String),
    /// Unknown handle or wrong password; deliberately indistinguishable.
    InvalidCredentials,
    /// Unknown, expired or revoked session token.
    InvalidSession,
    Forbidden(&'static str),
    Blocked,
    UserNotFound(String),
    CircleNotFound(CircleId),
    MessageNotFound(MessageId),
    Repo(RepoError),
    Credential(CredentialError),
    /// A write succeeded but its follow-up did not.
    InconsistentState(&'static str),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_)
            | Self::EmptyContent
            | Self::InvalidCircleName(_)
            | Self::CannotBlockSelf => ErrorKind::Validation,
            Self::HandleTaken(_) | Self::EmailTaken(_) => ErrorKind::Conflict,
            Self::InvalidCredentials | Self::InvalidSession => ErrorKind::Authentication,
            Self::Forbidden(_) | Self::Blocked => ErrorKind::Authorization,
            Self::UserNotFound(_) | Self::CircleNotFound(_) | Self::MessageNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::Repo(_) | Self::Credential(_) | Self::InconsistentState(_) => {
                ErrorKind::Infrastructure
            }
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "{err}"),
            Self::EmptyContent => write!(f, "content cannot be empty"),
            Self::InvalidCircleName(name) => write!(f, "invalid circle name: `{name}`"),
            Self::CannotBlockSelf => write!(f, "users cannot block themselves"),
            Self::HandleTaken(handle) => write!(f, "handle `{handle}` is already taken"),
            Self::EmailTaken(email) => write!(f, "email `{email}` is already registered"),
            Self::InvalidCredentials => write!(f, "invalid handle or password"),
            Self::InvalidSession => write!(f, "session is missing or expired"),
            Self::Forbidden(action) => write!(f, "not allowed to {action}"),
            Self::Blocked => write!(f, "blocked by the target user"),
            Self::UserNotFound(handle) => write!(f, "user not found: `{handle}`"),
            Self::CircleNotFound(circle_id) => write!(f, "circle not found: {circle_id}"),
            Self::MessageNotFound(message_id) => write!(f, "message not found: {message_id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Credential(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent graph state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Credential(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<InputError> for ServiceError {
    fn from(value: InputError) -> Self {
        Self::InvalidInput(value)
    }
}

impl From<CredentialError> for ServiceError {
    fn from(value: CredentialError) -> Self {
        Self::Credential(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, ServiceError};
    use crate::credentials::InputError;

    #[test]
    fn login_failures_classify_as_authentication() {
        assert_eq!(
            ServiceError::InvalidCredentials.kind(),
            ErrorKind::Authentication
        );
        assert_eq!(ServiceError::InvalidSession.kind(), ErrorKind::Authentication);
        assert_eq!(ServiceError::Blocked.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn input_errors_classify_as_validation() {
        let error = ServiceError::from(InputError::EmptyHandle);
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.to_string(), "handle is required");
    }
}
