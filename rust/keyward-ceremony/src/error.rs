use keyward_credentials::{ErrorKind, VerificationError};
use thiserror::Error;

/// Failures reported by a [`UserRepository`](crate::UserRepository) or a
/// [`ChallengeStore`](crate::ChallengeStore).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A user with this name already exists.
    #[error("user {0:?} already exists")]
    UserExists(String),

    /// No user with this name exists.
    #[error("unknown user {0:?}")]
    UnknownUser(String),

    /// A credential with this base64url id is already stored.
    #[error("credential {0} already exists")]
    CredentialExists(String),

    /// The backing store failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// The configuration cannot be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The origin is not a serialized `scheme://host[:port]` origin.
    #[error("invalid origin {origin:?}: {reason}")]
    InvalidOrigin {
        /// The configured origin.
        origin: String,
        /// Why it was refused.
        reason: String,
    },

    /// The relying party identifier is empty.
    #[error("relying party id must not be empty")]
    EmptyRpId,

    /// The challenge timeout is zero.
    #[error("challenge timeout must be positive")]
    ZeroTimeout,

    /// An environment variable could not be parsed.
    #[error("invalid value {value:?} for {variable}")]
    InvalidVariable {
        /// The variable name.
        variable: &'static str,
        /// The value found.
        value: String,
    },
}

/// Errors from registration and login ceremonies.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CeremonyError {
    /// Registration was requested for a user who already registered.
    #[error("username {0:?} is already registered")]
    UsernameTaken(String),

    /// The user does not exist.
    #[error("unknown user {0:?}")]
    UnknownUser(String),

    /// Login was requested for a user without a registered credential.
    #[error("user {0:?} is not registered")]
    NotRegistered(String),

    /// The credential is already registered to some user.
    #[error("credential {0} is already registered")]
    CredentialExists(String),

    /// The response did not verify.
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// The repository or challenge store failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CeremonyError {
    /// The verification failure category, if verification failed.
    pub fn verification_kind(&self) -> Option<ErrorKind> {
        match self {
            CeremonyError::Verification(error) => Some(error.kind()),
            _ => None,
        }
    }
}

impl From<keyward_credentials::PolicyViolation> for CeremonyError {
    fn from(violation: keyward_credentials::PolicyViolation) -> Self {
        CeremonyError::Verification(violation.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_credentials::PolicyViolation;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_reports_the_kind_of_verification_failures() {
        let error = CeremonyError::from(PolicyViolation::ChallengeExpired);
        assert_eq!(error.verification_kind(), Some(ErrorKind::Policy));

        let error = CeremonyError::from(VerificationError::SignatureInvalid);
        assert_eq!(
            error.verification_kind(),
            Some(ErrorKind::CryptoVerificationFailure)
        );

        let error = CeremonyError::UsernameTaken("alice".into());
        assert_eq!(error.verification_kind(), None);
    }

    #[test]
    fn it_displays_wrapped_errors_transparently() {
        let error = CeremonyError::from(RepositoryError::Storage("disk full".into()));
        assert_eq!(error.to_string(), "storage failure: disk full");
    }
}
