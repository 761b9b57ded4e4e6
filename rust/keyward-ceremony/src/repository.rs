use crate::{PendingCeremony, RepositoryError};
use async_trait::async_trait;
use keyward_credentials::AuthenticatorRecord;
use serde::{Deserialize, Serialize};

/// A user and the authenticators registered to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique username.
    #[serde(rename = "name")]
    pub username: String,
    /// Name shown by the authenticator.
    pub display_name: String,
    /// base64url user handle.
    pub id: String,
    /// Whether a credential has been registered.
    pub registered: bool,
    /// Registered credentials.
    pub authenticators: Vec<AuthenticatorRecord>,
}

impl User {
    /// A user who has not registered a credential yet.
    pub fn unregistered(
        username: impl Into<String>,
        display_name: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            display_name: display_name.into(),
            id: id.into(),
            registered: false,
            authenticators: Vec::new(),
        }
    }

    /// The registered credential with `credential_id`.
    pub fn authenticator(&self, credential_id: &[u8]) -> Option<&AuthenticatorRecord> {
        self.authenticators
            .iter()
            .find(|authenticator| authenticator.credential_id == credential_id)
    }
}

/// Persistent storage for users and their credentials.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// The user named `username`.
    async fn get(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    /// The owner of `credential_id` and the credential's record.
    async fn get_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<(User, AuthenticatorRecord)>, RepositoryError>;

    /// Insert a new user. Fails with [`RepositoryError::UserExists`] if the
    /// username is taken.
    async fn add(&self, user: User) -> Result<(), RepositoryError>;

    /// Replace an existing user. Fails with [`RepositoryError::UnknownUser`]
    /// if there is none.
    async fn update(&self, user: User) -> Result<(), RepositoryError>;

    /// Append `record` to the authenticators of `username` and mark the user
    /// registered. Fails with [`RepositoryError::CredentialExists`] if any user
    /// already holds a credential with the same id. The uniqueness check and
    /// the write are one atomic step.
    async fn add_authenticator(
        &self,
        username: &str,
        record: AuthenticatorRecord,
    ) -> Result<(), RepositoryError>;

    /// Set the counter of `credential_id` to `new` if it currently holds
    /// `expected`, atomically. Returns whether the counter was written.
    async fn update_sign_count(
        &self,
        credential_id: &[u8],
        expected: u32,
        new: u32,
    ) -> Result<bool, RepositoryError>;
}

/// Storage for challenges awaiting a response, at most one per user.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Store `pending`, replacing any challenge pending for the same user.
    async fn put(&self, pending: PendingCeremony) -> Result<(), RepositoryError>;

    /// Remove and return the challenge pending for `username`.
    async fn take(&self, username: &str) -> Result<Option<PendingCeremony>, RepositoryError>;

    /// The challenge pending for `username`, left in place.
    async fn peek(&self, username: &str) -> Result<Option<PendingCeremony>, RepositoryError>;
}
