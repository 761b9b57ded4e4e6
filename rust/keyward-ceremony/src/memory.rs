//! In-memory repositories.
//!
//! [`MemoryUserRepository`] and [`MemoryChallengeStore`] keep everything in
//! process memory, for tests and local development. Clones share state.

use crate::{ChallengeStore, PendingCeremony, RepositoryError, User, UserRepository};
use async_trait::async_trait;
use keyward_credentials::AuthenticatorRecord;
use parking_lot::{Mutex, RwLock};
use std::{collections::BTreeMap, sync::Arc};

/// A [`UserRepository`] in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserRepository {
    users: Arc<RwLock<BTreeMap<String, User>>>,
}

impl MemoryUserRepository {
    /// An empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Whether no user is stored.
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn get(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().get(username).cloned())
    }

    async fn get_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<(User, AuthenticatorRecord)>, RepositoryError> {
        let users = self.users.read();
        let found = users.values().find_map(|user| {
            user.authenticator(credential_id)
                .map(|record| (user.clone(), record.clone()))
        });
        Ok(found)
    }

    async fn add(&self, user: User) -> Result<(), RepositoryError> {
        let mut users = self.users.write();
        if users.contains_key(&user.username) {
            return Err(RepositoryError::UserExists(user.username));
        }
        users.insert(user.username.clone(), user);
        Ok(())
    }

    async fn update(&self, user: User) -> Result<(), RepositoryError> {
        let mut users = self.users.write();
        match users.get_mut(&user.username) {
            Some(existing) => {
                *existing = user;
                Ok(())
            }
            None => Err(RepositoryError::UnknownUser(user.username)),
        }
    }

    async fn add_authenticator(
        &self,
        username: &str,
        record: AuthenticatorRecord,
    ) -> Result<(), RepositoryError> {
        let mut users = self.users.write();
        if users
            .values()
            .any(|user| user.authenticator(&record.credential_id).is_some())
        {
            return Err(RepositoryError::CredentialExists(
                record.credential_id_base64url(),
            ));
        }
        let user = users
            .get_mut(username)
            .ok_or_else(|| RepositoryError::UnknownUser(username.to_string()))?;
        user.authenticators.push(record);
        user.registered = true;
        Ok(())
    }

    async fn update_sign_count(
        &self,
        credential_id: &[u8],
        expected: u32,
        new: u32,
    ) -> Result<bool, RepositoryError> {
        let mut users = self.users.write();
        let record = users
            .values_mut()
            .flat_map(|user| user.authenticators.iter_mut())
            .find(|record| record.credential_id == credential_id);

        match record {
            Some(record) if record.sign_count == expected => {
                record.sign_count = new;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// A [`ChallengeStore`] in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryChallengeStore {
    pending: Arc<Mutex<BTreeMap<String, PendingCeremony>>>,
}

impl MemoryChallengeStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn put(&self, pending: PendingCeremony) -> Result<(), RepositoryError> {
        self.pending.lock().insert(pending.username.clone(), pending);
        Ok(())
    }

    async fn take(&self, username: &str) -> Result<Option<PendingCeremony>, RepositoryError> {
        Ok(self.pending.lock().remove(username))
    }

    async fn peek(&self, username: &str) -> Result<Option<PendingCeremony>, RepositoryError> {
        Ok(self.pending.lock().get(username).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Challenge;
    use keyward_credentials::{AttestationFormat, CeremonyType};
    use pretty_assertions::assert_eq;
    use rand_chacha::{ChaCha20Rng, rand_core::SeedableRng};
    use std::time::SystemTime;
    use testresult::TestResult;

    fn registered(username: &str, credential_id: Vec<u8>, sign_count: u32) -> User {
        let mut user = User::unregistered(username, username, "aWQ");
        user.registered = true;
        user.authenticators.push(AuthenticatorRecord {
            credential_id,
            format: AttestationFormat::FidoU2f,
            public_key: vec![4; 65],
            sign_count,
        });
        user
    }

    #[tokio::test]
    async fn it_refuses_to_add_an_existing_user() -> TestResult {
        let users = MemoryUserRepository::new();
        users.add(User::unregistered("alice", "Alice", "aWQ")).await?;

        assert_eq!(
            users.add(User::unregistered("alice", "Other", "b3Ro")).await,
            Err(RepositoryError::UserExists("alice".into()))
        );
        assert_eq!(users.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn it_refuses_to_update_an_unknown_user() {
        let users = MemoryUserRepository::new();
        assert_eq!(
            users.update(User::unregistered("bob", "Bob", "aWQ")).await,
            Err(RepositoryError::UnknownUser("bob".into()))
        );
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn it_finds_users_by_credential_id() -> TestResult {
        let users = MemoryUserRepository::new();
        users.add(registered("alice", vec![1], 0)).await?;
        users.add(registered("bob", vec![2], 0)).await?;

        let (owner, record) = users
            .get_by_credential_id(&[2])
            .await?
            .ok_or("credential not found")?;
        assert_eq!(owner.username, "bob");
        assert_eq!(record.credential_id, vec![2]);
        assert_eq!(users.get_by_credential_id(&[3]).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn it_adds_an_authenticator_and_marks_the_user_registered() -> TestResult {
        let users = MemoryUserRepository::new();
        users.add(User::unregistered("alice", "Alice", "aWQ")).await?;
        let record = registered("alice", vec![1], 0).authenticators.remove(0);

        users.add_authenticator("alice", record.clone()).await?;
        let alice = users.get("alice").await?.ok_or("alice not found")?;
        assert!(alice.registered);
        assert_eq!(alice.authenticators, vec![record.clone()]);

        assert_eq!(
            users.add_authenticator("carol", record).await,
            Err(RepositoryError::CredentialExists("AQ".into()))
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_stores_a_credential_id_for_only_one_of_two_racing_users() -> TestResult {
        let users = MemoryUserRepository::new();
        users.add(User::unregistered("alice", "Alice", "aWQ")).await?;
        users.add(User::unregistered("bob", "Bob", "Ym9i")).await?;
        let record = registered("alice", vec![7; 16], 0).authenticators.remove(0);

        let (alice, bob) = tokio::join!(
            users.add_authenticator("alice", record.clone()),
            users.add_authenticator("bob", record.clone()),
        );
        assert_eq!(
            [alice.is_ok(), bob.is_ok()].iter().filter(|ok| **ok).count(),
            1
        );

        let mut owners = 0;
        for username in ["alice", "bob"] {
            let user = users.get(username).await?.ok_or("user not found")?;
            owners += user.authenticators.len();
        }
        assert_eq!(owners, 1);
        Ok(())
    }

    #[tokio::test]
    async fn it_refuses_an_authenticator_for_an_unknown_user() -> TestResult {
        let users = MemoryUserRepository::new();
        let record = registered("alice", vec![1], 0).authenticators.remove(0);

        assert_eq!(
            users.add_authenticator("alice", record).await,
            Err(RepositoryError::UnknownUser("alice".into()))
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_swaps_the_counter_only_from_the_expected_value() -> TestResult {
        let users = MemoryUserRepository::new();
        users.add(registered("alice", vec![1], 5)).await?;

        assert!(!users.update_sign_count(&[1], 4, 6).await?);
        assert!(users.update_sign_count(&[1], 5, 6).await?);
        assert!(!users.update_sign_count(&[1], 5, 7).await?);
        assert!(!users.update_sign_count(&[9], 6, 7).await?);

        let alice = users.get("alice").await?.ok_or("alice not found")?;
        assert_eq!(alice.authenticators[0].sign_count, 6);
        Ok(())
    }

    #[tokio::test]
    async fn it_hands_out_a_pending_challenge_once() -> TestResult {
        let store = MemoryChallengeStore::new();
        let pending = PendingCeremony {
            username: "alice".into(),
            ceremony: CeremonyType::Get,
            challenge: Challenge::generate(&mut ChaCha20Rng::from_seed([0; 32])),
            issued_at: SystemTime::UNIX_EPOCH,
        };
        store.put(pending.clone()).await?;

        assert_eq!(store.peek("alice").await?, Some(pending.clone()));
        assert_eq!(store.take("alice").await?, Some(pending));
        assert_eq!(store.take("alice").await?, None);
        Ok(())
    }
}
