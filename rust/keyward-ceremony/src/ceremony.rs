use crate::{
    CeremonyError, Challenge, ChallengeStore, Clock, Config, CredentialCreationOptions,
    CredentialRequestOptions, PendingCeremony, RepositoryError, SystemClock, User, UserRepository,
    start_assertion, start_registration,
};
use keyward_credentials::{
    AssertionCredential, AuthenticatorRecord, CeremonyType, PolicyViolation,
    RegistrationCredential, RelyingParty, VerificationError,
};
use keyward_encoding::base64url;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand_core::{CryptoRngCore, RngCore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Random bytes in a user handle and in a session token.
const TOKEN_LEN: usize = 32;

/// A successful login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authenticated {
    /// The user who logged in.
    pub username: String,
    /// base64url id of the credential that signed.
    pub credential_id: String,
    /// The counter now stored for that credential.
    pub sign_count: u32,
    /// Random base64url token the host binds to its session.
    pub session_token: String,
}

impl std::fmt::Debug for Authenticated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticated")
            .field("username", &self.username)
            .field("credential_id", &self.credential_id)
            .field("sign_count", &self.sign_count)
            .finish_non_exhaustive()
    }
}

/// Where a user stands in the registration and login ceremonies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CeremonyState {
    /// No registered credential and no pending registration.
    Unregistered,
    /// A registration challenge is waiting for its response.
    RegistrationPending,
    /// Registered, with no pending login.
    Registered,
    /// A login challenge is waiting for its response.
    LoginPending,
}

/// A user's ceremony status. Never includes the pending challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CeremonyStatus {
    /// The user asked about.
    pub username: String,
    /// Current state.
    pub state: CeremonyState,
    /// Whether the user has a registered credential.
    pub registered: bool,
}

/// Runs registration and login ceremonies for a relying party.
///
/// Challenges are issued by the `begin_*` methods and consumed by the
/// matching `finish_*` method, whatever its outcome. Users and pending
/// challenges live in host-provided stores, so a `Ceremony` can be shared
/// between request handlers.
pub struct Ceremony<U, C> {
    config: Config,
    relying_party: RelyingParty,
    users: U,
    challenges: C,
    clock: Arc<dyn Clock>,
    rng: Mutex<Box<dyn CryptoRngCore + Send>>,
}

impl<U, C> std::fmt::Debug for Ceremony<U, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ceremony")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<U, C> Ceremony<U, C>
where
    U: UserRepository,
    C: ChallengeStore,
{
    /// A ceremony runner using the system clock and the operating system's
    /// random source.
    pub fn new(config: Config, users: U, challenges: C) -> Result<Self, CeremonyError> {
        config.validate()?;
        Ok(Self {
            relying_party: config.relying_party(),
            config,
            users,
            challenges,
            clock: Arc::new(SystemClock),
            rng: Mutex::new(Box::new(OsRng)),
        })
    }

    /// Use another clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Use another random source.
    pub fn with_rng(mut self, rng: impl CryptoRngCore + Send + 'static) -> Self {
        self.rng = Mutex::new(Box::new(rng));
        self
    }

    /// The configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The user repository.
    pub fn users(&self) -> &U {
        &self.users
    }

    /// The challenge store.
    pub fn challenges(&self) -> &C {
        &self.challenges
    }

    fn random_token(&self) -> String {
        let mut bytes = [0u8; TOKEN_LEN];
        self.rng.lock().fill_bytes(&mut bytes);
        base64url::encode(bytes)
    }

    async fn issue(
        &self,
        username: &str,
        ceremony: CeremonyType,
        challenge: Challenge,
    ) -> Result<(), CeremonyError> {
        let pending = PendingCeremony {
            username: username.to_string(),
            ceremony,
            challenge,
            issued_at: self.clock.now(),
        };
        self.challenges.put(pending).await?;
        Ok(())
    }

    /// Consume the challenge pending for `username`, which must belong to
    /// `ceremony` and must not have expired.
    async fn redeem(
        &self,
        username: &str,
        ceremony: CeremonyType,
    ) -> Result<PendingCeremony, CeremonyError> {
        let pending = self
            .challenges
            .take(username)
            .await?
            .filter(|pending| pending.ceremony == ceremony)
            .ok_or(PolicyViolation::NoPendingChallenge)?;

        if pending.is_expired(self.clock.now(), self.config.challenge_timeout) {
            return Err(PolicyViolation::ChallengeExpired.into());
        }
        Ok(pending)
    }

    /// Start registering a credential for `username`.
    ///
    /// A user who has not finished registering gets a fresh user handle; a
    /// registered user is refused.
    pub async fn begin_registration(
        &self,
        username: &str,
        display_name: &str,
    ) -> Result<CredentialCreationOptions, CeremonyError> {
        let existing = self.users.get(username).await?;
        if existing.as_ref().is_some_and(|user| user.registered) {
            tracing::debug!(username, "registration refused, username taken");
            return Err(CeremonyError::UsernameTaken(username.to_string()));
        }

        let user = User::unregistered(username, display_name, self.random_token());
        let options = {
            let mut rng = self.rng.lock();
            start_registration(&mut **rng, &self.config, username, display_name, &user.id)
        };

        match existing {
            Some(_) => self.users.update(user).await?,
            None => self.users.add(user).await?,
        }
        self.issue(username, CeremonyType::Create, options.challenge.clone())
            .await?;

        tracing::info!(username, "registration challenge issued");
        Ok(options)
    }

    /// Verify the registration response for `username` and store the new
    /// credential.
    ///
    /// # Errors
    ///
    /// Fails without a matching pending challenge, when the response does not
    /// verify, and with [`CeremonyError::CredentialExists`] when any user
    /// already holds the credential.
    pub async fn finish_registration(
        &self,
        username: &str,
        credential: &RegistrationCredential,
    ) -> Result<AuthenticatorRecord, CeremonyError> {
        let result = self.register(username, credential).await;
        match &result {
            Ok(record) => tracing::info!(
                username,
                credential_id = %record.credential_id_base64url(),
                format = %record.format,
                "credential registered"
            ),
            Err(error) => tracing::warn!(
                username,
                error_kind = ?error.verification_kind(),
                %error,
                "registration failed"
            ),
        }
        result
    }

    async fn register(
        &self,
        username: &str,
        credential: &RegistrationCredential,
    ) -> Result<AuthenticatorRecord, CeremonyError> {
        let pending = self.redeem(username, CeremonyType::Create).await?;
        if self.users.get(username).await?.is_none() {
            return Err(CeremonyError::UnknownUser(username.to_string()));
        }

        let record = self
            .relying_party
            .verify_attestation(credential, pending.challenge.as_str())?;

        match self.users.add_authenticator(username, record.clone()).await {
            Ok(()) => Ok(record),
            Err(RepositoryError::CredentialExists(id)) => {
                Err(CeremonyError::CredentialExists(id))
            }
            Err(RepositoryError::UnknownUser(name)) => Err(CeremonyError::UnknownUser(name)),
            Err(error) => Err(error.into()),
        }
    }

    /// Start a login for `username`.
    ///
    /// # Errors
    ///
    /// Returns [`CeremonyError::UnknownUser`] or [`CeremonyError::NotRegistered`]
    /// for a user without a credential.
    pub async fn begin_login(
        &self,
        username: &str,
    ) -> Result<CredentialRequestOptions, CeremonyError> {
        let user = self.registered_user(username).await?;
        let options = {
            let mut rng = self.rng.lock();
            start_assertion(&mut **rng, &self.config, &user.authenticators)
        };
        self.issue(username, CeremonyType::Get, options.challenge.clone())
            .await?;

        tracing::info!(
            username,
            credentials = user.authenticators.len(),
            "login challenge issued"
        );
        Ok(options)
    }

    /// Verify the login response for `username` and advance the credential's
    /// counter.
    ///
    /// # Errors
    ///
    /// Fails without a matching pending challenge, for an unknown or foreign
    /// credential, and when the response does not verify or replays a counter.
    pub async fn finish_login(
        &self,
        username: &str,
        credential: &AssertionCredential,
    ) -> Result<Authenticated, CeremonyError> {
        let result = self.authenticate(username, credential).await;
        match &result {
            Ok(authenticated) => tracing::info!(
                username,
                credential_id = %authenticated.credential_id,
                sign_count = authenticated.sign_count,
                "user authenticated"
            ),
            Err(error) => tracing::warn!(
                username,
                credential_id = %credential.id,
                error_kind = ?error.verification_kind(),
                %error,
                "login failed"
            ),
        }
        result
    }

    async fn authenticate(
        &self,
        username: &str,
        credential: &AssertionCredential,
    ) -> Result<Authenticated, CeremonyError> {
        let pending = self.redeem(username, CeremonyType::Get).await?;
        let user = self.registered_user(username).await?;
        let stored = user.authenticator(&credential.raw_id);

        let outcome =
            self.relying_party
                .verify_assertion(credential, stored, pending.challenge.as_str())?;

        let swapped = self
            .users
            .update_sign_count(
                &outcome.credential_id,
                outcome.previous_sign_count,
                outcome.new_sign_count,
            )
            .await?;
        if !swapped {
            return Err(VerificationError::Replay {
                stored: outcome.previous_sign_count,
                received: outcome.new_sign_count,
            }
            .into());
        }

        Ok(Authenticated {
            username: username.to_string(),
            credential_id: base64url::encode(&outcome.credential_id),
            sign_count: outcome.new_sign_count,
            session_token: self.random_token(),
        })
    }

    async fn registered_user(&self, username: &str) -> Result<User, CeremonyError> {
        match self.users.get(username).await? {
            Some(user) if user.registered => Ok(user),
            Some(_) => Err(CeremonyError::NotRegistered(username.to_string())),
            None => Err(CeremonyError::UnknownUser(username.to_string())),
        }
    }

    /// Report where `username` stands. Expired challenges count as absent.
    pub async fn status(&self, username: &str) -> Result<CeremonyStatus, CeremonyError> {
        let registered = self
            .users
            .get(username)
            .await?
            .is_some_and(|user| user.registered);
        let pending = self
            .challenges
            .peek(username)
            .await?
            .filter(|pending| {
                !pending.is_expired(self.clock.now(), self.config.challenge_timeout)
            });

        let state = match (pending.map(|pending| pending.ceremony), registered) {
            (Some(CeremonyType::Create), _) => CeremonyState::RegistrationPending,
            (Some(CeremonyType::Get), _) => CeremonyState::LoginPending,
            (None, true) => CeremonyState::Registered,
            (None, false) => CeremonyState::Unregistered,
        };

        Ok(CeremonyStatus {
            username: username.to_string(),
            state,
            registered,
        })
    }

    /// Drop the challenge pending for `username`, if any.
    pub async fn cancel(&self, username: &str) -> Result<(), CeremonyError> {
        if self.challenges.take(username).await?.is_some() {
            tracing::debug!(username, "pending ceremony cancelled");
        }
        Ok(())
    }
}
