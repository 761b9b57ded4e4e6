#![warn(missing_docs)]

//! WebAuthn registration and login ceremonies.
//!
//! A [`Ceremony`] issues a challenge with [`Ceremony::begin_registration`] or
//! [`Ceremony::begin_login`], and redeems it exactly once with the matching
//! `finish_*` call, which verifies the browser's response through
//! [`keyward_credentials::RelyingParty`]. Users live in a [`UserRepository`],
//! pending challenges in a [`ChallengeStore`]; both are host-provided, with
//! in-memory implementations in [`memory`].
//!
//! ```no_run
//! # async fn run() -> Result<(), keyward_ceremony::CeremonyError> {
//! use keyward_ceremony::{Ceremony, Config, memory::*};
//!
//! let ceremony = Ceremony::new(
//!     Config::from_env()?,
//!     MemoryUserRepository::new(),
//!     MemoryChallengeStore::new(),
//! )?;
//! let options = ceremony.begin_registration("alice", "Alice").await?;
//! # Ok(())
//! # }
//! ```

mod error;
pub use error::*;

mod config;
pub use config::*;

mod clock;
pub use clock::*;

mod challenge;
pub use challenge::*;

mod options;
pub use options::*;

mod repository;
pub use repository::*;

pub mod memory;
pub use memory::{MemoryChallengeStore, MemoryUserRepository};

mod ceremony;
pub use ceremony::*;
