#![warn(missing_docs)]

//! WebAuthn relying-party verification.
//!
//! This crate checks what authenticators send back during registration
//! ([`RelyingParty::verify_attestation`]) and login
//! ([`RelyingParty::verify_assertion`]). Every check returns a
//! [`VerificationError`] whose [`ErrorKind`] tells a host how to report it.
//!
//! Verification is pure: nothing here logs, stores or remembers anything.
//! Issuing challenges and persisting [`AuthenticatorRecord`]s is up to the
//! caller (see `keyward-ceremony`).
//!
//! The order of checks is fixed. Decoding and policy (credential type,
//! client data type, challenge, origin, rpIdHash, user presence, format and
//! certificate requirements) run before any signature is verified, and the
//! anti-replay counter is checked last, against a signature known to be good.

mod error;
pub use error::*;

mod client_data;
pub use client_data::*;

pub mod policy;
pub use policy::ClientDataPolicy;

pub mod signature;

mod record;
pub use record::*;

pub mod attestation;
pub use attestation::{AttestationOptions, verify_attestation};

pub mod assertion;
pub use assertion::{AssertionOutcome, AssertionResponse, verify_assertion};

mod relying_party;
pub use relying_party::*;

#[cfg(any(test, feature = "helpers"))]
pub mod helpers;
