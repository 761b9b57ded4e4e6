#![warn(missing_docs)]

//! Binary codecs for the WebAuthn relying-party side.
//!
//! This crate turns the raw bytes an authenticator produces into structured
//! records and back:
//!
//! - [`AuthenticatorData`]: the fixed binary layout signed by authenticators
//! - [`CoseKey`]: COSE_Key maps and their conversion to raw SEC1 points
//! - [`AttestationObject`]: the CBOR envelope returned at registration
//! - [`Pem`] / [`to_pem`]: PEM framing of raw points and DER certificates
//! - [`base64url`]: the unpadded encoding used for binary JSON members
//!
//! Every decoder fails with a [`ParseError`] on malformed input; nothing here
//! panics on client-supplied bytes.

mod error;
pub use error::*;

mod reader;
pub use reader::*;

mod cbor;

mod cose;
pub use cose::*;

mod authenticator_data;
pub use authenticator_data::*;

mod attestation_object;
pub use attestation_object::*;

mod pem;
pub use pem::*;

pub mod base64url;
