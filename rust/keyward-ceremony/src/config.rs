//! Relying party configuration.
//!
//! [`Config::default`] describes the development deployment: a relying party
//! named `WebAuth Test` on `localhost`, served from `http://localhost:8080`.
//! [`Config::from_env`] overrides any of it from `KEYWARD_*` variables.

use crate::ConfigError;
use keyward_credentials::RelyingParty;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const RP_ID: &str = "KEYWARD_RP_ID";
const RP_NAME: &str = "KEYWARD_RP_NAME";
const ORIGIN: &str = "KEYWARD_ORIGIN";
const ATTESTATION: &str = "KEYWARD_ATTESTATION";
const ACCEPT_NONE_ATTESTATION: &str = "KEYWARD_ACCEPT_NONE_ATTESTATION";
const CHALLENGE_TIMEOUT_SECS: &str = "KEYWARD_CHALLENGE_TIMEOUT_SECS";

/// `AttestationConveyancePreference`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttestationConveyance {
    /// No attestation statement is wanted.
    None,
    /// The client may anonymize the statement.
    Indirect,
    /// The statement as the authenticator produced it.
    #[default]
    Direct,
    /// Uniquely identifying attestation.
    Enterprise,
}

impl std::str::FromStr for AttestationConveyance {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "none" => Ok(AttestationConveyance::None),
            "indirect" => Ok(AttestationConveyance::Indirect),
            "direct" => Ok(AttestationConveyance::Direct),
            "enterprise" => Ok(AttestationConveyance::Enterprise),
            other => Err(other.to_string()),
        }
    }
}

/// `UserVerificationRequirement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserVerification {
    /// Fail the ceremony without user verification.
    Required,
    /// Verify the user when the authenticator can.
    #[default]
    Preferred,
    /// Do not verify the user.
    Discouraged,
}

/// Relying party configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Relying party identifier.
    pub rp_id: String,
    /// Human readable relying party name.
    pub rp_name: String,
    /// The origin clients must report.
    pub origin: String,
    /// Attestation conveyance requested at registration.
    pub attestation: AttestationConveyance,
    /// Register credentials that carry `none` attestation.
    pub accept_none_attestation: bool,
    /// How long an issued challenge stays valid.
    #[serde(with = "seconds")]
    pub challenge_timeout: Duration,
    /// User verification requested from authenticators.
    pub user_verification: UserVerification,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rp_id: "localhost".into(),
            rp_name: "WebAuth Test".into(),
            origin: "http://localhost:8080".into(),
            attestation: AttestationConveyance::Direct,
            accept_none_attestation: false,
            challenge_timeout: Duration::from_secs(60),
            user_verification: UserVerification::Preferred,
        }
    }
}

impl Config {
    /// The default configuration overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// The default configuration overridden by `KEYWARD_*` entries of `vars`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidVariable`] for a value that does not
    /// parse, and any error of [`Config::validate`].
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Config::default();
        for (name, value) in vars {
            let value: String = value.into();
            match name.as_ref() {
                RP_ID => config.rp_id = value,
                RP_NAME => config.rp_name = value,
                ORIGIN => config.origin = value,
                ATTESTATION => {
                    config.attestation = value.parse::<AttestationConveyance>().map_err(|value| {
                        ConfigError::InvalidVariable {
                            variable: ATTESTATION,
                            value,
                        }
                    })?
                }
                ACCEPT_NONE_ATTESTATION => {
                    config.accept_none_attestation = parse_flag(&value).ok_or(
                        ConfigError::InvalidVariable {
                            variable: ACCEPT_NONE_ATTESTATION,
                            value: value.clone(),
                        },
                    )?
                }
                CHALLENGE_TIMEOUT_SECS => {
                    let secs = value
                        .parse::<u64>()
                        .map_err(|_| ConfigError::InvalidVariable {
                            variable: CHALLENGE_TIMEOUT_SECS,
                            value: value.clone(),
                        })?;
                    config.challenge_timeout = Duration::from_secs(secs);
                }
                _ => {}
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can drive a relying party.
    ///
    /// The origin must already be in serialized form, because it is compared
    /// byte for byte with `clientData.origin`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rp_id.is_empty() {
            return Err(ConfigError::EmptyRpId);
        }
        if self.challenge_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        let invalid = |reason: String| ConfigError::InvalidOrigin {
            origin: self.origin.clone(),
            reason,
        };
        let url = Url::parse(&self.origin).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        let serialized = url.origin().ascii_serialization();
        if serialized != self.origin {
            return Err(invalid(format!("expected {serialized}")));
        }
        Ok(())
    }

    /// The verifier for this relying party.
    pub fn relying_party(&self) -> RelyingParty {
        RelyingParty::new(&self.rp_id, &self.origin)
            .with_none_attestation(self.accept_none_attestation)
    }

    /// The challenge timeout in milliseconds, as advertised to clients.
    pub fn timeout_millis(&self) -> u64 {
        u64::try_from(self.challenge_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use testresult::TestResult;

    #[test]
    fn it_defaults_to_the_development_relying_party() -> TestResult {
        let config = Config::default();
        config.validate()?;

        assert_eq!(config.rp_id, "localhost");
        assert_eq!(config.rp_name, "WebAuth Test");
        assert_eq!(config.origin, "http://localhost:8080");
        assert_eq!(config.timeout_millis(), 60_000);
        assert!(!config.accept_none_attestation);
        Ok(())
    }

    #[test]
    fn it_reads_overrides_from_variables() -> TestResult {
        let config = Config::from_vars([
            ("KEYWARD_RP_ID", "example.com"),
            ("KEYWARD_ORIGIN", "https://example.com"),
            ("KEYWARD_ATTESTATION", "none"),
            ("KEYWARD_ACCEPT_NONE_ATTESTATION", "true"),
            ("KEYWARD_CHALLENGE_TIMEOUT_SECS", "120"),
            ("PATH", "/usr/bin"),
        ])?;

        assert_eq!(config.rp_id, "example.com");
        assert_eq!(config.origin, "https://example.com");
        assert_eq!(config.attestation, AttestationConveyance::None);
        assert!(config.accept_none_attestation);
        assert_eq!(config.challenge_timeout, Duration::from_secs(120));
        assert_eq!(config.rp_name, "WebAuth Test");
        Ok(())
    }

    #[test]
    fn it_rejects_unparseable_variables() {
        let result = Config::from_vars([("KEYWARD_CHALLENGE_TIMEOUT_SECS", "soon")]);
        assert_eq!(
            result,
            Err(ConfigError::InvalidVariable {
                variable: CHALLENGE_TIMEOUT_SECS,
                value: "soon".into(),
            })
        );

        let result = Config::from_vars([("KEYWARD_ATTESTATION", "maybe")]);
        assert!(matches!(result, Err(ConfigError::InvalidVariable { .. })));
    }

    #[test]
    fn it_requires_a_serialized_origin() {
        for origin in [
            "localhost:8080",
            "ftp://localhost",
            "http://localhost:8080/",
            "https://example.com:443",
            "not a url",
        ] {
            let config = Config {
                origin: origin.into(),
                ..Config::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidOrigin { .. })),
                "{origin}"
            );
        }
    }

    #[test]
    fn it_rejects_a_zero_timeout() {
        let config = Config {
            challenge_timeout: Duration::ZERO,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn it_serializes_the_timeout_in_seconds() -> TestResult {
        let json = serde_json::to_value(Config::default())?;
        assert_eq!(json["challenge_timeout"], 60);
        assert_eq!(json["attestation"], "direct");
        assert_eq!(json["user_verification"], "preferred");

        let config: Config = serde_json::from_str(r#"{"rp_id":"example.com"}"#)?;
        assert_eq!(config.rp_id, "example.com");
        assert_eq!(config.challenge_timeout, Duration::from_secs(60));
        Ok(())
    }
}
