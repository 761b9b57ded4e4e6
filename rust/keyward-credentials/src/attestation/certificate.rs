//! Requirements on `packed` attestation certificates (WebAuthn §8.2.1).

use super::country;
use crate::{CertificateViolation, VerificationError};
use keyward_encoding::ParseError;
use x509_parser::prelude::{
    AttributeTypeAndValue, ParsedExtension, X509Certificate, X509Version,
};

/// `id-fido-gen-ce-aaguid`.
pub const AAGUID_EXTENSION_OID: &str = "1.3.6.1.4.1.45724.1.1.4";

/// Required subject organizational unit.
pub const ATTESTATION_ORGANIZATIONAL_UNIT: &str = "Authenticator Attestation";

/// Check a DER attestation certificate against the packed requirements and
/// the AAGUID found in the authenticator data.
///
/// # Errors
///
/// Returns [`VerificationError::Parse`] when `der` is not a certificate and a
/// [`CertificateViolation`] policy error for the first requirement it misses.
pub fn check_packed_certificate(der: &[u8], aaguid: &[u8; 16]) -> Result<(), VerificationError> {
    let (_, certificate) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| ParseError::Certificate(e.to_string()))?;
    check_certificate(&certificate, aaguid)?;
    Ok(())
}

fn check_certificate(
    certificate: &X509Certificate<'_>,
    aaguid: &[u8; 16],
) -> Result<(), CertificateViolation> {
    let version = certificate.version();
    if version != X509Version::V3 {
        return Err(CertificateViolation::Version(version.0.saturating_add(1)));
    }

    for extension in certificate.extensions() {
        if let ParsedExtension::BasicConstraints(constraints) = extension.parsed_extension() {
            if constraints.ca {
                return Err(CertificateViolation::CertificateAuthority);
            }
        }
    }

    let subject = certificate.subject();

    match first_value(subject.iter_country()) {
        Some(code) if country::is_alpha2(&code) => {}
        other => return Err(CertificateViolation::Country(other)),
    }
    if first_value(subject.iter_organization()).is_none() {
        return Err(CertificateViolation::MissingOrganization);
    }
    match first_value(subject.iter_organizational_unit()) {
        Some(unit) if unit == ATTESTATION_ORGANIZATIONAL_UNIT => {}
        other => return Err(CertificateViolation::OrganizationalUnit(other)),
    }
    if first_value(subject.iter_common_name()).is_none() {
        return Err(CertificateViolation::MissingCommonName);
    }

    let aaguid_extension = certificate
        .extensions()
        .iter()
        .find(|extension| extension.oid.to_id_string() == AAGUID_EXTENSION_OID);
    if let Some(extension) = aaguid_extension {
        if extension.critical {
            return Err(CertificateViolation::CriticalAaguidExtension);
        }
        // extnValue wraps the AAGUID in an OCTET STRING.
        let embedded = match extension.value {
            [0x04, 0x10, rest @ ..] if rest.len() == 16 => rest,
            _ => return Err(CertificateViolation::MalformedAaguidExtension),
        };
        if embedded != aaguid {
            return Err(CertificateViolation::AaguidMismatch);
        }
    }

    Ok(())
}

fn first_value<'a, 'b>(
    mut values: impl Iterator<Item = &'b AttributeTypeAndValue<'a>>,
) -> Option<String>
where
    'a: 'b,
{
    values
        .next()
        .and_then(|value| value.as_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
