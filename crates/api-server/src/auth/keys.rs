//! Signing-key resolution.
//!
//! Selects the key-set entry whose `kid` matches the token header and turns
//! its leaf certificate into an RSA verification key.

use crate::auth::jwks::JsonWebKeySet;
use crate::errors::ResolutionError;
use jsonwebtoken::DecodingKey;

const PEM_LINE_WIDTH: usize = 64;

/// Frame a base64 DER certificate as a PEM `CERTIFICATE` block.
///
/// The body is wrapped at 64 characters per line.
pub fn certificate_pem(der_base64: &str) -> String {
    let mut pem = String::with_capacity(der_base64.len() + der_base64.len() / PEM_LINE_WIDTH + 64);
    pem.push_str("-----BEGIN CERTIFICATE-----\n");
    for line in der_base64.as_bytes().chunks(PEM_LINE_WIDTH) {
        pem.push_str(&String::from_utf8_lossy(line));
        pem.push('\n');
    }
    pem.push_str("-----END CERTIFICATE-----\n");
    pem
}

/// Resolve the verification key for `kid` from `key_set`.
///
/// The first entry with an exactly matching `kid` wins; later duplicates are
/// ignored. Only the leaf certificate (`x5c[0]`) is used and no chain or
/// expiry checks are performed on it.
///
/// # Errors
///
/// - `ResolutionError::NoMatchingKey` - token has no `kid` or no entry matches
/// - `ResolutionError::MalformedCertificate` - the matching entry has no
///   certificate or it does not hold an RSA public key
pub fn resolve_key(
    kid: Option<&str>,
    key_set: &JsonWebKeySet,
) -> Result<DecodingKey, ResolutionError> {
    let Some(kid) = kid else {
        tracing::debug!(target: "api.auth.keys", "Token header has no kid");
        return Err(ResolutionError::NoMatchingKey);
    };

    let Some(jwk) = key_set.keys.iter().find(|jwk| jwk.kid == kid) else {
        tracing::debug!(
            target: "api.auth.keys",
            kid = %kid,
            key_count = key_set.keys.len(),
            "No key found for kid"
        );
        return Err(ResolutionError::NoMatchingKey);
    };

    let Some(leaf) = jwk.x5c.first() else {
        tracing::warn!(target: "api.auth.keys", kid = %kid, "Key has empty x5c chain");
        return Err(ResolutionError::MalformedCertificate);
    };

    DecodingKey::from_rsa_pem(certificate_pem(leaf).as_bytes()).map_err(|e| {
        tracing::warn!(target: "api.auth.keys", kid = %kid, error = %e, "Failed to parse key certificate");
        ResolutionError::MalformedCertificate
    })
}
