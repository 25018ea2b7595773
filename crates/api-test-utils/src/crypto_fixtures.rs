//! Fixed RSA signing keys for testing.
//!
//! Two 2048-bit RSA keys, each with a self-signed X.509 certificate, are
//! checked in under `fixtures/`. They let tests publish realistic JWKS
//! documents (`x5c` chains) and sign RS256 tokens that the server verifies
//! exactly as it would in production. The certificates are valid until 2046;
//! the server never checks certificate validity anyway.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

const PRIMARY_KEY_PEM: &str = include_str!("../fixtures/primary_key.pem");
const PRIMARY_CERT_PEM: &str = include_str!("../fixtures/primary_cert.pem");
const ROTATED_KEY_PEM: &str = include_str!("../fixtures/rotated_key.pem");
const ROTATED_CERT_PEM: &str = include_str!("../fixtures/rotated_cert.pem");

/// An RSA signing key with its published certificate.
#[derive(Debug, Clone)]
pub struct TestSigningKey {
    kid: &'static str,
    private_key_pem: &'static str,
    certificate_pem: &'static str,
}

impl TestSigningKey {
    /// The key the mocked identity provider publishes by default.
    pub fn primary() -> Self {
        Self {
            kid: "api-test-primary",
            private_key_pem: PRIMARY_KEY_PEM,
            certificate_pem: PRIMARY_CERT_PEM,
        }
    }

    /// A second key, used for rotation and wrong-key scenarios.
    pub fn rotated() -> Self {
        Self {
            kid: "api-test-rotated",
            private_key_pem: ROTATED_KEY_PEM,
            certificate_pem: ROTATED_CERT_PEM,
        }
    }

    /// Key ID placed in token headers and the JWKS entry.
    pub fn kid(&self) -> &str {
        self.kid
    }

    /// The certificate as a single-line standard base64 DER string, as it
    /// appears in an `x5c` array.
    pub fn x5c(&self) -> String {
        self.certificate_pem
            .lines()
            .filter(|line| !line.starts_with("-----"))
            .map(str::trim)
            .collect()
    }

    /// JWKS entry for this key.
    pub fn jwk_json(&self) -> Value {
        json!({
            "kty": "RSA",
            "kid": self.kid,
            "use": "sig",
            "alg": "RS256",
            "x5c": [self.x5c()],
        })
    }

    /// Sign `claims` as an RS256 token with this key's `kid` in the header.
    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.typ = Some("JWT".to_string());
        header.kid = Some(self.kid.to_string());
        self.sign_with_header(header, claims)
    }

    /// Sign `claims` with this key under an arbitrary header.
    pub fn sign_with_header(&self, header: Header, claims: &Value) -> String {
        let encoding_key = EncodingKey::from_rsa_pem(self.private_key_pem.as_bytes())
            .expect("Fixture private key should parse");
        encode(&header, claims, &encoding_key).expect("Failed to sign token")
    }
}

/// JWKS document publishing `keys` in order.
pub fn jwks_json(keys: &[TestSigningKey]) -> Value {
    json!({ "keys": keys.iter().map(TestSigningKey::jwk_json).collect::<Vec<_>>() })
}

/// Sign `claims` as an HS256 token, for algorithm-confusion tests.
///
/// Carries the primary key's `kid` so that only the algorithm is wrong.
pub fn sign_hs256(claims: &Value, secret: &[u8]) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(TestSigningKey::primary().kid().to_string());
    encode(&header, claims, &EncodingKey::from_secret(secret)).expect("Failed to sign token")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x5c_is_single_line_base64() {
        let x5c = TestSigningKey::primary().x5c();

        assert!(!x5c.is_empty());
        assert!(!x5c.contains('\n'));
        assert!(!x5c.contains('-'));
        // DER certificates start with a SEQUENCE tag, "MII" in base64
        assert!(x5c.starts_with("MII"));
    }

    #[test]
    fn test_keys_are_distinct() {
        let primary = TestSigningKey::primary();
        let rotated = TestSigningKey::rotated();

        assert_ne!(primary.kid(), rotated.kid());
        assert_ne!(primary.x5c(), rotated.x5c());
    }

    #[test]
    fn test_sign_produces_rs256_token_with_kid() {
        let signer = TestSigningKey::primary();
        let token = signer.sign(&json!({ "sub": "test" }));

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some(signer.kid()));
    }

    #[test]
    fn test_jwks_json_preserves_order() {
        let jwks = jwks_json(&[TestSigningKey::rotated(), TestSigningKey::primary()]);

        assert_eq!(jwks["keys"][0]["kid"], "api-test-rotated");
        assert_eq!(jwks["keys"][1]["kid"], "api-test-primary");
    }

    #[test]
    fn test_sign_hs256_header() {
        let token = sign_hs256(&json!({ "sub": "test" }), b"secret");

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
    }
}
