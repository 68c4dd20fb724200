//! Signed token encoding and decoding.
//!
//! Produces the compact three-segment (header/claims/signature) token
//! string embedded in email links. The format is URL-safe and needs no
//! further escaping in a query string or path segment.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{Result, TokenError};
use crate::models::TokenPurpose;

/// Claims carried by the signed token string.
///
/// Fixed shape: a decode fails on missing or unknown fields rather
/// than defaulting. `exp` makes the token self-describing, but the
/// validator's expiry decision is always taken against the stored
/// record, because revocation and usage state cannot live in a
/// stateless signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenClaims {
    /// Subject the token grants access to.
    pub sub: Uuid,
    /// Action the token authorizes.
    pub purpose: TokenPurpose,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
    /// Record-linking identifier.
    pub jti: Uuid,
}

/// Encodes and verifies signed tokens with a process-wide secret.
///
/// Constructed once at startup and shared by handle; there is no
/// ambient global key state. The signature proves integrity and
/// origin, not current validity.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry and revocation are checked against the stored record
        // in the ordered validation sequence, not at decode time.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Serialize and sign claims into a URL-safe compact string.
    pub fn encode(&self, claims: &TokenClaims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Internal(format!("token encoding failed: {e}")))
    }

    /// Verify the signature and parse claims.
    ///
    /// Fails closed: any structural or signature failure is
    /// `MalformedOrForged`. Claims are never returned unverified.
    pub fn decode(&self, token: &str) -> Result<TokenClaims> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::MalformedOrForged)
    }
}

/// Irreversible hash of a signed token string. Used as the storage
/// lookup key so the raw token is never persisted.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn codec() -> TokenCodec {
        TokenCodec::new("test-signing-secret-for-unit-tests")
    }

    fn claims() -> TokenClaims {
        let now = Utc::now().timestamp();
        TokenClaims {
            sub: Uuid::new_v4(),
            purpose: TokenPurpose::EmailPreferences,
            iat: now,
            exp: now + 86400,
            jti: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_round_trip() {
        let codec = codec();
        let claims = claims();
        let token = codec.encode(&claims).unwrap();
        let decoded = codec.decode(&token).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_token_is_url_safe() {
        let codec = codec();
        let token = codec.encode(&claims()).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let codec = codec();
        let token = codec.encode(&claims()).unwrap();

        // Flip one character anywhere in the string.
        for pos in [5, token.len() / 2, token.len() - 1] {
            let mut bytes = token.clone().into_bytes();
            bytes[pos] = if bytes[pos] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();
            if tampered == token {
                continue;
            }
            assert!(matches!(
                codec.decode(&tampered),
                Err(TokenError::MalformedOrForged)
            ));
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = codec().encode(&claims()).unwrap();
        let other = TokenCodec::new("a-different-secret");
        assert!(matches!(
            other.decode(&token),
            Err(TokenError::MalformedOrForged)
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let codec = codec();
        for garbage in ["", "abc", "a.b.c", "....", "json:{}"] {
            assert!(matches!(
                codec.decode(garbage),
                Err(TokenError::MalformedOrForged)
            ));
        }
    }

    #[test]
    fn test_extra_claim_fields_rejected() {
        #[derive(Serialize)]
        struct LooseClaims {
            sub: Uuid,
            purpose: TokenPurpose,
            iat: i64,
            exp: i64,
            jti: Uuid,
            admin: bool,
        }

        let now = Utc::now().timestamp();
        let loose = LooseClaims {
            sub: Uuid::new_v4(),
            purpose: TokenPurpose::Unsubscribe,
            iat: now,
            exp: now + 3600,
            jti: Uuid::new_v4(),
            admin: true,
        };

        // Signed with the right secret but carrying an extra field.
        let secret = "test-signing-secret-for-unit-tests";
        let token = encode(
            &Header::new(Algorithm::HS256),
            &loose,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            codec().decode(&token),
            Err(TokenError::MalformedOrForged)
        ));
    }

    #[test]
    fn test_missing_claim_fields_rejected() {
        #[derive(Serialize)]
        struct PartialClaims {
            sub: Uuid,
            iat: i64,
        }

        let secret = "test-signing-secret-for-unit-tests";
        let token = encode(
            &Header::new(Algorithm::HS256),
            &PartialClaims {
                sub: Uuid::new_v4(),
                iat: Utc::now().timestamp(),
            },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            codec().decode(&token),
            Err(TokenError::MalformedOrForged)
        ));
    }

    #[test]
    fn test_hash_token_is_stable_and_hex() {
        let a = hash_token("some-token");
        let b = hash_token("some-token");
        let c = hash_token("other-token");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn test_expired_claims_still_decode() {
        // Expiry is the validator's decision, taken against the stored
        // record; the codec must not reject on the exp claim.
        let codec = codec();
        let mut c = claims();
        c.exp = c.iat - 10;
        let token = codec.encode(&c).unwrap();
        assert_eq!(codec.decode(&token).unwrap(), c);
    }
}
