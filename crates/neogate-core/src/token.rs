//! Bearer tokens
//!
//! A bearer token is a signed statement by its issuer granting access to
//! network operations. Its signature is checked by the storage network, not
//! here; the gateway only needs the issuer to fill in object ownership.
//!
//! On the HTTP boundary the token travels as base64 of its serialized form.

use crate::{CoreError, OwnerId, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

/// Epoch-based validity window of a token
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLifetime {
    /// Expiration epoch
    #[serde(default)]
    pub exp: u64,
    /// Not valid before
    #[serde(default)]
    pub nbf: u64,
    /// Issued at
    #[serde(default)]
    pub iat: u64,
}

/// Signed part of the token
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BearerTokenBody {
    pub issuer: OwnerId,
    #[serde(default)]
    pub lifetime: TokenLifetime,
    /// Extended ACL table, opaque to the gateway
    #[serde(default)]
    pub eacl: serde_json::Value,
}

/// Issuer key and signature, hex encoded
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSignature {
    pub key: String,
    pub signature: String,
}

/// A decoded bearer token, owned by the request that carried it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BearerToken {
    pub body: BearerTokenBody,
    pub signature: TokenSignature,
}

impl BearerToken {
    pub fn new(body: BearerTokenBody, signature: TokenSignature) -> Self {
        Self { body, signature }
    }

    /// Identity that signed the token
    pub fn issuer(&self) -> OwnerId {
        self.body.issuer
    }

    /// Decode the HTTP representation.
    ///
    /// Fails with [`CoreError::TokenEncoding`] for bad base64 and
    /// [`CoreError::TokenFormat`] when the bytes are not a signed token.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let raw = BASE64
            .decode(encoded.trim())
            .map_err(|e| CoreError::TokenEncoding(e.to_string()))?;

        let token: Self =
            serde_json::from_slice(&raw).map_err(|e| CoreError::TokenFormat(e.to_string()))?;
        token.check_signature_fields()?;

        Ok(token)
    }

    /// Encode for an `Authorization` header or `Bearer` cookie
    pub fn to_base64(&self) -> Result<String> {
        let raw = serde_json::to_vec(self).map_err(|e| CoreError::TokenFormat(e.to_string()))?;
        Ok(BASE64.encode(raw))
    }

    fn check_signature_fields(&self) -> Result<()> {
        for (name, value) in [
            ("key", &self.signature.key),
            ("signature", &self.signature.signature),
        ] {
            if value.is_empty() {
                return Err(CoreError::TokenFormat(format!("missing signature {name}")));
            }
            hex::decode(value)
                .map_err(|e| CoreError::TokenFormat(format!("signature {name}: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_token() -> BearerToken {
        BearerToken::new(
            BearerTokenBody {
                issuer: OwnerId::from_script_hash([0x11; 20]),
                lifetime: TokenLifetime {
                    exp: 100,
                    nbf: 1,
                    iat: 1,
                },
                eacl: serde_json::json!({"records": []}),
            },
            TokenSignature {
                key: "02".repeat(33),
                signature: "ab".repeat(64),
            },
        )
    }

    #[test]
    fn test_decode_encoded_token() {
        let token = sample_token();
        let encoded = token.to_base64().unwrap();
        let decoded = BearerToken::from_base64(&encoded).unwrap();
        assert_eq!(decoded, token);
        assert_eq!(decoded.issuer(), OwnerId::from_script_hash([0x11; 20]));
    }

    #[test]
    fn test_bad_base64() {
        assert!(matches!(
            BearerToken::from_base64("not-base64!!"),
            Err(CoreError::TokenEncoding(_))
        ));
    }

    #[test]
    fn test_bad_payload() {
        let encoded = BASE64.encode(b"{\"hello\":\"world\"}");
        assert!(matches!(
            BearerToken::from_base64(&encoded),
            Err(CoreError::TokenFormat(_))
        ));
    }

    #[test]
    fn test_signature_must_be_hex() {
        let mut token = sample_token();
        token.signature.signature = "not hex".into();
        let encoded = BASE64.encode(serde_json::to_vec(&token).unwrap());
        assert!(matches!(
            BearerToken::from_base64(&encoded),
            Err(CoreError::TokenFormat(_))
        ));
    }

    #[test]
    fn test_optional_fields_default() {
        let issuer = OwnerId::from_script_hash([0x22; 20]);
        let json = format!(
            r#"{{"body":{{"issuer":"{issuer}"}},"signature":{{"key":"aa","signature":"bb"}}}}"#
        );
        let token = BearerToken::from_base64(&BASE64.encode(json)).unwrap();
        assert_eq!(token.body.lifetime, TokenLifetime::default());
        assert!(token.body.eacl.is_null());
    }
}
