//! Access token claims decoding.
//!
//! Tokens are decoded locally to read identity, role, and expiry claims.
//! The signature is NOT verified here - decoded claims are a display hint
//! only, and the server independently validates every request.

use chrono::Utc;
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde_json::{Map, Value};
use thiserror::Error;

/// Boolean claims that signal an administrator account. Different backend
/// versions emitted different names, so all of them are checked.
const BOOL_ROLE_CLAIMS: &[&str] = &["is_staff", "is_superuser", "is_admin"];

/// String claims carrying a role name directly.
const STRING_ROLE_CLAIMS: &[&str] = &["role", "user_type"];

/// Role string values treated as administrator (case-insensitive).
const ADMIN_ROLE_VALUES: &[&str] = &["admin", "administrator", "staff", "superuser"];

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid token structure: {0}")]
    InvalidStructure(String),

    #[error("Invalid token payload: {0}")]
    InvalidPayload(String),
}

/// User role as the backend understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Contributor,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Contributor => write!(f, "contributor"),
        }
    }
}

/// Claims extracted from an access token. Transient - recomputed on every
/// read, never persisted.
#[derive(Debug, Clone)]
pub struct DecodedClaims {
    /// User identifier, from `sub` or the backend's `user_id` claim
    pub subject: Option<String>,
    pub username: Option<String>,
    /// Expiry as seconds since the Unix epoch, if the token carries one
    pub expires_at: Option<i64>,
    claims: Map<String, Value>,
}

/// Decode the payload of an access token without verifying its signature.
///
/// Expired tokens decode successfully - expiry is data here, checked
/// separately via [`DecodedClaims::is_valid_at`].
pub fn decode_claims(token: &str) -> Result<DecodedClaims, DecodeError> {
    let header =
        decode_header(token).map_err(|e| DecodeError::InvalidStructure(e.to_string()))?;

    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    // Key material is unused once signature validation is disabled
    let data = decode::<Map<String, Value>>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| DecodeError::InvalidPayload(e.to_string()))?;

    Ok(DecodedClaims::from_raw(data.claims))
}

impl DecodedClaims {
    fn from_raw(claims: Map<String, Value>) -> Self {
        let subject = claims
            .get("sub")
            .or_else(|| claims.get("user_id"))
            .and_then(claim_as_string);
        let username = claims
            .get("username")
            .and_then(Value::as_str)
            .map(str::to_string);
        let expires_at = claims.get("exp").and_then(claim_as_epoch);

        Self {
            subject,
            username,
            expires_at,
            claims,
        }
    }

    /// Derive the user's role from recognized claims.
    ///
    /// Any administrator signal wins, regardless of which field carries it
    /// or what the other fields say. Returns `None` when no recognized role
    /// claim is present at all - callers must then fall back to asking the
    /// server (see `SessionManager::resolve_role_by_probe`).
    pub fn role_hint(&self) -> Option<Role> {
        let mut recognized = false;

        for field in BOOL_ROLE_CLAIMS {
            if let Some(flag) = self.claims.get(*field).and_then(Value::as_bool) {
                recognized = true;
                if flag {
                    return Some(Role::Admin);
                }
            }
        }

        for field in STRING_ROLE_CLAIMS {
            if let Some(value) = self.claims.get(*field).and_then(Value::as_str) {
                recognized = true;
                if ADMIN_ROLE_VALUES
                    .iter()
                    .any(|admin| value.eq_ignore_ascii_case(admin))
                {
                    return Some(Role::Admin);
                }
            }
        }

        if recognized {
            Some(Role::Contributor)
        } else {
            None
        }
    }

    /// True when the token has not expired as of `now` (seconds since epoch).
    /// A token without an `exp` claim never expires client-side; the server
    /// still re-validates every request it receives.
    pub fn is_valid_at(&self, now: i64) -> bool {
        match self.expires_at {
            Some(exp) => exp > now,
            None => true,
        }
    }

    /// Convenience wrapper over [`Self::is_valid_at`] using the current time
    pub fn is_valid_now(&self) -> bool {
        self.is_valid_at(Utc::now().timestamp())
    }

    /// Raw access to any claim, for fields without a dedicated accessor
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }
}

/// Subject claims appear as strings or numbers depending on backend version
fn claim_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `exp` is an integer per RFC 7519, but some issuers emit a float
fn claim_as_epoch(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use serde_json::json;

    fn make_token(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.sig", header, body)
    }

    #[test]
    fn test_decode_extracts_identity_claims() {
        let token = make_token(&json!({
            "user_id": 42,
            "username": "frodo",
            "exp": 2000000000,
        }));

        let claims = decode_claims(&token).expect("decode failed");
        assert_eq!(claims.subject.as_deref(), Some("42"));
        assert_eq!(claims.username.as_deref(), Some("frodo"));
        assert_eq!(claims.expires_at, Some(2000000000));
    }

    #[test]
    fn test_decode_prefers_sub_over_user_id() {
        let token = make_token(&json!({"sub": "alice", "user_id": 7}));
        let claims = decode_claims(&token).expect("decode failed");
        assert_eq!(claims.subject.as_deref(), Some("alice"));
    }

    #[test]
    fn test_decode_accepts_expired_token() {
        let token = make_token(&json!({"user_id": 1, "exp": 1000}));
        let claims = decode_claims(&token).expect("expired token should still decode");
        assert_eq!(claims.expires_at, Some(1000));
        assert!(!claims.is_valid_now());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_claims("not-a-token").is_err());
        assert!(decode_claims("").is_err());
        // Two segments only
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(r#"{"user_id":1}"#);
        assert!(decode_claims(&format!("{}.{}", header, body)).is_err());
    }

    #[test]
    fn test_decode_rejects_non_json_payload() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode("just some text");
        let token = format!("{}.{}.sig", header, body);
        assert!(decode_claims(&token).is_err());
    }

    #[test]
    fn test_role_hint_staff_flag() {
        let token = make_token(&json!({"user_id": 1, "is_staff": true}));
        let claims = decode_claims(&token).expect("decode failed");
        assert_eq!(claims.role_hint(), Some(Role::Admin));

        let token = make_token(&json!({"user_id": 1, "is_staff": false}));
        let claims = decode_claims(&token).expect("decode failed");
        assert_eq!(claims.role_hint(), Some(Role::Contributor));
    }

    #[test]
    fn test_role_hint_any_admin_signal_wins() {
        // is_staff says no, is_superuser says yes
        let token = make_token(&json!({
            "user_id": 1,
            "is_staff": false,
            "is_superuser": true,
        }));
        let claims = decode_claims(&token).expect("decode failed");
        assert_eq!(claims.role_hint(), Some(Role::Admin));
    }

    #[test]
    fn test_role_hint_string_claims() {
        let token = make_token(&json!({"user_id": 1, "role": "admin"}));
        let claims = decode_claims(&token).expect("decode failed");
        assert_eq!(claims.role_hint(), Some(Role::Admin));

        // Case-insensitive
        let token = make_token(&json!({"user_id": 1, "role": "Administrator"}));
        let claims = decode_claims(&token).expect("decode failed");
        assert_eq!(claims.role_hint(), Some(Role::Admin));

        let token = make_token(&json!({"user_id": 1, "user_type": "staff"}));
        let claims = decode_claims(&token).expect("decode failed");
        assert_eq!(claims.role_hint(), Some(Role::Admin));

        let token = make_token(&json!({"user_id": 1, "role": "viewer"}));
        let claims = decode_claims(&token).expect("decode failed");
        assert_eq!(claims.role_hint(), Some(Role::Contributor));
    }

    #[test]
    fn test_role_hint_absent_is_unknown_not_default() {
        let token = make_token(&json!({"user_id": 1, "exp": 2000000000}));
        let claims = decode_claims(&token).expect("decode failed");
        assert_eq!(claims.role_hint(), None);
    }

    #[test]
    fn test_is_valid_at_boundaries() {
        let token = make_token(&json!({"user_id": 1, "exp": 1000}));
        let claims = decode_claims(&token).expect("decode failed");

        assert!(claims.is_valid_at(999));
        // Exactly at expiry counts as expired
        assert!(!claims.is_valid_at(1000));
        assert!(!claims.is_valid_at(1001));
    }

    #[test]
    fn test_is_valid_without_exp_claim() {
        let token = make_token(&json!({"user_id": 1}));
        let claims = decode_claims(&token).expect("decode failed");
        assert!(claims.is_valid_at(i64::MAX - 1));
        assert!(claims.is_valid_now());
    }
}
