use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::Deserialize;
use shared::Role;

use crate::core::guard::SessionView;

const TOKEN_KEY: &str = "authToken";

/// Claims decoded from the bearer token's payload segment. Read-only on the
/// client; the backend re-validates the signature on every request, so this
/// is a UI affordance and never an authorization decision.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    #[serde(default)]
    pub branch_id: Option<i64>,
    #[serde(default)]
    pub branch_name: Option<String>,
    pub exp: i64,
}

/// Decode the middle segment of a compact JWT without verifying the
/// signature. Any malformed input yields None, never a panic.
pub fn decode_claims(token: &str) -> Option<Claims> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Whether claims are still valid at `now_secs` (unix seconds).
pub fn claims_fresh(claims: &Claims, now_secs: i64) -> bool {
    claims.exp > now_secs
}

/// localStorage-backed session state. All accessors swallow decode
/// failures: a bad token reads as an empty session, and the caller keeps
/// running.
pub struct Session;

impl Session {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok().flatten()
    }

    fn now_secs() -> i64 {
        (js_sys::Date::now() / 1000.0) as i64
    }

    pub fn token() -> Option<String> {
        Self::storage()?.get_item(TOKEN_KEY).ok().flatten()
    }

    pub fn store_token(token: &str) {
        if let Some(storage) = Self::storage() {
            let _ = storage.set_item(TOKEN_KEY, token);
        }
    }

    pub fn logout() {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(TOKEN_KEY);
        }
    }

    pub fn claims() -> Option<Claims> {
        let token = Self::token()?;
        match decode_claims(&token) {
            Some(claims) => Some(claims),
            None => {
                gloo::console::warn!("failed to decode session token payload");
                None
            }
        }
    }

    /// True iff a token is present and unexpired. An expired token is
    /// removed on read (lazy eviction, no timer).
    pub fn is_logged_in() -> bool {
        let Some(claims) = Self::claims() else {
            return false;
        };
        if claims_fresh(&claims, Self::now_secs()) {
            true
        } else {
            Self::logout();
            false
        }
    }

    pub fn role() -> Option<Role> {
        Self::claims().map(|c| c.role)
    }

    pub fn username() -> String {
        Self::claims().map(|c| c.sub).unwrap_or_default()
    }

    pub fn branch_id() -> Option<i64> {
        Self::claims().and_then(|c| c.branch_id)
    }

    pub fn branch_name() -> Option<String> {
        Self::claims().and_then(|c| c.branch_name)
    }

    pub fn view() -> SessionView {
        SessionView {
            logged_in: Self::is_logged_in(),
            role: Self::role(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_for(payload: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.as_bytes());
        format!("{header}.{body}.signature")
    }

    #[test]
    fn decodes_full_claim_set() {
        let token = token_for(
            r#"{"sub":"colombo","role":"USER","branch_id":7,"branch_name":"COLOMBO","exp":4102444800}"#,
        );
        let claims = decode_claims(&token).expect("decodes");
        assert_eq!(claims.sub, "colombo");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.branch_id, Some(7));
        assert_eq!(claims.branch_name.as_deref(), Some("COLOMBO"));
    }

    #[test]
    fn branch_claims_are_optional_for_admins() {
        let token = token_for(r#"{"sub":"admin","role":"ADMIN","exp":4102444800}"#);
        let claims = decode_claims(&token).expect("decodes");
        assert!(claims.role.is_admin());
        assert_eq!(claims.branch_id, None);
        assert_eq!(claims.branch_name, None);
    }

    #[test]
    fn malformed_tokens_decode_to_none() {
        assert_eq!(decode_claims(""), None);
        assert_eq!(decode_claims("not-a-jwt"), None);
        assert_eq!(decode_claims("a.!!!notbase64!!!.c"), None);
        let bad_json = token_for("{\"sub\":");
        assert_eq!(decode_claims(&bad_json), None);
    }

    #[test]
    fn freshness_is_strictly_future() {
        let token = token_for(r#"{"sub":"admin","role":"ADMIN","exp":1000}"#);
        let claims = decode_claims(&token).unwrap();
        assert!(claims_fresh(&claims, 999));
        assert!(!claims_fresh(&claims, 1000));
        assert!(!claims_fresh(&claims, 1001));
    }
}
