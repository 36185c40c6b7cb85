use lazy_static::lazy_static;
use rand::RngCore;
use regex::Regex;
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Generate a raw reset token and the digest that gets persisted.
///
/// The raw value is 32 random bytes hex-encoded with the user id appended;
/// only the digest is ever stored. Returns `(raw, digest)`.
pub fn new_reset_token(user_id: Uuid) -> (String, String) {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let raw = format!("{}{}", hex::encode(bytes), user_id);
    let digest = hash_reset_token(&raw);
    (raw, digest)
}

/// SHA-256 hex digest of a presented token, matching what is stored.
pub fn hash_reset_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// HTML body for the reset email, mirroring the notice that the link is
/// only valid for the configured window.
pub fn reset_email_body(name: &str, reset_url: &str, ttl_minutes: i64) -> String {
    format!(
        "<h2>Hello {name}</h2>\
         <p>Please click on the link below to reset your password.</p>\
         <p>This reset link is valid for only {ttl_minutes} minutes.</p>\
         <a href=\"{reset_url}\">{reset_url}</a>\
         <p>Regards,</p>\
         <p>The inventory system team</p>"
    )
}

/// Build the `Set-Cookie` value for the session token: HTTP-only,
/// cross-site, expiring with the JWT.
pub fn session_cookie(token: &str, max_age_minutes: i64) -> String {
    format!(
        "token={token}; Path=/; Max-Age={}; HttpOnly; SameSite=None; Secure",
        max_age_minutes * 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses_and_rejects_junk() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@example.com"));
        assert!(!is_valid_email("a@b"));
    }

    #[test]
    fn raw_token_embeds_user_id_and_digest_matches() {
        let user_id = Uuid::new_v4();
        let (raw, digest) = new_reset_token(user_id);
        assert!(raw.ends_with(&user_id.to_string()));
        assert_eq!(raw.len(), 64 + 36); // 32 bytes hex + hyphenated uuid
        assert_eq!(digest, hash_reset_token(&raw));
        assert_eq!(digest.len(), 64); // sha-256 hex
    }

    #[test]
    fn distinct_tokens_for_the_same_user() {
        let user_id = Uuid::new_v4();
        let (raw_a, digest_a) = new_reset_token(user_id);
        let (raw_b, digest_b) = new_reset_token(user_id);
        assert_ne!(raw_a, raw_b);
        assert_ne!(digest_a, digest_b);
    }

    #[test]
    fn tampered_token_does_not_match_digest() {
        let (raw, digest) = new_reset_token(Uuid::new_v4());
        let mut tampered = raw.clone();
        tampered.push('0');
        assert_ne!(hash_reset_token(&tampered), digest);
    }

    #[test]
    fn email_body_carries_link_and_ttl() {
        let body = reset_email_body("Ada", "http://localhost:3000/reset-password/abc", 30);
        assert!(body.contains("Hello Ada"));
        assert!(body.contains("http://localhost:3000/reset-password/abc"));
        assert!(body.contains("30 minutes"));
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("abc.def.ghi", 60 * 24);
        assert!(cookie.starts_with("token=abc.def.ghi;"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Path=/"));
    }
}
