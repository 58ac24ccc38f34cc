//! One-time activation links.
//!
//! A token is `{timestamp_base36}-{hmac_hex}`. The HMAC covers the user's
//! id and the parts of the row that activation changes, so the token stops
//! verifying once the account is activated or the password is replaced.
//! Nothing is stored server side.

use anyhow::Result;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::SecurityConfig;
use crate::db::User;

type HmacSha256 = Hmac<Sha256>;

const KEY_SALT: &str = "smartanom.accounts.activation";

/// The user state an activation token is bound to.
#[derive(Debug, Clone, Copy)]
pub struct TokenSubject<'a> {
    pub user_id: i32,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub is_active: bool,
    pub email_verified: bool,
}

impl<'a> TokenSubject<'a> {
    #[must_use]
    pub fn new(user: &'a User, password_hash: &'a str) -> Self {
        Self {
            user_id: user.id,
            email: &user.email,
            password_hash,
            is_active: user.is_active,
            email_verified: user.email_verified,
        }
    }
}

#[derive(Clone)]
pub struct ActivationTokens {
    secret: Vec<u8>,
    ttl: Duration,
}

impl ActivationTokens {
    #[must_use]
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl,
        }
    }

    #[must_use]
    pub fn from_config(config: &SecurityConfig) -> Self {
        let ttl = i64::try_from(config.activation_token_ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or_else(|| Duration::days(3));
        Self::new(&config.secret_key, ttl)
    }

    pub fn make_token(&self, subject: &TokenSubject<'_>, now: DateTime<Utc>) -> Result<String> {
        let timestamp = u64::try_from(now.timestamp())
            .map_err(|_| anyhow::anyhow!("Clock is before the Unix epoch"))?;
        let mac = self.mac(subject, timestamp)?;
        Ok(format!(
            "{}-{}",
            to_base36(timestamp),
            hex::encode(mac.finalize().into_bytes())
        ))
    }

    /// Returns `false` for malformed, forged, stale or expired tokens.
    #[must_use]
    pub fn check_token(&self, subject: &TokenSubject<'_>, token: &str, now: DateTime<Utc>) -> bool {
        let Some((ts, signature)) = token.split_once('-') else {
            return false;
        };
        let Ok(timestamp) = u64::from_str_radix(ts, 36) else {
            return false;
        };
        let Ok(signature) = hex::decode(signature) else {
            return false;
        };
        let Ok(mac) = self.mac(subject, timestamp) else {
            return false;
        };
        if mac.verify_slice(&signature).is_err() {
            return false;
        }

        let Some(issued) = i64::try_from(timestamp)
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        else {
            return false;
        };

        issued <= now && now - issued <= self.ttl
    }

    fn mac(&self, subject: &TokenSubject<'_>, timestamp: u64) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| anyhow::anyhow!("HMAC error: {e}"))?;
        let payload = format!(
            "{KEY_SALT}|{}|{}|{}|{}|{}|{timestamp}",
            subject.user_id,
            subject.password_hash,
            subject.is_active,
            subject.email_verified,
            subject.email,
        );
        mac.update(payload.as_bytes());
        Ok(mac)
    }
}

/// URL-safe, unpadded base64 of the decimal user id.
#[must_use]
pub fn encode_uid(user_id: i32) -> String {
    URL_SAFE_NO_PAD.encode(user_id.to_string())
}

/// Inverse of [`encode_uid`]. Trailing `=` padding is accepted.
#[must_use]
pub fn decode_uid(uidb64: &str) -> Option<i32> {
    let bytes = URL_SAFE_NO_PAD.decode(uidb64.trim_end_matches('=')).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    text.parse::<i32>().ok().filter(|id| *id > 0)
}

/// `{base}/activate/{uidb64}/{token}`
#[must_use]
pub fn activation_link(frontend_base_url: &str, uidb64: &str, token: &str) -> String {
    format!(
        "{}/activate/{uidb64}/{token}",
        frontend_base_url.trim_end_matches('/')
    )
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(is_active: bool) -> TokenSubject<'static> {
        TokenSubject {
            user_id: 7,
            email: "grower@example.com",
            password_hash: "$argon2id$v=19$m=1024,t=1,p=1$c2FsdA$aGFzaA",
            is_active,
            email_verified: is_active,
        }
    }

    fn tokens() -> ActivationTokens {
        ActivationTokens::new("test-secret", Duration::days(3))
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn fresh_token_verifies() {
        let token = tokens().make_token(&subject(false), at(0)).unwrap();
        assert!(token.contains('-'));
        assert!(tokens().check_token(&subject(false), &token, at(60)));
    }

    #[test]
    fn activation_invalidates_token() {
        let token = tokens().make_token(&subject(false), at(0)).unwrap();
        assert!(!tokens().check_token(&subject(true), &token, at(60)));
    }

    #[test]
    fn tampered_or_foreign_tokens_fail() {
        let t = tokens();
        let token = t.make_token(&subject(false), at(0)).unwrap();

        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });
        assert!(!t.check_token(&subject(false), &tampered, at(1)));

        let other_key = ActivationTokens::new("other-secret", Duration::days(3));
        assert!(!other_key.check_token(&subject(false), &token, at(1)));

        assert!(!t.check_token(&subject(false), "garbage", at(1)));
        assert!(!t.check_token(&subject(false), "zz-nothex", at(1)));
    }

    #[test]
    fn expiry_is_enforced() {
        let t = tokens();
        let token = t.make_token(&subject(false), at(0)).unwrap();
        let three_days = Duration::days(3).num_seconds();
        assert!(t.check_token(&subject(false), &token, at(three_days)));
        assert!(!t.check_token(&subject(false), &token, at(three_days + 1)));
        assert!(!t.check_token(&subject(false), &token, at(-10)));
    }

    #[test]
    fn uid_encoding() {
        assert_eq!(encode_uid(42), "NDI");
        assert_eq!(decode_uid("NDI"), Some(42));
        assert_eq!(decode_uid("NDI="), Some(42));
        assert_eq!(decode_uid("!!"), None);
        assert_eq!(decode_uid(&URL_SAFE_NO_PAD.encode("abc")), None);
    }

    #[test]
    fn link_format() {
        assert_eq!(
            activation_link("http://10.0.2.2:8081/", "NDI", "abc-123"),
            "http://10.0.2.2:8081/activate/NDI/abc-123"
        );
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
