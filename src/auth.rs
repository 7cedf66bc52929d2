//! Shared-credential session gate.
//!
//! One username/password pair unlocks every screen. A successful login issues
//! a session token, the `roadmap-session` cookie, carrying the sentinel value
//! `authenticated`, an expiry seven days out, and an HMAC-SHA256 over both
//! keyed by the session secret. The CLI keeps its token in
//! `<data-dir>/session.kdl`; the HTTP API hands it out as a cookie.

use chrono::{DateTime, Duration, Utc};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::Serialize;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::ResolvedConfig;
use crate::{Error, Result};

/// Cookie carrying the session.
pub const SESSION_COOKIE_NAME: &str = "roadmap-session";

/// Sentinel value of an authenticated session.
pub const SESSION_VALUE: &str = "authenticated";

/// Session lifetime in seconds (7 days).
pub const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 7;

/// Permissions of the session file.
#[cfg(unix)]
pub const SESSION_FILE_MODE: u32 = 0o600;

const SESSION_FILE: &str = "session.kdl";

/// Result of a session check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
}

/// A signed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub signature: String,
}

impl SessionToken {
    /// Issue a fresh token valid for [`SESSION_MAX_AGE_SECS`] from `now`.
    pub fn issue(secret: &str, now: DateTime<Utc>) -> Self {
        let expires_at = truncate_to_secs(now + Duration::seconds(SESSION_MAX_AGE_SECS));
        Self {
            value: SESSION_VALUE.to_string(),
            signature: sign(SESSION_VALUE, expires_at, secret),
            expires_at,
        }
    }

    /// True when the value is the sentinel, the signature matches and the
    /// token has not expired.
    pub fn is_valid(&self, secret: &str, now: DateTime<Utc>) -> bool {
        self.value == SESSION_VALUE && now < self.expires_at && self.verify(secret)
    }

    fn verify(&self, secret: &str) -> bool {
        let Ok(signature) = hex::decode(&self.signature) else {
            return false;
        };
        mac(&self.value, self.expires_at, secret).is_some_and(|m| m.verify_slice(&signature).is_ok())
    }

    /// Cookie value: `<value>.<expiry-unix-secs>.<signature>`.
    pub fn cookie_value(&self) -> String {
        format!(
            "{}.{}.{}",
            self.value,
            self.expires_at.timestamp(),
            self.signature
        )
    }

    /// Parse a cookie value produced by [`SessionToken::cookie_value`].
    pub fn parse_cookie(s: &str) -> Option<Self> {
        let mut parts = s.splitn(3, '.');
        let value = parts.next()?;
        let expires = parts.next()?.parse::<i64>().ok()?;
        let signature = parts.next()?;
        Some(Self {
            value: value.to_string(),
            expires_at: DateTime::from_timestamp(expires, 0)?,
            signature: signature.to_string(),
        })
    }

    /// `Set-Cookie` header value for this token.
    pub fn set_cookie_header(&self) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE_NAME,
            self.cookie_value(),
            SESSION_MAX_AGE_SECS
        )
    }

    fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();
        let mut node = KdlNode::new("session");
        node.push(KdlEntry::new(KdlValue::String(self.value.clone())));
        node.push(KdlEntry::new_prop(
            "expires",
            KdlValue::Integer(self.expires_at.timestamp() as i128),
        ));
        node.push(KdlEntry::new_prop(
            "signature",
            KdlValue::String(self.signature.clone()),
        ));
        doc.nodes_mut().push(node);
        doc
    }

    fn from_kdl(doc: &KdlDocument) -> Option<Self> {
        let node = doc.get("session")?;
        let entries = node.entries();

        let value = entries
            .iter()
            .find(|e| e.name().is_none())
            .and_then(|e| e.value().as_string())?;
        let expires = entries
            .iter()
            .find(|e| e.name().map(|n| n.value()) == Some("expires"))
            .and_then(|e| e.value().as_integer())?;
        let signature = entries
            .iter()
            .find(|e| e.name().map(|n| n.value()) == Some("signature"))
            .and_then(|e| e.value().as_string())?;

        Some(Self {
            value: value.to_string(),
            expires_at: DateTime::from_timestamp(i64::try_from(expires).ok()?, 0)?,
            signature: signature.to_string(),
        })
    }
}

/// Expired `Set-Cookie` header value that clears the session.
pub fn clear_cookie_header() -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        SESSION_COOKIE_NAME
    )
}

type HmacSha256 = Hmac<Sha256>;

fn mac(value: &str, expires_at: DateTime<Utc>, secret: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(value.as_bytes());
    mac.update(&expires_at.timestamp().to_le_bytes());
    Some(mac)
}

fn sign(value: &str, expires_at: DateTime<Utc>, secret: &str) -> String {
    mac(value, expires_at, secret)
        .map(|m| hex::encode(m.finalize().into_bytes()))
        .unwrap_or_default()
}

fn truncate_to_secs(t: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(t.timestamp(), 0).unwrap_or(t)
}

/// Login gate over one data directory.
#[derive(Debug, Clone)]
pub struct SessionGate {
    path: PathBuf,
    username: String,
    password: String,
    secret: String,
}

impl SessionGate {
    pub fn new(data_dir: &Path, config: &ResolvedConfig) -> Self {
        Self {
            path: data_dir.join(SESSION_FILE),
            username: config.username.value.clone(),
            password: config.password.value.clone(),
            secret: config.session_secret.value.clone(),
        }
    }

    /// Path of the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check the stored session. An unreadable or malformed file is a
    /// logged-out session.
    pub fn check_session(&self) -> SessionStatus {
        self.check_session_at(Utc::now())
    }

    pub fn check_session_at(&self, now: DateTime<Utc>) -> SessionStatus {
        let authenticated = self
            .read_token()
            .is_some_and(|token| token.is_valid(&self.secret, now));
        SessionStatus { authenticated }
    }

    /// Fail with [`Error::Unauthenticated`] unless a valid session is stored.
    pub fn require(&self) -> Result<()> {
        if self.check_session().authenticated {
            Ok(())
        } else {
            Err(Error::Unauthenticated)
        }
    }

    /// Verify the credential pair and issue a token without storing it.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<SessionToken> {
        if username != self.username || password != self.password {
            warn!(username, "rejected login");
            return Err(Error::InvalidCredentials);
        }
        Ok(SessionToken::issue(&self.secret, Utc::now()))
    }

    /// Check a cookie value sent by a client.
    pub fn validate_cookie(&self, cookie_value: &str) -> bool {
        SessionToken::parse_cookie(cookie_value)
            .is_some_and(|token| token.is_valid(&self.secret, Utc::now()))
    }

    /// Log in and store the session.
    pub fn login(&self, username: &str, password: &str) -> Result<()> {
        let token = self.authenticate(username, password)?;
        self.write_token(&token)?;
        info!(username, expires_at = %token.expires_at, "logged in");
        Ok(())
    }

    /// Remove the stored session. Logging out twice succeeds.
    pub fn logout(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        info!("logged out");
        Ok(())
    }

    fn read_token(&self) -> Option<SessionToken> {
        let content = fs::read_to_string(&self.path).ok()?;
        let doc: KdlDocument = content.parse().ok()?;
        SessionToken::from_kdl(&doc)
    }

    fn write_token(&self, token: &SessionToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(SESSION_FILE_MODE);
        }
        let mut file = options.open(&self.path)?;
        file.write_all(token.to_kdl().to_string().as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn gate(dir: &TempDir) -> SessionGate {
        SessionGate::new(dir.path(), &ResolvedConfig::default())
    }

    #[test]
    fn test_login_with_default_credentials() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);
        assert!(!gate.check_session().authenticated);

        gate.login("payProduct", "payProduct!@#").unwrap();
        assert!(gate.check_session().authenticated);
        assert!(gate.require().is_ok());
    }

    #[test]
    fn test_wrong_password_is_rejected() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);

        let err = gate.login("payProduct", "nope").unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials));
        assert!(!gate.path().exists());
        assert!(matches!(gate.require(), Err(Error::Unauthenticated)));
    }

    #[test]
    fn test_logout_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);
        gate.login("payProduct", "payProduct!@#").unwrap();

        gate.logout().unwrap();
        assert!(!gate.check_session().authenticated);
        gate.logout().unwrap();
    }

    #[test]
    fn test_session_expires_after_seven_days() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);
        gate.login("payProduct", "payProduct!@#").unwrap();

        let later = Utc::now() + Duration::days(6);
        assert!(gate.check_session_at(later).authenticated);
        let expired = Utc::now() + Duration::days(8);
        assert!(!gate.check_session_at(expired).authenticated);
    }

    #[test]
    fn test_changed_secret_invalidates_session() {
        let dir = TempDir::new().unwrap();
        gate(&dir).login("payProduct", "payProduct!@#").unwrap();

        let mut config = ResolvedConfig::default();
        config.session_secret.value = "rotated".to_string();
        let rotated = SessionGate::new(dir.path(), &config);
        assert!(!rotated.check_session().authenticated);
    }

    #[test]
    fn test_malformed_session_file_is_logged_out() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);
        fs::write(gate.path(), "session \"authenticated\"").unwrap();
        assert!(!gate.check_session().authenticated);

        fs::write(gate.path(), "not { valid kdl").unwrap();
        assert!(!gate.check_session().authenticated);
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);
        gate.login("payProduct", "payProduct!@#").unwrap();

        let mode = fs::metadata(gate.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, SESSION_FILE_MODE);
    }

    #[test]
    fn test_cookie_round_trip_and_tamper() {
        let now = Utc::now();
        let token = SessionToken::issue("secret", now);
        let parsed = SessionToken::parse_cookie(&token.cookie_value()).unwrap();
        assert_eq!(parsed, token);
        assert!(parsed.is_valid("secret", now));

        let forged = SessionToken {
            value: "admin".to_string(),
            ..token.clone()
        };
        assert!(!forged.is_valid("secret", now));
        assert!(SessionToken::parse_cookie(SESSION_VALUE).is_none());
    }

    #[test]
    fn test_signature_is_hmac_sha256() {
        let expires_at = DateTime::from_timestamp(1_800_000_000, 0).unwrap();
        assert_eq!(
            sign(SESSION_VALUE, expires_at, "secret"),
            "415063d5e0c0bb6eccc834465b3eb44d464968c9a2a48afdbbcd6511220c6371"
        );
    }

    #[test]
    fn test_altered_signature_or_expiry_is_rejected() {
        let now = Utc::now();
        let token = SessionToken::issue("secret", now);

        let mut flipped = token.clone();
        let last = if flipped.signature.ends_with('0') { "1" } else { "0" };
        flipped.signature.pop();
        flipped.signature.push_str(last);
        assert!(!flipped.is_valid("secret", now));

        let not_hex = SessionToken {
            signature: "zz".repeat(32),
            ..token.clone()
        };
        assert!(!not_hex.is_valid("secret", now));

        let truncated = SessionToken {
            signature: token.signature[..32].to_string(),
            ..token.clone()
        };
        assert!(!truncated.is_valid("secret", now));

        let extended = SessionToken {
            expires_at: token.expires_at + Duration::days(30),
            ..token.clone()
        };
        assert!(!extended.is_valid("secret", now));
    }

    #[cfg(unix)]
    #[test]
    fn test_relogin_keeps_session_file_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);
        gate.login("payProduct", "payProduct!@#").unwrap();
        gate.login("payProduct", "payProduct!@#").unwrap();

        let mode = fs::metadata(gate.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, SESSION_FILE_MODE);
        assert!(gate.check_session().authenticated);
    }

    #[test]
    fn test_validate_cookie() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);
        let token = gate.authenticate("payProduct", "payProduct!@#").unwrap();

        assert!(gate.validate_cookie(&token.cookie_value()));
        assert!(!gate.validate_cookie("authenticated"));
        assert!(!gate.validate_cookie(""));
    }

    #[test]
    fn test_set_cookie_header() {
        let token = SessionToken::issue("secret", Utc::now());
        let header = token.set_cookie_header();
        assert!(header.starts_with("roadmap-session=authenticated."));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Max-Age=604800"));
        assert!(clear_cookie_header().contains("Max-Age=0"));
    }
}
