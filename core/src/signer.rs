//! WSSE `UsernameToken` signing.
//!
//! Every request carries an `X-WSSE` header of the form
//!
//! ```text
//! UsernameToken Username="u", PasswordDigest="d", Nonce="n", Created="c"
//! ```
//!
//! where `Created` is the current time in ISO-8601 with offset, `Nonce` is
//! the hex MD5 of the epoch seconds of the coming Friday (same time of day)
//! and `PasswordDigest` is base64(SHA-1(nonce + created + secret)).

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Datelike, FixedOffset, TimeDelta, Utc, Weekday};
use md5::Md5;
use sha1::{Digest, Sha1};

/// Header carrying the signature.
pub const WSSE_HEADER: &str = "X-WSSE";

/// How the SHA-1 digest is turned into `PasswordDigest`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DigestEncoding {
    /// base64 of the 20 raw digest bytes.
    #[default]
    Raw,
    /// base64 of the 40-character lowercase hex digest, as older PHP
    /// integrations compute it.
    HexString,
}

/// Account credentials. The secret never leaves this type in clear form.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    secret: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// The four parts of a `UsernameToken`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsseToken {
    pub username: String,
    pub password_digest: String,
    pub nonce: String,
    pub created: String,
}

impl WsseToken {
    /// Build the token for the instant `now`.
    pub fn generate(
        username: &str,
        secret: &str,
        now: DateTime<FixedOffset>,
        encoding: DigestEncoding,
    ) -> Self {
        let created = created_stamp(now);
        let nonce = nonce_for(now);
        let password_digest = password_digest(&nonce, &created, secret, encoding);
        Self {
            username: username.to_string(),
            password_digest,
            nonce,
            created,
        }
    }

    /// Parse a header value produced by `Display`.
    ///
    /// The four keys must appear in the order `Display` writes them. The
    /// digest, nonce and timestamp never contain quotes, so the username is
    /// everything up to the last `", PasswordDigest="` and may itself hold
    /// quotes or `", "`.
    pub fn parse(header: &str) -> Option<Self> {
        let rest = header.trim().strip_prefix("UsernameToken Username=\"")?;
        let (username, rest) = rest.rsplit_once("\", PasswordDigest=\"")?;
        let (password_digest, rest) = rest.split_once("\", Nonce=\"")?;
        let (nonce, rest) = rest.split_once("\", Created=\"")?;
        let created = rest.strip_suffix('"')?;
        if [password_digest, nonce, created].iter().any(|v| v.contains('"')) {
            return None;
        }
        Some(Self {
            username: username.to_string(),
            password_digest: password_digest.to_string(),
            nonce: nonce.to_string(),
            created: created.to_string(),
        })
    }
}

impl fmt::Display for WsseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UsernameToken Username=\"{}\", PasswordDigest=\"{}\", Nonce=\"{}\", Created=\"{}\"",
            self.username, self.password_digest, self.nonce, self.created
        )
    }
}

/// Signs requests on behalf of one account.
#[derive(Debug, Clone)]
pub struct WsseSigner {
    credentials: Credentials,
    encoding: DigestEncoding,
}

impl WsseSigner {
    pub fn new(credentials: Credentials, encoding: DigestEncoding) -> Self {
        Self {
            credentials,
            encoding,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Header value for the current wall-clock time.
    pub fn signature(&self) -> String {
        self.signature_at(Utc::now().fixed_offset())
    }

    pub fn signature_at(&self, now: DateTime<FixedOffset>) -> String {
        WsseToken::generate(
            &self.credentials.username,
            &self.credentials.secret,
            now,
            self.encoding,
        )
        .to_string()
    }
}

/// Header value for `username`/`secret` at the current time.
pub fn sign(username: &str, secret: &str) -> String {
    WsseToken::generate(username, secret, Utc::now().fixed_offset(), DigestEncoding::Raw).to_string()
}

/// `Y-m-d\TH:i:sP`, e.g. `2024-01-03T15:30:00+00:00`.
pub fn created_stamp(now: DateTime<FixedOffset>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Hex MD5 of the epoch seconds of the next Friday at the same time of day.
/// On a Friday the instant itself is used.
pub fn nonce_for(now: DateTime<FixedOffset>) -> String {
    let today = now.weekday().num_days_from_monday();
    let friday = Weekday::Fri.num_days_from_monday();
    let days_ahead = (7 + friday - today) % 7;
    let next_friday = now + TimeDelta::days(i64::from(days_ahead));
    hex::encode(Md5::digest(next_friday.timestamp().to_string().as_bytes()))
}

pub fn password_digest(nonce: &str, created: &str, secret: &str, encoding: DigestEncoding) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce.as_bytes());
    hasher.update(created.as_bytes());
    hasher.update(secret.as_bytes());
    let digest = hasher.finalize();
    match encoding {
        DigestEncoding::Raw => BASE64.encode(digest),
        DigestEncoding::HexString => BASE64.encode(hex::encode(digest)),
    }
}
