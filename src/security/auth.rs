use std::fmt;

use serde::Deserialize;

use crate::error::{Error, Result};

const MASK_VISIBLE: usize = 4;

pub const USERNAME_ENV: &str = "KEYSTONE_USERNAME";
pub const PASSWORD_ENV: &str = "KEYSTONE_PASSWORD";

/// Username/password pair, held only for the login call.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let username = username.into().trim().to_string();
        let password = password.into();
        if username.is_empty() || password.is_empty() {
            return Err(Error::Credentials(
                "username or password cannot be empty".to_string(),
            ));
        }
        Ok(Self { username, password })
    }

    /// Reads both values from the environment; `None` unless both are set.
    pub fn from_env() -> Option<Result<Self>> {
        let username = std::env::var(USERNAME_ENV).ok()?;
        let password = std::env::var(PASSWORD_ENV).ok()?;
        Some(Self::new(username, password))
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn masked_password(&self) -> String {
        mask_secret(&self.password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.masked_password())
            .finish()
    }
}

/// Shows the first and last four characters of a secret. Secrets too short
/// to keep anything hidden are fully masked.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= MASK_VISIBLE * 2 {
        return "****".to_string();
    }
    let first: String = chars[..MASK_VISIBLE].iter().collect();
    let last: String = chars[chars.len() - MASK_VISIBLE..].iter().collect();
    format!("{first}****{last}")
}

/// Short-lived pair produced by authenticate-authorize and consumed by the
/// token exchange.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct Session {
    #[serde(rename = "SessionId", default)]
    pub session_id: String,
    #[serde(rename = "SessionToken", default)]
    pub session_token: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("session_token", &mask_secret(&self.session_token))
            .finish()
    }
}

/// Opaque bearer credential.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&mask_secret(&self.0))
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_reject_empty() {
        assert!(matches!(Credentials::new("", "pw"), Err(Error::Credentials(_))));
        assert!(matches!(Credentials::new("user", ""), Err(Error::Credentials(_))));
        assert!(matches!(Credentials::new("   ", "pw"), Err(Error::Credentials(_))));
    }

    #[test]
    fn test_mask_long_password() {
        let creds = Credentials::new("hub01", "correcthorsebattery").unwrap();
        assert_eq!(creds.masked_password(), "corr****tery");
    }

    #[test]
    fn test_mask_short_password_hides_everything() {
        assert_eq!(mask_secret("abcdefgh"), "****");
        assert_eq!(mask_secret("ab"), "****");
        assert_eq!(mask_secret(""), "****");
    }

    #[test]
    fn test_mask_multibyte() {
        assert_eq!(mask_secret("ééééxxxxüüüü"), "éééé****üüüü");
    }

    #[test]
    fn test_debug_never_prints_password() {
        let creds = Credentials::new("hub01", "supersecretvalue").unwrap();
        let out = format!("{creds:?}");
        assert!(!out.contains("supersecretvalue"));
        assert!(out.contains("hub01"));
    }

    #[test]
    fn test_token_display_is_masked() {
        let token = AccessToken::new("eyJhbGciOiJSUzI1NiJ9.payload");
        assert_eq!(token.as_str(), "eyJhbGciOiJSUzI1NiJ9.payload");
        assert_eq!(token.to_string(), "eyJh****load");
    }

    #[test]
    fn test_credentials_from_env() {
        std::env::set_var(USERNAME_ENV, "envuser");
        std::env::set_var(PASSWORD_ENV, "envpass");

        let creds = Credentials::from_env().unwrap().unwrap();
        assert_eq!(creds.username, "envuser");
        assert_eq!(creds.password(), "envpass");

        std::env::remove_var(PASSWORD_ENV);
        assert!(Credentials::from_env().is_none());
        std::env::remove_var(USERNAME_ENV);
    }
}
