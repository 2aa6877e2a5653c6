use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::security::audit_log::AuditLogger;
use crate::security::auth::{AccessToken, Credentials, Session};
use crate::security::token_cache::TokenCache;
use crate::transport::{ApiRequest, Transport};

pub const AUTHORIZE_ENDPOINT: &str = "authservice/keystone/v3/authenticate-authorize";
pub const TOKEN_ENDPOINT: &str = "authserver/token";

#[derive(Serialize)]
struct AuthorizeRequest<'a> {
    #[serde(rename = "ApplicationId")]
    application_id: &'a str,
    #[serde(rename = "Directory")]
    directory: &'a str,
    #[serde(rename = "Username")]
    username: &'a str,
    #[serde(rename = "Password")]
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthorizeResponse {
    #[serde(rename = "AuthenticationInfo")]
    authentication_info: Option<Session>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Cache,
    Handshake,
}

/// Non-fatal problems encountered while obtaining a token.
#[derive(Debug)]
pub enum Warning {
    CacheWrite(Error),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::CacheWrite(err) => write!(f, "token was not cached: {err}"),
        }
    }
}

#[derive(Debug)]
pub struct Authenticated {
    pub token: AccessToken,
    pub source: TokenSource,
    /// Minutes since the cached token was written; `None` after a fresh login.
    pub cached_minutes_ago: Option<u64>,
    pub cached_at: Option<DateTime<Utc>>,
    pub warnings: Vec<Warning>,
}

/// Runs the session login and token exchange, backed by a file cache.
#[derive(Debug)]
pub struct TokenManager<T: Transport> {
    transport: T,
    application_id: String,
    directory: String,
    token_directory: String,
    cache: TokenCache,
    audit: AuditLogger,
}

impl<T: Transport> TokenManager<T> {
    pub fn new(transport: T, config: &Config) -> Self {
        Self {
            transport,
            application_id: config.application_id.clone(),
            directory: config.directory.clone(),
            token_directory: config.token_directory.clone(),
            cache: TokenCache::new(config.token_cache_path()),
            audit: AuditLogger::new(),
        }
    }

    pub fn with_cache(mut self, cache: TokenCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Reuses a fresh cached token, otherwise logs in with the credentials
    /// produced by `credentials` and caches the result. A failed cache write
    /// is reported in [`Authenticated::warnings`] and does not fail the call.
    pub fn ensure_token<F>(&self, credentials: F) -> Result<Authenticated>
    where
        F: FnOnce() -> Result<Credentials>,
    {
        if let Some(cached) = self.cache.load() {
            self.audit
                .token_cache_hit(self.cache.path(), cached.age_minutes());
            return Ok(Authenticated {
                cached_minutes_ago: Some(cached.age_minutes()),
                cached_at: Some(cached.written_at),
                token: cached.token,
                source: TokenSource::Cache,
                warnings: Vec::new(),
            });
        }

        let credentials = credentials()?;
        let token = self.authenticate(&credentials)?;

        let mut warnings = Vec::new();
        if let Err(err) = self.cache.store(&token) {
            self.audit
                .token_cache_write_failed(self.cache.path(), &err.to_string());
            warnings.push(Warning::CacheWrite(err));
        }

        Ok(Authenticated {
            token,
            source: TokenSource::Handshake,
            cached_minutes_ago: None,
            cached_at: None,
            warnings,
        })
    }

    /// Both handshake steps, without consulting or updating the cache.
    pub fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken> {
        debug!(
            username = %credentials.username,
            password = %credentials.masked_password(),
            application_id = %self.application_id,
            "authenticating against keystone"
        );

        let session = self.open_session(credentials).inspect_err(|err| {
            self.audit
                .auth_failure(&credentials.username, "authenticate-authorize", &err.to_string());
        })?;
        let token = self.exchange_session(&session).inspect_err(|err| {
            self.audit
                .auth_failure(&credentials.username, "token", &err.to_string());
        })?;

        self.audit.auth_success(&credentials.username);
        info!(username = %credentials.username, "keystone authentication succeeded");
        Ok(token)
    }

    fn open_session(&self, credentials: &Credentials) -> Result<Session> {
        let payload = AuthorizeRequest {
            application_id: &self.application_id,
            directory: &self.directory,
            username: &credentials.username,
            password: credentials.password(),
        };
        let resp = self
            .transport
            .request(ApiRequest::post_json(AUTHORIZE_ENDPOINT, &payload)?)?;

        if !resp.is_ok() {
            debug!(status = resp.status, body = %resp.text(), "keystone rejected the request");
            return Err(Error::Session(format!(
                "authenticate-authorize failed with status code: {}",
                resp.status
            )));
        }

        let value: Value = serde_json::from_slice(&resp.body)
            .map_err(|e| Error::decode("authenticate-authorize response", e))?;
        let parsed: AuthorizeResponse = serde_json::from_value(value)
            .map_err(|e| Error::Session(format!("unexpected authenticate-authorize payload: {e}")))?;

        let session = parsed
            .authentication_info
            .ok_or_else(|| Error::Session("response has no AuthenticationInfo".to_string()))?;
        if session.session_id.is_empty() {
            return Err(Error::Session("can't get SessionId".to_string()));
        }
        if session.session_token.is_empty() {
            return Err(Error::Session("can't get SessionToken".to_string()));
        }

        debug!(session = ?session, "keystone session opened");
        Ok(session)
    }

    fn exchange_session(&self, session: &Session) -> Result<AccessToken> {
        let request = ApiRequest::post_form(
            TOKEN_ENDPOINT,
            &[
                ("grant_type", "password"),
                ("directory", &self.token_directory),
                ("sessionid", &session.session_id),
                ("sessiontoken", &session.session_token),
            ],
        );
        let resp = self.transport.request(request)?;

        if !resp.is_ok() {
            debug!(status = resp.status, body = %resp.text(), "keystone rejected the request");
            return Err(Error::Token(format!(
                "token exchange failed with status code: {}",
                resp.status
            )));
        }

        let value: Value = serde_json::from_slice(&resp.body)
            .map_err(|e| Error::decode("token response", e))?;
        let parsed: TokenResponse = serde_json::from_value(value)
            .map_err(|e| Error::Token(format!("unexpected token payload: {e}")))?;

        match parsed.access_token {
            Some(token) if !token.is_empty() => {
                let token = AccessToken::new(token);
                debug!(token = %token, "access token issued");
                Ok(token)
            }
            _ => {
                warn!("token response carried no access_token");
                Err(Error::Token("keystone authentication failed".to_string()))
            }
        }
    }
}
