//! Entra ID client-credentials token exchange.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use url::Url;

use crate::{AccessToken, Credentials, TransportConfig, CLIENT_NAME};

const GRANT_TYPE: &str = "client_credentials";

/// A source of bearer tokens for the directory.
#[async_trait]
pub trait TokenSource {
    /// Exchange `credentials` for an access token.
    ///
    /// # Errors
    ///
    /// Any failure to obtain a token is returned as a [`TokenError`]. It is not retried by the
    /// flow.
    async fn acquire_token(&self, credentials: &Credentials) -> Result<AccessToken, TokenError>;
}

/// Requests tokens from an Entra ID tenant using the client-credentials grant.
pub struct TokenExchanger {
    http: reqwest::Client,
    authority: Url,
    max_attempts: u32,
}

impl TokenExchanger {
    /// Construct an exchanger for the given issuer `authority`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialised.
    pub fn new(authority: Url, transport: &TransportConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(CLIENT_NAME)
            .timeout(transport.timeout)
            .connect_timeout(transport.connect_timeout)
            .build()?;

        Ok(Self {
            http,
            authority,
            max_attempts: transport.max_attempts.max(1),
        })
    }

    /// The token endpoint for `tenant_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the authority cannot have a path appended.
    pub fn token_url(&self, tenant_id: &str) -> Result<Url, TokenError> {
        let mut url = self.authority.clone();
        url.path_segments_mut()
            .map_err(|()| {
                TokenError::Transport(format!("invalid token authority {}", self.authority))
            })?
            .pop_if_empty()
            .extend([tenant_id, "oauth2", "v2.0", "token"]);
        Ok(url)
    }

    async fn request_token(
        &self,
        url: &Url,
        credentials: &Credentials,
    ) -> Result<AccessToken, Attempt> {
        let issued_at = Utc::now();
        let response = self
            .http
            .post(url.clone())
            .form(&[
                ("grant_type", GRANT_TYPE),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.expose_secret()),
                ("scope", credentials.scope.as_str()),
            ])
            .send()
            .await
            .map_err(Attempt::from)?;

        let status = response.status();
        log::debug!("token request status: {status}");

        let body = response.text().await.map_err(Attempt::from)?;
        if !status.is_success() {
            return Err(Attempt::Fatal(TokenError::rejected(status, &body)));
        }

        parse_token_response(&body, issued_at).map_err(Attempt::Fatal)
    }
}

#[async_trait]
impl TokenSource for TokenExchanger {
    async fn acquire_token(&self, credentials: &Credentials) -> Result<AccessToken, TokenError> {
        let url = self.token_url(&credentials.tenant_id)?;
        log::info!(
            "requesting token for client {} from {url}",
            credentials.client_id
        );

        let mut attempt = 1;
        loop {
            match self.request_token(&url, credentials).await {
                Ok(token) => break Ok(token),
                Err(Attempt::Transient(message)) if attempt < self.max_attempts => {
                    log::warn!(
                        "token request attempt {attempt}/{} failed, retrying: {message}",
                        self.max_attempts
                    );
                    attempt += 1;
                }
                Err(Attempt::Transient(message)) => break Err(TokenError::Transport(message)),
                Err(Attempt::Fatal(error)) => break Err(error),
            }
        }
    }
}

impl fmt::Debug for TokenExchanger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TokenExchanger")
            .field("authority", &self.authority)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

enum Attempt {
    Transient(String),
    Fatal(TokenError),
}

impl From<reqwest::Error> for Attempt {
    fn from(error: reqwest::Error) -> Self {
        let transient = error.is_connect() || error.is_timeout();
        let message = error_chain(&error.without_url());
        if transient {
            Self::Transient(message)
        } else {
            Self::Fatal(TokenError::Transport(message))
        }
    }
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(serde::Deserialize)]
struct ErrorResponse {
    error: String,
    error_description: Option<String>,
}

fn parse_token_response(body: &str, issued_at: DateTime<Utc>) -> Result<AccessToken, TokenError> {
    macro_rules! invalid_res {
        ($msg:literal) => {
            concat!("invalid token response: ", $msg)
        };
    }

    let res: TokenResponse = serde_json::from_str(body)
        .map_err(|error| TokenError::Malformed(format!(invalid_res!("{}"), error)))?;
    if res.access_token.is_empty() {
        return Err(TokenError::Malformed(
            invalid_res!("empty access_token").to_string(),
        ));
    }

    let expires_at = res
        .expires_in
        .map(|secs| {
            chrono::Duration::try_seconds(secs)
                .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
                .ok_or_else(|| {
                    TokenError::Malformed(invalid_res!("expires_in out of range").to_string())
                })
        })
        .transpose()?;
    Ok(AccessToken::new(res.access_token, issued_at, expires_at))
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// An error that occurred while acquiring an access token.
#[derive(Debug)]
pub enum TokenError {
    /// The issuer could not be reached, or the exchange did not complete.
    Transport(String),

    /// The issuer rejected the request.
    Rejected {
        /// The HTTP status of the response.
        status: u16,

        /// The issuer's explanation, if any.
        message: String,
    },

    /// The issuer responded successfully, but not with a token.
    Malformed(String),

    /// The token expired before it could be used.
    Expired,
}

impl TokenError {
    fn rejected(status: reqwest::StatusCode, body: &str) -> Self {
        let message = match serde_json::from_str::<ErrorResponse>(body) {
            Ok(ErrorResponse {
                error,
                error_description: Some(description),
            }) => format!("{error}: {description}"),
            Ok(ErrorResponse { error, .. }) => error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };
        Self::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Transport(error) => write!(f, "Azure token error: {error}"),
            Self::Rejected { status, message } => {
                write!(f, "Azure token error: rejected with HTTP {status}: {message}")
            }
            Self::Malformed(error) => write!(f, "Azure token error: {error}"),
            Self::Expired => write!(f, "Azure token error: access token has expired"),
        }
    }
}

impl std::error::Error for TokenError {}
