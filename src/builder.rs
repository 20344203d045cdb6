use std::{fmt, time::Duration};

use url::Url;

use crate::{DirectoryClient, SelectionFlow, TokenExchanger};

const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadlines and retry policy shared by the token exchange and the directory queries.
///
/// Nothing is inherited from transport defaults: every remote call gets these limits.
#[derive(Clone, Debug, Eq, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub struct TransportConfig {
    /// Deadline for a single remote operation, including reading the response.
    pub timeout: Duration,

    /// Deadline for establishing a connection.
    pub connect_timeout: Duration,

    /// Total attempts per remote call. `1` disables retries.
    pub max_attempts: u32,

    /// Override for the AWS SSO portal endpoint of the chosen region.
    pub directory_endpoint: Option<Url>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_attempts: 1,
            directory_endpoint: None,
        }
    }
}

/// Builder for [`SelectionFlow`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use entra_sso_flow::SelectionFlowBuilder;
///
/// let flow = SelectionFlowBuilder::new()
///     // give up on any single request after 10s
///     .timeout(Duration::from_secs(10))
///     // retry transient network failures once
///     .max_attempts(2)
///     .build()
///     .expect("valid configuration");
/// ```
#[allow(clippy::module_name_repetitions)]
#[derive(Debug)]
pub struct SelectionFlowBuilder {
    authority: Url,
    transport: TransportConfig,
}

impl SelectionFlowBuilder {
    /// Construct a [`SelectionFlow`] builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the token issuer.
    ///
    /// Tokens are requested from `<authority>/<tenant id>/oauth2/v2.0/token`. Defaults to
    /// `https://login.microsoftonline.com`; national clouds use a different host.
    #[must_use]
    pub fn authority(self, authority: Url) -> Self {
        Self { authority, ..self }
    }

    /// Set the deadline for each remote operation (default 30s).
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.transport.timeout = timeout;
        self
    }

    /// Set the deadline for establishing connections (default 10s).
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.transport.connect_timeout = timeout;
        self
    }

    /// Set the total number of attempts per remote call (default 1, i.e. no retries).
    ///
    /// Token requests are only retried after connection failures and timeouts. Directory queries
    /// follow the AWS SDK standard retry strategy.
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.transport.max_attempts = max_attempts;
        self
    }

    /// Send directory queries to `endpoint` instead of the regional AWS SSO portal.
    #[must_use]
    pub fn directory_endpoint(mut self, endpoint: Url) -> Self {
        self.transport.directory_endpoint = Some(endpoint);
        self
    }

    /// Replace the whole transport configuration.
    #[must_use]
    pub fn transport(self, transport: TransportConfig) -> Self {
        Self { transport, ..self }
    }

    /// Build a [`SelectionFlow`] with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the authority is not an HTTP(S) URL, if `max_attempts` is zero, or if
    /// the HTTP client cannot be initialised.
    pub fn build(self) -> Result<SelectionFlow<TokenExchanger, DirectoryClient>, BuildError> {
        if !matches!(self.authority.scheme(), "http" | "https") || self.authority.cannot_be_a_base()
        {
            return Err(BuildError(format!(
                "token authority must be an http(s) URL, got {}",
                self.authority
            )));
        }
        if self.transport.max_attempts == 0 {
            return Err(BuildError("max_attempts must be at least 1".to_string()));
        }

        let token_exchanger = TokenExchanger::new(self.authority, &self.transport)
            .map_err(|error| BuildError(format!("failed to create HTTP client: {error}")))?;
        let directory = DirectoryClient::new(self.transport);

        Ok(SelectionFlow::new(token_exchanger, directory))
    }
}

impl Default for SelectionFlowBuilder {
    fn default() -> Self {
        Self {
            authority: Url::parse(DEFAULT_AUTHORITY).expect("default authority is a valid URL"),
            transport: TransportConfig::default(),
        }
    }
}

/// An error indicating invalid flow configuration.
#[derive(Debug)]
pub struct BuildError(String);

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid configuration: {}", self.0)
    }
}

impl std::error::Error for BuildError {}
