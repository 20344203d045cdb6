//! Cleaned up AWS SSO portal API.

use std::fmt;

use async_trait::async_trait;
use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion, SdkConfig};
use aws_sdk_sso::{
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    types::{AccountInfo, RoleInfo},
};

use crate::{AccessToken, Account, Region, Role, TransportConfig};

/// A directory of the accounts and roles an access token can reach.
#[async_trait]
pub trait Directory {
    /// List the accounts reachable with `token`, in the order the directory returns them.
    ///
    /// # Errors
    ///
    /// Returns a [`DirectoryError`] if the listing fails. An empty list is not an error.
    async fn list_accounts(
        &self,
        region: &Region,
        token: &AccessToken,
    ) -> Result<Vec<Account>, DirectoryError>;

    /// List the roles reachable with `token` in `account_id`, in the order the directory returns
    /// them.
    ///
    /// # Errors
    ///
    /// Returns a [`DirectoryError`] if the listing fails. An empty list is not an error.
    async fn list_account_roles(
        &self,
        region: &Region,
        token: &AccessToken,
        account_id: &str,
    ) -> Result<Vec<Role>, DirectoryError>;
}

/// A [`Directory`] backed by the AWS SSO portal API.
///
/// Requests are authorized by the bearer token alone; no AWS credentials are loaded.
pub struct DirectoryClient {
    transport: TransportConfig,
}

impl DirectoryClient {
    /// Construct a client that applies the given deadlines and retry policy to every query.
    #[must_use]
    pub fn new(transport: TransportConfig) -> Self {
        Self { transport }
    }

    fn client(&self, region: &Region) -> aws_sdk_sso::Client {
        let retry_config = if self.transport.max_attempts > 1 {
            RetryConfig::standard().with_max_attempts(self.transport.max_attempts)
        } else {
            RetryConfig::disabled()
        };
        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(self.transport.timeout)
            .connect_timeout(self.transport.connect_timeout)
            .build();

        let mut sdk_config = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(region.0.clone())
            .retry_config(retry_config)
            .timeout_config(timeout_config);
        if let Some(endpoint) = &self.transport.directory_endpoint {
            sdk_config = sdk_config.endpoint_url(endpoint.as_str());
            log::debug!("using directory endpoint {endpoint}");
        } else {
            log::debug!("using directory endpoint {}", region.portal_endpoint());
        }

        aws_sdk_sso::Client::new(&sdk_config.build())
    }
}

#[async_trait]
impl Directory for DirectoryClient {
    async fn list_accounts(
        &self,
        region: &Region,
        token: &AccessToken,
    ) -> Result<Vec<Account>, DirectoryError> {
        let client = self.client(region);
        let mut accounts = Vec::new();
        let mut next_token = None;

        loop {
            log::debug!("listing accounts in {region}");
            let page = client
                .list_accounts()
                .access_token(token.secret())
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|error| DirectoryError::from_sdk(Operation::ListAccounts, &error))?;

            for info in page.account_list.unwrap_or_default() {
                accounts.push(
                    Account::try_from(info)
                        .map_err(|error| DirectoryError::malformed(Operation::ListAccounts, error))?,
                );
            }

            match page.next_token {
                Some(next) if !next.is_empty() => next_token = Some(next),
                _ => break,
            }
        }

        log::info!("found {} account(s)", accounts.len());
        Ok(accounts)
    }

    async fn list_account_roles(
        &self,
        region: &Region,
        token: &AccessToken,
        account_id: &str,
    ) -> Result<Vec<Role>, DirectoryError> {
        let client = self.client(region);
        let mut roles = Vec::new();
        let mut next_token = None;

        loop {
            log::debug!("listing roles for account {account_id} in {region}");
            let page = client
                .list_account_roles()
                .access_token(token.secret())
                .account_id(account_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|error| DirectoryError::from_sdk(Operation::ListAccountRoles, &error))?;

            for info in page.role_list.unwrap_or_default() {
                roles.push(Role::try_from(info).map_err(|error| {
                    DirectoryError::malformed(Operation::ListAccountRoles, error)
                })?);
            }

            match page.next_token {
                Some(next) if !next.is_empty() => next_token = Some(next),
                _ => break,
            }
        }

        log::info!("found {} role(s) for account {account_id}", roles.len());
        Ok(roles)
    }
}

impl fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("transport", &self.transport)
            .finish()
    }
}

impl TryFrom<AccountInfo> for Account {
    type Error = &'static str;

    fn try_from(info: AccountInfo) -> Result<Self, Self::Error> {
        macro_rules! invalid_res {
            ($msg:literal) => {
                concat!("invalid ListAccounts response: ", $msg)
            };
        }

        Ok(Self {
            id: info.account_id.ok_or(invalid_res!("missing accountId"))?,
            display_name: info
                .account_name
                .ok_or(invalid_res!("missing accountName"))?,
        })
    }
}

impl TryFrom<RoleInfo> for Role {
    type Error = &'static str;

    fn try_from(info: RoleInfo) -> Result<Self, Self::Error> {
        Ok(Self {
            name: info
                .role_name
                .ok_or("invalid ListAccountRoles response: missing roleName")?,
        })
    }
}

/// A directory operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    /// `ListAccounts`
    ListAccounts,

    /// `ListAccountRoles`
    ListAccountRoles,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ListAccounts => f.write_str("ListAccounts"),
            Self::ListAccountRoles => f.write_str("ListAccountRoles"),
        }
    }
}

/// An error that occurred while querying the directory.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum DirectoryError {
    /// The directory did not accept the access token.
    Unauthorized {
        /// The failed operation.
        operation: Operation,
        /// The directory's explanation.
        message: String,
    },

    /// The request failed, due to a network issue, throttling or a service error.
    Request {
        /// The failed operation.
        operation: Operation,
        /// A description of the failure.
        message: String,
    },

    /// The directory responded with data that could not be understood.
    Malformed {
        /// The failed operation.
        operation: Operation,
        /// What was wrong with the response.
        message: String,
    },
}

impl DirectoryError {
    fn from_sdk<E, R>(operation: Operation, error: &SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: fmt::Debug,
    {
        let message = DisplayErrorContext(error).to_string();
        log::debug!("{operation} failed: {message}");

        match error.as_service_error().and_then(ProvideErrorMetadata::code) {
            Some("UnauthorizedException") => Self::Unauthorized { operation, message },
            _ => Self::Request { operation, message },
        }
    }

    fn malformed(operation: Operation, message: &str) -> Self {
        Self::Malformed {
            operation,
            message: message.to_string(),
        }
    }

    /// The operation that failed.
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::Unauthorized { operation, .. }
            | Self::Request { operation, .. }
            | Self::Malformed { operation, .. } => *operation,
        }
    }
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unauthorized { operation, message } => {
                write!(f, "{operation} error: access token rejected: {message}")
            }
            Self::Request { operation, message } | Self::Malformed { operation, message } => {
                write!(f, "{operation} error: {message}")
            }
        }
    }
}

impl std::error::Error for DirectoryError {}
