use std::{borrow::Cow, fmt};

use aws_sdk_sso::config::Region as SdkRegion;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};

use crate::{PromptError, Prompter};

const CLIENT_ID_LABEL: &str = "Azure Client ID";
const CLIENT_SECRET_LABEL: &str = "Azure Client Secret";
const TENANT_ID_LABEL: &str = "Azure Tenant ID";
const SCOPE_LABEL: &str = "Azure Scope (e.g. api://AWS_SSO_APP_ID/.default)";
const REGION_LABEL: &str = "AWS SSO Region";

// Tokens this close to expiry are treated as already expired.
const EXPIRY_BUFFER_SECS: i64 = 30;

/// Entra ID client credentials and the AWS SSO region to resolve accounts in.
///
/// Values are not validated beyond being present; the issuer and directory reject bad values. The
/// client secret is not printed in `Debug` output.
pub struct Credentials {
    /// The Entra ID application (client) id.
    pub client_id: String,

    /// The Entra ID client secret.
    pub client_secret: SecretString,

    /// The Entra ID tenant id.
    pub tenant_id: String,

    /// The scope to request, typically `api://<app id>/.default`.
    pub scope: String,

    /// The region of the AWS SSO portal API.
    pub region: Region,
}

impl Credentials {
    /// Collect credentials interactively, asking for the secret with a masked prompt.
    ///
    /// # Errors
    ///
    /// Returns the first [`PromptError`] raised by `prompter`.
    pub fn collect<P: Prompter + ?Sized>(prompter: &mut P) -> Result<Self, PromptError> {
        let client_id = prompter.prompt_text(CLIENT_ID_LABEL, false)?;
        let client_secret = prompter.prompt_text(CLIENT_SECRET_LABEL, true)?;
        let tenant_id = prompter.prompt_text(TENANT_ID_LABEL, false)?;
        let scope = prompter.prompt_text(SCOPE_LABEL, false)?;
        let region = prompter.prompt_text(REGION_LABEL, false)?;

        Ok(Self {
            client_id,
            client_secret: SecretString::from(client_secret),
            tenant_id,
            scope,
            region: Region::new(region),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("tenant_id", &self.tenant_id)
            .field("scope", &self.scope)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

/// The AWS region hosting the SSO portal API that accounts and roles are listed from.
///
/// Wraps the SDK's region type so it stays out of the public API.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct Region(pub(crate) SdkRegion);

impl Region {
    /// Construct a new `Region` for the given string.
    ///
    /// The value is not validated. An unknown region surfaces as a directory query error.
    pub fn new(region: impl Into<Cow<'static, str>>) -> Self {
        Self(SdkRegion::new(region))
    }

    /// The regional SSO portal endpoint directory queries go to by default.
    #[must_use]
    pub fn portal_endpoint(&self) -> String {
        format!("https://portal.sso.{}.amazonaws.com", self.as_ref())
    }
}

impl AsRef<str> for Region {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Region").field(&self.as_ref()).finish()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// A bearer token issued by Entra ID.
///
/// Only the token value and its lifetime are kept. The value is not printed in `Debug` output.
pub struct AccessToken {
    value: SecretString,
    issued_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub(crate) fn new(
        value: String,
        issued_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            value: SecretString::from(value),
            issued_at,
            expires_at,
        }
    }

    /// The bearer value.
    #[must_use]
    pub fn secret(&self) -> &str {
        self.value.expose_secret()
    }

    /// When the token was received.
    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// When the token expires, if the issuer said.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the token is expired, or about to be, at `now`.
    ///
    /// Tokens without a known expiry never count as expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at - Duration::seconds(EXPIRY_BUFFER_SECS) <= now)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use secrecy::ExposeSecret;

    use super::{AccessToken, Credentials, Region};
    use crate::{PromptError, Prompter};

    struct Answers {
        answers: Vec<&'static str>,
        masked: Vec<String>,
    }

    impl Prompter for Answers {
        fn prompt_text(&mut self, label: &str, masked: bool) -> Result<String, PromptError> {
            if masked {
                self.masked.push(label.to_string());
            }
            if self.answers.is_empty() {
                return Err(PromptError::Cancelled);
            }
            Ok(self.answers.remove(0).to_string())
        }

        fn prompt_select(&mut self, _: &str, _: &[String]) -> Result<usize, PromptError> {
            unreachable!("credentials never ask for a selection")
        }
    }

    #[test]
    fn collects_five_answers_in_order() {
        let mut prompter = Answers {
            answers: vec!["c1", "s1", "t1", "api://app/.default", "us-east-1"],
            masked: Vec::new(),
        };

        let credentials = Credentials::collect(&mut prompter).unwrap();

        assert_eq!(credentials.client_id, "c1");
        assert_eq!(credentials.client_secret.expose_secret(), "s1");
        assert_eq!(credentials.tenant_id, "t1");
        assert_eq!(credentials.scope, "api://app/.default");
        assert_eq!(credentials.region.as_ref(), "us-east-1");
        assert_eq!(prompter.masked, vec!["Azure Client Secret".to_string()]);
    }

    #[test]
    fn cancelling_any_prompt_aborts_collection() {
        let mut prompter = Answers {
            answers: vec!["c1", "s1"],
            masked: Vec::new(),
        };

        let error = Credentials::collect(&mut prompter).unwrap_err();

        assert!(matches!(error, PromptError::Cancelled));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let mut prompter = Answers {
            answers: vec!["c1", "hunter2", "t1", "scope", "eu-west-1"],
            masked: Vec::new(),
        };
        let credentials = Credentials::collect(&mut prompter).unwrap();
        let token = AccessToken::new("tok-abc".to_string(), Utc::now(), None);

        assert!(!format!("{credentials:?}").contains("hunter2"));
        assert!(!format!("{token:?}").contains("tok-abc"));
    }

    #[test]
    fn region_names_its_portal() {
        let region = Region::new("eu-west-1");

        assert_eq!(region.to_string(), "eu-west-1");
        assert_eq!(
            region.portal_endpoint(),
            "https://portal.sso.eu-west-1.amazonaws.com"
        );
    }

    #[test]
    fn expiry_includes_a_buffer() {
        let now = Utc::now();
        let fresh = AccessToken::new("t".to_string(), now, Some(now + Duration::hours(1)));
        let stale = AccessToken::new("t".to_string(), now, Some(now + Duration::seconds(5)));
        let unknown = AccessToken::new("t".to_string(), now, None);

        assert!(!fresh.is_expired_at(now));
        assert!(stale.is_expired_at(now));
        assert!(!unknown.is_expired_at(now + Duration::days(365)));
    }
}
