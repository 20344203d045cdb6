use std::fmt;

use chrono::Utc;

use crate::{
    AccessToken, BuildError, Credentials, Directory, DirectoryClient, DirectoryError, Outcome,
    PromptError, Prompter, Selection, SelectionFlowBuilder, TokenError, TokenExchanger,
    TokenSource,
};

const ACCOUNT_PROMPT: &str = "Select AWS Account";
const ROLE_PROMPT: &str = "Select Role";

/// A configured account and role selection flow.
///
/// A flow acquires an Entra ID token, lists the AWS accounts it can reach, asks the user to pick
/// one, lists the roles available in that account and asks the user to pick one of those. It is
/// single-shot: nothing is cached between runs.
///
/// A default flow can be constructed with [`builder`](Self::builder).
#[allow(clippy::module_name_repetitions)]
pub struct SelectionFlow<T = TokenExchanger, D = DirectoryClient> {
    token_source: T,
    directory: D,
}

impl SelectionFlow<TokenExchanger, DirectoryClient> {
    /// Construct a builder for a selection flow.
    ///
    /// Use this to override the default flow configuration.
    #[must_use]
    pub fn builder() -> SelectionFlowBuilder {
        SelectionFlowBuilder::default()
    }
}

#[derive(Clone, Copy, Debug)]
enum Stage {
    CredentialsCollected,
    TokenAcquired,
    AccountsListed,
    AccountSelected,
    RolesListed,
    Done,
}

impl<T, D> SelectionFlow<T, D>
where
    T: TokenSource,
    D: Directory,
{
    /// Construct a flow from its remote collaborators.
    pub fn new(token_source: T, directory: D) -> Self {
        Self {
            token_source,
            directory,
        }
    }

    /// Collect credentials with `prompter` and run the flow.
    ///
    /// # Errors
    ///
    /// See [`run_with`](Self::run_with). Cancelling a credential prompt is also an error.
    pub async fn run<P>(&self, prompter: &mut P) -> Result<Outcome, SelectionError>
    where
        P: Prompter + ?Sized,
    {
        let credentials = Credentials::collect(prompter)?;
        self.run_with(&credentials, prompter).await
    }

    /// Run the flow with already collected `credentials`, using `prompter` for the two
    /// selections.
    ///
    /// Empty account or role listings end the flow successfully without a selection.
    ///
    /// # Errors
    ///
    /// The first failure ends the flow: a token that cannot be acquired, a failed directory query
    /// or a cancelled selection. Nothing is retried.
    pub async fn run_with<P>(
        &self,
        credentials: &Credentials,
        prompter: &mut P,
    ) -> Result<Outcome, SelectionError>
    where
        P: Prompter + ?Sized,
    {
        enter(Stage::CredentialsCollected);
        log::debug!("using {credentials:?}");

        let token = self.token_source.acquire_token(credentials).await?;
        enter(Stage::TokenAcquired);

        ensure_fresh(&token)?;
        let accounts = self
            .directory
            .list_accounts(&credentials.region, &token)
            .await?;
        enter(Stage::AccountsListed);
        if accounts.is_empty() {
            log::info!("no accounts reachable in {}", credentials.region);
            return Ok(Outcome::NoAccounts);
        }

        let account = choose(prompter, ACCOUNT_PROMPT, &accounts)?.clone();
        enter(Stage::AccountSelected);
        log::debug!("selected account {}", account.id);

        ensure_fresh(&token)?;
        let roles = self
            .directory
            .list_account_roles(&credentials.region, &token, &account.id)
            .await?;
        enter(Stage::RolesListed);
        if roles.is_empty() {
            log::info!("no roles reachable in account {}", account.id);
            return Ok(Outcome::NoRoles(account));
        }

        let role = choose(prompter, ROLE_PROMPT, &roles)?.clone();
        enter(Stage::Done);

        Ok(Outcome::Selected(Selection { account, role }))
    }
}

impl<T: fmt::Debug, D: fmt::Debug> fmt::Debug for SelectionFlow<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SelectionFlow")
            .field("token_source", &self.token_source)
            .field("directory", &self.directory)
            .finish()
    }
}

fn enter(stage: Stage) {
    log::debug!("entering stage {stage:?}");
}

fn ensure_fresh(token: &AccessToken) -> Result<(), TokenError> {
    if token.is_expired_at(Utc::now()) {
        log::debug!("access token expired at {:?}", token.expires_at());
        return Err(TokenError::Expired);
    }
    Ok(())
}

// Items are offered in listing order so the chosen index maps straight back.
fn choose<'a, P, I>(prompter: &mut P, label: &str, items: &'a [I]) -> Result<&'a I, PromptError>
where
    P: Prompter + ?Sized,
    I: fmt::Display,
{
    let labels: Vec<String> = items.iter().map(ToString::to_string).collect();
    let index = prompter.prompt_select(label, &labels)?;
    items.get(index).ok_or_else(|| {
        PromptError::Interaction(format!(
            "selection {index} is out of range for {} item(s)",
            items.len()
        ))
    })
}

/// An error that ended the selection flow.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum SelectionError {
    /// The flow configuration was invalid.
    Config(BuildError),

    /// A prompt was cancelled or failed.
    Input(PromptError),

    /// No usable access token could be obtained.
    Token(TokenError),

    /// Listing accounts or roles failed.
    Directory(DirectoryError),
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Config(error) => fmt::Display::fmt(error, f),
            Self::Input(error) => fmt::Display::fmt(error, f),
            Self::Token(error) => fmt::Display::fmt(error, f),
            Self::Directory(error) => fmt::Display::fmt(error, f),
        }
    }
}

impl std::error::Error for SelectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(error) => Some(error),
            Self::Input(error) => Some(error),
            Self::Token(error) => Some(error),
            Self::Directory(error) => Some(error),
        }
    }
}

impl From<BuildError> for SelectionError {
    fn from(error: BuildError) -> Self {
        Self::Config(error)
    }
}

impl From<PromptError> for SelectionError {
    fn from(error: PromptError) -> Self {
        Self::Input(error)
    }
}

impl From<TokenError> for SelectionError {
    fn from(error: TokenError) -> Self {
        Self::Token(error)
    }
}

impl From<DirectoryError> for SelectionError {
    fn from(error: DirectoryError) -> Self {
        Self::Directory(error)
    }
}
