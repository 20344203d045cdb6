#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs, clippy::pedantic)]

//! Pick an AWS SSO account and role using an Entra ID client-credentials token.
//!
//! See [`select_role`] for the main entrypoint to the crate.
//!
//! ```no_run
//! # #[tokio::main(flavor = "current_thread")] async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use entra_sso_flow::{Outcome, TerminalPrompter};
//!
//! let outcome = entra_sso_flow::select_role(&mut TerminalPrompter::new()).await?;
//! if let Outcome::Selected(selection) = outcome {
//!     println!("{} / {}", selection.account.id, selection.role.name);
//! }
//! # Ok(()) }
//! ```

mod builder;
mod credentials;
mod flow;
mod oauth;
mod prompt;
mod selection;
mod sso;
#[cfg(test)]
mod testing;

pub use crate::{
    builder::{BuildError, SelectionFlowBuilder, TransportConfig},
    credentials::{AccessToken, Credentials, Region},
    flow::{SelectionError, SelectionFlow},
    oauth::{TokenError, TokenExchanger, TokenSource},
    prompt::{PromptError, Prompter, TerminalPrompter},
    selection::{Account, Outcome, Role, Selection},
    sso::{Directory, DirectoryClient, DirectoryError, Operation},
};

const _: () = assert!(
    const_str::equal!(env!("CARGO_PKG_VERSION_MAJOR"), "0"),
    "client naming scheme needs updated for 1.0"
);
const CLIENT_NAME: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "@",
    "0.",
    env!("CARGO_PKG_VERSION_MINOR")
);

/// Run the default selection flow, collecting credentials and choices with `prompter`.
///
/// The user is asked for an Entra ID client id, client secret, tenant id and scope, and the AWS
/// SSO region. The credentials are exchanged for a token, which is used to list the AWS accounts
/// and then the roles of the chosen account. Nothing is cached: every call starts from scratch.
///
/// For control over the issuer, deadlines and retries see [`SelectionFlowBuilder`].
///
/// # Errors
///
/// An error is returned if the default configuration cannot be built, if a prompt is cancelled,
/// if no token can be obtained or if a directory query fails. Empty listings are reported through
/// [`Outcome`] instead.
pub async fn select_role<P>(prompter: &mut P) -> Result<Outcome, SelectionError>
where
    P: Prompter + ?Sized,
{
    let flow = SelectionFlowBuilder::default().build()?;
    flow.run(prompter).await
}
