use std::{fmt, io};

use dialoguer::{Input, Password, Select};

/// The interactive capabilities the selection flow needs.
///
/// The flow never talks to a terminal directly. [`TerminalPrompter`] drives a real terminal; tests
/// and non-interactive callers can supply scripted answers instead.
pub trait Prompter {
    /// Ask for a line of free text.
    ///
    /// When `masked` is set the input must not be echoed. Implementations should only return once
    /// a non-empty value has been entered.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Cancelled`] if the user aborted the prompt.
    fn prompt_text(&mut self, label: &str, masked: bool) -> Result<String, PromptError>;

    /// Ask the user to pick one of `items`, returning the index of the chosen item.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Cancelled`] if the user aborted the selection.
    fn prompt_select(&mut self, label: &str, items: &[String]) -> Result<usize, PromptError>;
}

/// A [`Prompter`] backed by the process terminal.
#[derive(Debug, Default)]
#[allow(clippy::module_name_repetitions)]
pub struct TerminalPrompter {
    _priv: (),
}

impl TerminalPrompter {
    /// Construct a terminal prompter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompter for TerminalPrompter {
    fn prompt_text(&mut self, label: &str, masked: bool) -> Result<String, PromptError> {
        let value = if masked {
            Password::new().with_prompt(label).interact()
        } else {
            Input::<String>::new().with_prompt(label).interact_text()
        };
        value.map_err(PromptError::from)
    }

    fn prompt_select(&mut self, label: &str, items: &[String]) -> Result<usize, PromptError> {
        Select::new()
            .with_prompt(label)
            .items(items)
            .default(0)
            .interact_opt()
            .map_err(PromptError::from)?
            .ok_or(PromptError::Cancelled)
    }
}

/// An error raised by a [`Prompter`].
#[derive(Debug)]
pub enum PromptError {
    /// The user interrupted or dismissed the prompt.
    Cancelled,

    /// The prompt could not be shown or its answer could not be used.
    Interaction(String),
}

impl From<io::Error> for PromptError {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::Interrupted | io::ErrorKind::UnexpectedEof => Self::Cancelled,
            _ => Self::Interaction(error.to_string()),
        }
    }
}

impl From<dialoguer::Error> for PromptError {
    fn from(error: dialoguer::Error) -> Self {
        match error {
            dialoguer::Error::IO(error) => Self::from(error),
        }
    }
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "input cancelled"),
            Self::Interaction(error) => write!(f, "input failed: {error}"),
        }
    }
}

impl std::error::Error for PromptError {}

#[cfg(test)]
mod tests {
    use std::io;

    use super::PromptError;

    #[test]
    fn interrupted_io_is_a_cancellation() {
        let error = PromptError::from(io::Error::from(io::ErrorKind::Interrupted));
        assert!(matches!(error, PromptError::Cancelled));
    }

    #[test]
    fn interrupted_terminal_is_a_cancellation() {
        let error = PromptError::from(dialoguer::Error::IO(io::ErrorKind::Interrupted.into()));
        assert!(matches!(error, PromptError::Cancelled));
    }

    #[test]
    fn other_io_failures_keep_their_cause() {
        let error = PromptError::from(io::Error::new(io::ErrorKind::Other, "not a tty"));
        assert_eq!(error.to_string(), "input failed: not a tty");
    }
}
