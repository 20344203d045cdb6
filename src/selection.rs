use std::fmt;

/// An AWS account reachable with the SSO access token.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Account {
    /// The 12-digit account id.
    pub id: String,

    /// The account name shown in the SSO portal.
    pub display_name: String,
}

/// Formats as `<display name> (<id>)`, the label offered when selecting an account.
impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.id)
    }
}

/// A permission set role assumable in the account it was listed for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Role {
    /// The role name as configured in SSO.
    pub name: String,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The account and role chosen in one run of the flow.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Selection {
    /// The chosen account.
    pub account: Account,

    /// The chosen role, as listed for [`account`](Self::account).
    pub role: Role,
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Selected Account: {}", self.account.id)?;
        write!(f, "Selected Role: {}", self.role.name)
    }
}

/// How a successful run of the flow ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// An account and role were chosen.
    Selected(Selection),

    /// The token does not grant access to any account.
    NoAccounts,

    /// The chosen account has no roles available to the token.
    NoRoles(Account),
}

impl Outcome {
    /// The selection, if one was made.
    #[must_use]
    pub fn selection(&self) -> Option<&Selection> {
        match self {
            Self::Selected(selection) => Some(selection),
            Self::NoAccounts | Self::NoRoles(_) => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Selected(selection) => fmt::Display::fmt(selection, f),
            Self::NoAccounts => write!(f, "No accounts found."),
            Self::NoRoles(_) => write!(f, "No roles found for this account."),
        }
    }
}
