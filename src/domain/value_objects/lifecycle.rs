use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// レコードの公開状態。draft < private < posted の順にしか進まない
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Draft,
    Private,
    Posted,
}

/// Physical location of a document in the remote store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RemoteLocation {
    /// Owner-scoped collection, readable only by the owner.
    Private,
    /// Shared collection served to every reader.
    Public,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Draft => "draft",
            LifecycleState::Private => "private",
            LifecycleState::Posted => "posted",
        }
    }

    /// Where the remote copy of a record in this state lives; drafts never leave the device.
    pub fn remote_location(&self) -> Option<RemoteLocation> {
        match self {
            LifecycleState::Draft => None,
            LifecycleState::Private => Some(RemoteLocation::Private),
            LifecycleState::Posted => Some(RemoteLocation::Public),
        }
    }

    pub fn requires_remote(&self) -> bool {
        self.remote_location().is_some()
    }

    pub fn can_transition_to(&self, target: LifecycleState) -> bool {
        *self <= target
    }
}

impl RemoteLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteLocation::Private => "private",
            RemoteLocation::Public => "public",
        }
    }

    /// State implied by a document's location when the wire format does not carry it.
    pub fn implied_state(&self) -> LifecycleState {
        match self {
            RemoteLocation::Private => LifecycleState::Private,
            RemoteLocation::Public => LifecycleState::Posted,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RemoteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(LifecycleState::Draft),
            "private" => Ok(LifecycleState::Private),
            "posted" => Ok(LifecycleState::Posted),
            other => Err(format!("Unknown lifecycle state: {other}")),
        }
    }
}
