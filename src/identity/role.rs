use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The four capability tiers of the dashboard, ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    SecurityAdmin,
    NetworkOperator,
    SecurityAnalyst,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl Role {
    /// Every role, most privileged first.
    pub const ALL: [Role; 4] = [Role::SuperAdmin, Role::SecurityAdmin, Role::NetworkOperator, Role::SecurityAnalyst];

    /// Privilege rank; higher outranks lower.
    pub const fn rank(self) -> u8 {
        match self {
            Role::SuperAdmin => 4,
            Role::SecurityAdmin => 3,
            Role::NetworkOperator => 2,
            Role::SecurityAnalyst => 1,
        }
    }

    /// Human-readable label used in the top bar and the access-denied view.
    pub const fn label(self) -> &'static str {
        match self {
            Role::SuperAdmin => "Super Admin",
            Role::SecurityAdmin => "Security Admin",
            Role::NetworkOperator => "Network Operator",
            Role::SecurityAnalyst => "Security Analyst",
        }
    }

    /// Wire tag, identical to the serde representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::SecurityAdmin => "security_admin",
            Role::NetworkOperator => "network_operator",
            Role::SecurityAnalyst => "security_analyst",
        }
    }

    pub fn outranks(self, other: Role) -> bool { self.rank() > other.rank() }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering { self.rank().cmp(&other.rank()) }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}
