use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::Item;
use super::visibility::ViewerRole;

/// Caller identity supplied by the session layer. Anonymous callers carry no identity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Actor {
    pub identity: Option<String>,
}

impl Actor {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn identified(identity: impl Into<String>) -> Self {
        let identity = identity.into().trim().to_string();
        Self {
            identity: (!identity.is_empty()).then_some(identity),
        }
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }
}

/// Authorization seam queried by the engine before any staff-only operation.
pub trait StaffPolicy: Send + Sync {
    fn is_staff(&self, identity: &str) -> bool;
}

/// Staff membership from a fixed, case-insensitive list of e-mail identities.
#[derive(Debug, Clone, Default)]
pub struct AllowListPolicy {
    members: BTreeSet<String>,
}

impl AllowListPolicy {
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            members: members
                .into_iter()
                .map(|member| member.as_ref().trim().to_ascii_lowercase())
                .filter(|member| !member.is_empty())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl StaffPolicy for AllowListPolicy {
    fn is_staff(&self, identity: &str) -> bool {
        self.members.contains(&identity.trim().to_ascii_lowercase())
    }
}

pub fn actor_is_staff(policy: &dyn StaffPolicy, actor: &Actor) -> bool {
    actor.identity().is_some_and(|identity| policy.is_staff(identity))
}

/// Staff first, then the owning party by e-mail, otherwise anonymous.
pub fn viewer_role(policy: &dyn StaffPolicy, actor: &Actor, item: &Item) -> ViewerRole {
    match actor.identity() {
        Some(identity) if policy.is_staff(identity) => ViewerRole::Staff,
        Some(identity) if identity.eq_ignore_ascii_case(item.owner.email.trim()) => {
            ViewerRole::Owner
        }
        _ => ViewerRole::Anonymous,
    }
}
