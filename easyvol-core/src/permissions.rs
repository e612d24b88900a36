//! Module/action permission model
//!
//! Permissions are explicit `(module, action)` grants. A user's effective
//! set is the union of their role's grants and user-specific grants; there
//! is no implicit admin bypass.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Functional areas a permission can apply to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Members,
    JuniorMembers,
    Vehicles,
    Radios,
    Warehouse,
    Meetings,
    Training,
    Events,
    Scheduler,
    Documents,
    Fees,
    Settings,
    Users,
}

impl Module {
    /// Every module, in catalog order.
    pub const ALL: [Module; 13] = [
        Self::Members,
        Self::JuniorMembers,
        Self::Vehicles,
        Self::Radios,
        Self::Warehouse,
        Self::Meetings,
        Self::Training,
        Self::Events,
        Self::Scheduler,
        Self::Documents,
        Self::Fees,
        Self::Settings,
        Self::Users,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Members => "members",
            Self::JuniorMembers => "junior_members",
            Self::Vehicles => "vehicles",
            Self::Radios => "radios",
            Self::Warehouse => "warehouse",
            Self::Meetings => "meetings",
            Self::Training => "training",
            Self::Events => "events",
            Self::Scheduler => "scheduler",
            Self::Documents => "documents",
            Self::Fees => "fees",
            Self::Settings => "settings",
            Self::Users => "users",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "members" => Ok(Self::Members),
            "junior_members" => Ok(Self::JuniorMembers),
            "vehicles" => Ok(Self::Vehicles),
            "radios" => Ok(Self::Radios),
            "warehouse" => Ok(Self::Warehouse),
            "meetings" => Ok(Self::Meetings),
            "training" => Ok(Self::Training),
            "events" => Ok(Self::Events),
            "scheduler" => Ok(Self::Scheduler),
            "documents" => Ok(Self::Documents),
            "fees" => Ok(Self::Fees),
            "settings" => Ok(Self::Settings),
            "users" => Ok(Self::Users),
            other => Err(UnknownPermission(other.to_owned())),
        }
    }
}

/// What a grant allows within a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    Export,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Self::View,
        Self::Create,
        Self::Edit,
        Self::Delete,
        Self::Export,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Export => "export",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(Self::View),
            "create" => Ok(Self::Create),
            "edit" => Ok(Self::Edit),
            "delete" => Ok(Self::Delete),
            "export" => Ok(Self::Export),
            other => Err(UnknownPermission(other.to_owned())),
        }
    }
}

/// A stored permission name was not recognized
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown permission component: '{0}'")]
pub struct UnknownPermission(pub String);

/// Effective set of grants for one user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    grants: HashSet<(Module, Action)>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, module: Module, action: Action) {
        self.grants.insert((module, action));
    }

    pub fn allows(&self, module: Module, action: Action) -> bool {
        self.grants.contains(&(module, action))
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Parse stored `(module, action)` string pairs, skipping (and logging)
    /// entries that no longer map to a known module or action.
    pub fn from_rows<I, A, B>(rows: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: AsRef<str>,
        B: AsRef<str>,
    {
        let mut set = Self::new();
        for (module, action) in rows {
            match (module.as_ref().parse(), action.as_ref().parse()) {
                (Ok(m), Ok(a)) => set.grant(m, a),
                _ => {
                    tracing::warn!(
                        module = module.as_ref(),
                        action = action.as_ref(),
                        "skipping unrecognized permission row"
                    );
                }
            }
        }
        set
    }
}

impl FromIterator<(Module, Action)> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = (Module, Action)>>(iter: I) -> Self {
        Self {
            grants: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_wire_names() {
        for module in [
            Module::Members,
            Module::JuniorMembers,
            Module::Warehouse,
            Module::Scheduler,
        ] {
            assert_eq!(module.as_str().parse::<Module>().unwrap(), module);
        }
        for action in [Action::View, Action::Export] {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn empty_set_denies_everything() {
        let set = PermissionSet::new();
        assert!(!set.allows(Module::Members, Action::View));
    }

    #[test]
    fn grant_is_specific() {
        let mut set = PermissionSet::new();
        set.grant(Module::Members, Action::View);
        assert!(set.allows(Module::Members, Action::View));
        assert!(!set.allows(Module::Members, Action::Edit));
        assert!(!set.allows(Module::Vehicles, Action::View));
    }

    #[test]
    fn from_rows_skips_unknown() {
        let set = PermissionSet::from_rows([
            ("members", "view"),
            ("newsletter", "view"), // dropped module
            ("members", "approve"), // unknown action
        ]);
        assert_eq!(set.len(), 1);
        assert!(set.allows(Module::Members, Action::View));
    }

    #[test]
    fn union_deduplicates() {
        let set: PermissionSet = [
            (Module::Members, Action::View),
            (Module::Members, Action::View),
            (Module::Fees, Action::Export),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
    }
}
