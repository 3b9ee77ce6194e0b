use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use super::identifiers::Subject;

/// The permissions DataONE grants. Each permission implies the weaker ones.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub enum Permission {
    Read,
    Write,
    ChangePermission,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::ChangePermission => "changePermission",
        }
    }

    /// Returns true if holding `self` grants `other`.
    pub fn implies(&self, other: Permission) -> bool {
        *self >= other
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "read" => Ok(Permission::Read),
            "write" => Ok(Permission::Write),
            "changePermission" => Ok(Permission::ChangePermission),
            other => Err(format!("Unknown permission: {other}")),
        }
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One `<allow>` rule: every listed subject gets every listed permission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessRule {
    #[serde(rename = "subject", default)]
    pub subject: Vec<Subject>,
    #[serde(rename = "permission", default)]
    pub permission: Vec<Permission>,
}

impl AccessRule {
    pub fn new(subject: Subject, permission: Permission) -> Self {
        AccessRule {
            subject: vec![subject],
            permission: vec![permission],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessPolicy {
    #[serde(rename = "allow", default)]
    pub allow: Vec<AccessRule>,
}

impl AccessPolicy {
    /// A policy granting read access to everyone.
    pub fn public_read() -> Self {
        AccessPolicy {
            allow: vec![AccessRule::new(Subject::public(), Permission::Read)],
        }
    }

    pub fn add_rule(&mut self, subject: Subject, permission: Permission) {
        self.allow.push(AccessRule::new(subject, permission));
    }

    /// Checks whether any of `subjects` holds `permission` under this policy.
    ///
    /// Rules naming the `public` subject apply to every caller. Rights
    /// holders are not consulted; they are implicitly allowed everything.
    pub fn allows(&self, subjects: &[Subject], permission: Permission) -> bool {
        self.allow.iter().any(|rule| {
            let subject_matches = rule
                .subject
                .iter()
                .any(|s| s.is_public() || subjects.contains(s));
            let permission_matches = rule.permission.iter().any(|p| p.implies(permission));

            subject_matches && permission_matches
        })
    }
}
