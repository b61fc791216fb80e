//! Version skew detection between the two occupants of a channel.
//!
//! Versions are compared as dotted segments: numeric where both segments
//! parse as integers, lexicographic otherwise. `"1.10.0"` is therefore
//! newer than `"1.9.0"`, which a plain string comparison gets wrong.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Role;

/// Compares two version strings segment by segment.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.trim().trim_start_matches('v').split('.');
    let mut right = b.trim().trim_start_matches('v').split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(l), Some(r)) => {
                let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(l), Ok(r)) => l.cmp(&r),
                    _ => l.cmp(r),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Details of a version mismatch, attached to `VERSION_MISMATCH` notices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VersionSkew {
    /// Version reported by the client.
    pub client: String,
    /// Version reported by the executor.
    pub executor: String,
    /// The newer of the two; the side to align to.
    pub expected: String,
    /// The side that should upgrade.
    pub outdated: Role,
}

impl VersionSkew {
    /// Returns a skew record when both versions are known and differ.
    #[must_use]
    pub fn detect(client: Option<&str>, executor: Option<&str>) -> Option<Self> {
        let (client, executor) = (client?, executor?);
        if client == executor {
            return None;
        }
        let (expected, outdated) = match compare_versions(client, executor) {
            Ordering::Less => (executor, Role::Client),
            // Same precedence, different spelling ("1.2" vs "1.2.0"): the
            // client's spelling is the one to align to.
            Ordering::Greater | Ordering::Equal => (client, Role::Executor),
        };
        Some(Self {
            client: client.to_string(),
            executor: executor.to_string(),
            expected: expected.to_string(),
            outdated,
        })
    }

    /// Version reported by `role`.
    #[must_use]
    pub fn version_of(&self, role: Role) -> &str {
        match role {
            Role::Client => &self.client,
            Role::Executor => &self.executor,
        }
    }

    /// Advisory text addressed to the occupant holding `recipient`.
    #[must_use]
    pub fn advisory_for(&self, recipient: Role) -> String {
        let own = self.version_of(recipient);
        let peer = recipient.opposite();
        let peer_version = self.version_of(peer);
        if recipient == self.outdated {
            format!(
                "Version mismatch: this {recipient} runs {own} but the {peer} runs {peer_version}. \
                 Upgrade this {recipient} to {}.",
                self.expected
            )
        } else {
            format!(
                "Version mismatch: the {peer} runs {peer_version} but this {recipient} runs {own}. \
                 The {peer} should upgrade to {}.",
                self.expected
            )
        }
    }
}
