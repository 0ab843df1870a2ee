//! Membership diff between two versions of an id list.

use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    /// In `new`, not in `old`.
    pub added: Vec<String>,
    /// In `old`, not in `new`.
    pub removed: Vec<String>,
}

impl MembershipDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Apply the diff to `old`, yielding the members of the new version.
    pub fn apply(&self, old: &[String]) -> HashSet<String> {
        let mut members: HashSet<String> = old.iter().cloned().collect();
        for id in &self.removed {
            members.remove(id);
        }
        members.extend(self.added.iter().cloned());
        members
    }
}

/// Compare two id lists by identity. Output keeps input order and drops
/// duplicates.
pub fn diff_ids(old: &[String], new: &[String]) -> MembershipDiff {
    let old_set: HashSet<&str> = old.iter().map(String::as_str).collect();
    let new_set: HashSet<&str> = new.iter().map(String::as_str).collect();

    MembershipDiff {
        added: ordered_difference(new, &old_set),
        removed: ordered_difference(old, &new_set),
    }
}

fn ordered_difference(ids: &[String], exclude: &HashSet<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| !exclude.contains(id.as_str()) && seen.insert(id.as_str()))
        .cloned()
        .collect()
}
