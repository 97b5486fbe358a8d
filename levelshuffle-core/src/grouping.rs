use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::filename::parse_level_filename;
use crate::level::LevelFile;

/// Identity of a shuffle group. Names only ever move between members of the
/// same group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// Every parsed file when no grouping flag is set.
    All,
    /// Files whose names could not be parsed. Never split further.
    Other,
    ByWorld(String),
    /// Window `lo..=hi` around one file's number. Windows are never merged,
    /// so two files only share a group when their windows are identical.
    ByWorldRange { world: String, lo: u64, hi: u64 },
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::All => f.write_str("all"),
            GroupKey::Other => f.write_str("other"),
            GroupKey::ByWorld(world) => f.write_str(world),
            GroupKey::ByWorldRange { world, lo, hi } => write!(f, "{world}_{lo}-{hi}"),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GroupingPolicy {
    AllTogether,
    ByWorld,
    ByNumberRange(u64),
}

impl GroupingPolicy {
    /// Same-world wins over the number range: with both set, the range is
    /// accepted but ignored and files group by world alone. A range of zero
    /// counts as no range.
    pub fn from_flags(same_world_only: bool, number_range: Option<u64>) -> Self {
        let number_range = number_range.filter(|range| *range > 0);
        match (same_world_only, number_range) {
            (true, _) => GroupingPolicy::ByWorld,
            (false, Some(range)) => GroupingPolicy::ByNumberRange(range),
            (false, None) => GroupingPolicy::AllTogether,
        }
    }

    fn key_for(&self, world: &str, number: u64) -> GroupKey {
        match *self {
            GroupingPolicy::AllTogether => GroupKey::All,
            GroupingPolicy::ByWorld => GroupKey::ByWorld(world.to_string()),
            GroupingPolicy::ByNumberRange(range) => GroupKey::ByWorldRange {
                world: world.to_string(),
                lo: number.saturating_sub(range).max(1),
                hi: number.saturating_add(range),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub key: GroupKey,
    pub members: Vec<LevelFile>,
}

/// Key text and size of one group, as written to logs and the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub key: String,
    pub count: usize,
}

/// Groups in the order their first member appeared in the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShuffleGroups {
    groups: Vec<Group>,
}

impl ShuffleGroups {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    pub fn get(&self, key: &GroupKey) -> Option<&Group> {
        self.groups.iter().find(|g| &g.key == key)
    }

    pub fn summaries(&self) -> Vec<GroupSummary> {
        self.groups
            .iter()
            .map(|g| GroupSummary {
                key: g.key.to_string(),
                count: g.members.len(),
            })
            .collect()
    }
}

impl From<Vec<Group>> for ShuffleGroups {
    fn from(groups: Vec<Group>) -> Self {
        Self { groups }
    }
}

impl<'a> IntoIterator for &'a ShuffleGroups {
    type Item = &'a Group;
    type IntoIter = std::slice::Iter<'a, Group>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// Partition `files` into shuffle groups. Every file lands in exactly one
/// group; unparseable names always go to [`GroupKey::Other`].
pub fn create_filename_groups(
    files: &[LevelFile],
    same_world_only: bool,
    number_range: Option<u64>,
) -> ShuffleGroups {
    let policy = GroupingPolicy::from_flags(same_world_only, number_range);

    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();

    for file in files {
        let parsed = parse_level_filename(&file.name);
        let key = match parsed.key() {
            Some((world, number)) => policy.key_for(world, number),
            None => GroupKey::Other,
        };

        match index.get(&key).copied() {
            Some(slot) => groups[slot].members.push(file.clone()),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Group {
                    key,
                    members: vec![file.clone()],
                });
            }
        }
    }

    log::debug!(
        "grouped {} files into {} groups ({:?})",
        files.len(),
        groups.len(),
        policy
    );

    ShuffleGroups { groups }
}
