use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::grouping::{GroupKey, ShuffleGroups};
use crate::level::LevelFile;
use crate::rng::{random_source, RandomSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamedLevel {
    pub file: LevelFile,
    pub group: GroupKey,
    pub new_name: String,
}

impl RenamedLevel {
    pub fn is_changed(&self) -> bool {
        self.file.name != self.new_name
    }
}

/// Old file to new name, covering every grouped file. Entries keep group
/// order, then member order within each group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShuffleMapping {
    entries: Vec<RenamedLevel>,
    by_path: HashMap<PathBuf, usize>,
}

impl ShuffleMapping {
    fn push(&mut self, file: &LevelFile, group: &GroupKey, new_name: String) {
        self.by_path.insert(file.path.clone(), self.entries.len());
        self.entries.push(RenamedLevel {
            file: file.clone(),
            group: group.clone(),
            new_name,
        });
    }

    pub fn new_name(&self, file: &LevelFile) -> Option<&str> {
        self.new_name_for_path(&file.path)
    }

    pub fn new_name_for_path(&self, path: &Path) -> Option<&str> {
        self.by_path
            .get(path)
            .map(|&i| self.entries[i].new_name.as_str())
    }

    pub fn entries(&self) -> &[RenamedLevel] {
        &self.entries
    }

    pub fn changed(&self) -> impl Iterator<Item = &RenamedLevel> {
        self.entries.iter().filter(|e| e.is_changed())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Permute names inside each group, drawing from one `rng` across all groups
/// in group order. Groups of zero or one member keep their names and consume
/// no randomness.
pub fn shuffle_within_groups(groups: &ShuffleGroups, rng: &mut dyn RandomSource) -> ShuffleMapping {
    let mut mapping = ShuffleMapping::default();

    for group in groups {
        if group.members.len() <= 1 {
            for file in &group.members {
                mapping.push(file, &group.key, file.name.clone());
            }
            continue;
        }

        let mut names: Vec<String> = group.members.iter().map(|f| f.name.clone()).collect();
        rng.shuffle(&mut names);

        for (file, new_name) in group.members.iter().zip(names) {
            mapping.push(file, &group.key, new_name);
        }
    }

    mapping
}

/// [`shuffle_within_groups`] with a source chosen from the seed phrase:
/// reproducible when given, fresh entropy otherwise.
pub fn shuffle_with_seed(groups: &ShuffleGroups, seed: Option<&str>) -> ShuffleMapping {
    let mut rng = random_source(seed);
    shuffle_within_groups(groups, rng.as_mut())
}
