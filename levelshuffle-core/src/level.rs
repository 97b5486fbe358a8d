use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::filename::LEVEL_EXTENSION;
use crate::Result;

/// A level file handed to the shuffler. Only `name` takes part in grouping
/// and shuffling; `path` is where the archive builder reads the bytes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LevelFile {
    pub name: String,
    pub path: PathBuf,
}

impl LevelFile {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        Some(Self::new(name, path))
    }
}

/// Level files sitting directly inside `dir`, sorted by name.
///
/// A missing directory is created so that the next listing has somewhere to
/// look; it yields no files.
pub fn list_level_files(dir: &Path) -> Result<Vec<LevelFile>> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(file) = LevelFile::from_path(entry.path()) else {
            continue;
        };
        if file.name.ends_with(LEVEL_EXTENSION) {
            files.push(file);
        }
    }

    log::debug!("found {} level files in {}", files.len(), dir.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_level_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["pirate1.rton", "beach2.rton", "notes.txt", "beach1.RTON", "beach1.rton"] {
            fs::write(dir.path().join(name), b"RTON").unwrap();
        }
        fs::create_dir(dir.path().join("nested.rton")).unwrap();
        fs::write(dir.path().join("nested.rton").join("deep1.rton"), b"RTON").unwrap();

        let names: Vec<_> = list_level_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["beach1.rton", "beach2.rton", "pirate1.rton"]);
    }

    #[test]
    fn missing_directory_is_created_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let levels = dir.path().join("levelstoshuffle");

        let files = list_level_files(&levels).unwrap();
        assert!(files.is_empty());
        assert!(levels.is_dir());
    }
}
