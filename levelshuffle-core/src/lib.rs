use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

pub mod archive;
pub mod assets;
pub mod audit;
pub mod config;
pub mod filename;
pub mod grouping;
pub mod level;
pub mod rng;
pub mod shuffle;

pub use archive::ShuffleLog;
pub use audit::{AuditSink, AuditStats, JsonlAuditLog, NullAuditSink};
pub use config::ShufflerConfig;
pub use filename::{parse_level_filename, ParsedName};
pub use grouping::{create_filename_groups, Group, GroupKey, GroupSummary, ShuffleGroups};
pub use level::{list_level_files, LevelFile};
pub use rng::{random_source, EntropySource, RandomSource, SeededSource};
pub use shuffle::{shuffle_with_seed, shuffle_within_groups, ShuffleMapping};

use audit::{FileMappingRecord, ShuffleSessionRecord};

pub const SHUFFLED_ARCHIVE_NAME: &str = "shuffled_levels.zip";
pub const ORIGINAL_ARCHIVE_NAME: &str = "original_levels.zip";
const STATUS_PREVIEW_FILES: usize = 10;
const STATUS_RECENT_SESSIONS: usize = 5;

#[derive(Debug, Error)]
pub enum ShufflerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("no .rton files found in {}", .0.display())]
    NoLevels(PathBuf),
    #[error("invalid pp.dat option {0} (expected 1, 2 or 3)")]
    InvalidDatOption(u8),
    #[error("pp{option}.dat not found at {}", .path.display())]
    MissingDat { option: u8, path: PathBuf },
}

pub type Result<T> = std::result::Result<T, ShufflerError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShuffleSettings {
    pub levels_dir: PathBuf,
    pub output_dir: PathBuf,
    pub same_world_only: bool,
    pub number_range_enabled: bool,
    pub number_range: u64,
    pub seed: Option<String>,
}

impl ShuffleSettings {
    pub fn from_config(config: &ShufflerConfig) -> Self {
        Self {
            levels_dir: config.levels_dir.clone(),
            output_dir: config.output_dir.clone(),
            same_world_only: false,
            number_range_enabled: false,
            number_range: config.number_range,
            seed: None,
        }
    }

    /// Trimmed seed, or `None` when it is missing or blank.
    pub fn effective_seed(&self) -> Option<&str> {
        self.seed.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn policy_description(&self) -> String {
        let range = self.number_range;
        match (self.same_world_only, self.number_range_enabled) {
            (true, true) => format!("Shuffling: Same world + number range (±{range})"),
            (true, false) => "Shuffling: Same world only".to_string(),
            (false, true) => format!("Shuffling: Number range across all worlds (±{range})"),
            (false, false) => "Shuffling: Completely random".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShuffleReport {
    pub session_id: String,
    pub archive_path: PathBuf,
    pub file_count: usize,
    pub archived: usize,
    pub groups: Vec<GroupSummary>,
    pub mapping: ShuffleMapping,
    pub log: ShuffleLog,
}

fn log_header(settings: &ShuffleSettings, session_id: &str, file_count: usize) -> ShuffleLog {
    let mut log = ShuffleLog::new();
    log.push(format!("Processing {} .rton files", file_count));
    log.push(format!("Session ID: {}", session_id));
    log.push(format!(
        "Seed: {}",
        settings.effective_seed().unwrap_or("Random (no seed)")
    ));
    log.push(format!("Same world only: {}", settings.same_world_only));
    log.push(format!(
        "Number range shuffling: {} (±{} if enabled)",
        settings.number_range_enabled, settings.number_range
    ));
    log.push("-".repeat(50));
    log
}

fn audit_records(
    settings: &ShuffleSettings,
    session_id: &str,
    file_count: usize,
    groups: &ShuffleGroups,
    mapping: &ShuffleMapping,
) -> (ShuffleSessionRecord, Vec<FileMappingRecord>) {
    let seed = settings.effective_seed();
    let session = ShuffleSessionRecord {
        session_id: session_id.to_string(),
        timestamp: Utc::now(),
        file_count,
        same_world_only: settings.same_world_only,
        number_range_enabled: settings.number_range_enabled,
        seed: seed.map(str::to_string),
        seed_hash: seed.map(rng::seed_hash),
        groups: groups.summaries(),
    };

    let mappings = mapping
        .entries()
        .iter()
        .map(|entry| {
            let parsed = parse_level_filename(&entry.file.name);
            FileMappingRecord {
                session_id: session_id.to_string(),
                original_filename: entry.file.name.clone(),
                shuffled_filename: entry.new_name.clone(),
                world: parsed.world().map(str::to_string),
                level_number: parsed.number(),
            }
        })
        .collect();

    (session, mappings)
}

/// List, group, shuffle and pack one directory of levels into
/// `shuffled_levels.zip`, then report the session to `sink`.
pub fn run(settings: ShuffleSettings, sink: &mut dyn AuditSink) -> Result<ShuffleReport> {
    let files = list_level_files(&settings.levels_dir)?;
    if files.is_empty() {
        return Err(ShufflerError::NoLevels(settings.levels_dir.clone()));
    }

    let session_id = Uuid::new_v4().to_string();
    let mut log = log_header(&settings, &session_id, files.len());

    let number_range = settings
        .number_range_enabled
        .then_some(settings.number_range);
    let groups = create_filename_groups(&files, settings.same_world_only, number_range);
    log.push(settings.policy_description());

    log.push("");
    log.push(format!("Created {} shuffle groups:", groups.len()));
    for summary in groups.summaries() {
        log.push(format!("  {}: {} files", summary.key, summary.count));
    }
    log.push("");

    let mapping = shuffle_with_seed(&groups, settings.effective_seed());

    log.push("FILENAME SHUFFLES:");
    for entry in mapping.changed() {
        log.push(format!("{} -> {}", entry.file.name, entry.new_name));
    }
    log.push("");

    fs::create_dir_all(&settings.output_dir)?;
    let archive_path = settings.output_dir.join(SHUFFLED_ARCHIVE_NAME);
    let archived = archive::write_shuffled_archive(
        File::create(&archive_path)?,
        &files,
        &mapping,
        &mut log,
    )?;

    let (session, mappings) = audit_records(&settings, &session_id, files.len(), &groups, &mapping);
    match sink.record_session(&session, &mappings) {
        Ok(()) => log::info!("Saved shuffle session {}", session_id),
        Err(e) => log::error!("Failed to save session {}: {}", session_id, e),
    }

    log::info!(
        "shuffled {} files in {} groups into {}",
        files.len(),
        groups.len(),
        archive_path.display()
    );

    Ok(ShuffleReport {
        session_id,
        archive_path,
        file_count: files.len(),
        archived,
        groups: groups.summaries(),
        mapping,
        log,
    })
}

/// Pack the untouched levels with install instructions into
/// `original_levels.zip`.
pub fn export_original_levels(levels_dir: &Path, output_dir: &Path) -> Result<PathBuf> {
    let files = list_level_files(levels_dir)?;
    if files.is_empty() {
        return Err(ShufflerError::NoLevels(levels_dir.to_path_buf()));
    }

    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(ORIGINAL_ARCHIVE_NAME);
    archive::write_original_archive(File::create(&path)?, &files)?;
    log::info!("exported {} original levels to {}", files.len(), path.display());
    Ok(path)
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub file_count: usize,
    /// First few names, for a preview.
    pub files: Vec<String>,
    pub pp_files: BTreeMap<u8, bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_stats: Option<AuditStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_error: Option<String>,
}

/// Snapshot of the level directory, recommended dats and audit totals.
pub fn status(config: &ShufflerConfig) -> Result<StatusReport> {
    let files = list_level_files(&config.levels_dir)?;

    let (audit_stats, audit_error) = match &config.audit_log {
        Some(path) => match JsonlAuditLog::new(path).stats(STATUS_RECENT_SESSIONS) {
            Ok(stats) => (Some(stats), None),
            Err(e) => {
                log::error!("Failed to get audit stats: {}", e);
                (None, Some("Audit log unavailable".to_string()))
            }
        },
        None => (None, None),
    };

    Ok(StatusReport {
        file_count: files.len(),
        files: files
            .iter()
            .take(STATUS_PREVIEW_FILES)
            .map(|f| f.name.clone())
            .collect(),
        pp_files: assets::available_dats(&config.dats_dir),
        audit_stats,
        audit_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    struct FailingSink;

    impl AuditSink for FailingSink {
        fn record_session(&mut self, _: &ShuffleSessionRecord, _: &[FileMappingRecord]) -> Result<()> {
            Err(ShufflerError::Config("audit store down".into()))
        }

        fn record_download(&mut self, _: &audit::DownloadRecord) -> Result<()> {
            Err(ShufflerError::Config("audit store down".into()))
        }
    }

    fn seed_levels(dir: &Path, names: &[&str]) {
        fs::create_dir_all(dir).unwrap();
        for name in names {
            fs::write(dir.join(name), format!("bytes:{name}")).unwrap();
        }
    }

    fn settings(root: &Path, same_world_only: bool, seed: Option<&str>) -> ShuffleSettings {
        ShuffleSettings {
            levels_dir: root.join("levels"),
            output_dir: root.join("out"),
            same_world_only,
            number_range_enabled: false,
            number_range: 5,
            seed: seed.map(str::to_string),
        }
    }

    fn archive_entry(path: &Path, name: &str) -> String {
        let bytes = fs::read(path).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut out = String::new();
        entry.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn empty_level_directory_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let err = run(settings(root.path(), false, None), &mut NullAuditSink).unwrap_err();
        assert!(matches!(err, ShufflerError::NoLevels(_)));
        assert!(root.path().join("levels").is_dir());
    }

    #[test]
    fn run_packs_shuffled_levels_and_log() {
        let root = tempfile::tempdir().unwrap();
        let levels = root.path().join("levels");
        seed_levels(&levels, &["beach1.rton", "beach2.rton", "beach3.rton", "pirate1.rton"]);

        let mut audit = JsonlAuditLog::new(root.path().join("audit.jsonl"));
        let report = run(settings(root.path(), true, Some("  test ")), &mut audit).unwrap();

        assert_eq!(report.file_count, 4);
        assert_eq!(report.archived, 4);
        assert_eq!(
            report.groups,
            vec![
                GroupSummary { key: "beach".into(), count: 3 },
                GroupSummary { key: "pirate".into(), count: 1 },
            ]
        );

        for entry in report.mapping.entries() {
            let content = archive_entry(&report.archive_path, &entry.new_name);
            assert_eq!(content, format!("bytes:{}", entry.file.name));
        }

        let log = archive_entry(&report.archive_path, archive::SHUFFLE_LOG_NAME);
        assert!(log.starts_with("Processing 4 .rton files"));
        assert!(log.contains(&format!("Session ID: {}", report.session_id)));
        assert!(log.contains("Seed: test"));
        assert!(log.contains("Shuffling: Same world only"));
        assert!(log.contains("Created 2 shuffle groups:"));
        assert!(log.contains("  beach: 3 files"));
        for entry in report.mapping.changed() {
            assert!(log.contains(&format!("{} -> {}", entry.file.name, entry.new_name)));
        }

        let stats = audit.stats(5).unwrap();
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.total_file_mappings, 4);
        let session = &stats.recent_sessions[0];
        assert_eq!(session.session_id, report.session_id);
        assert_eq!(session.seed.as_deref(), Some("test"));
        assert_eq!(session.seed_hash.as_deref().map(|h| &h[..8]), Some("9f86d081"));
    }

    #[test]
    fn same_seed_reproduces_the_mapping() {
        let root = tempfile::tempdir().unwrap();
        let names: Vec<String> = (1..=15).map(|n| format!("egypt{n}.rton")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        seed_levels(&root.path().join("levels"), &refs);

        let first = run(settings(root.path(), false, Some("repeat")), &mut NullAuditSink).unwrap();
        let second = run(settings(root.path(), false, Some("repeat")), &mut NullAuditSink).unwrap();
        assert_eq!(first.mapping, second.mapping);
        assert_ne!(first.session_id, second.session_id);
    }

    #[test]
    fn both_flags_group_by_world() {
        let root = tempfile::tempdir().unwrap();
        seed_levels(&root.path().join("levels"), &["beach1.rton", "beach30.rton"]);

        let mut s = settings(root.path(), true, Some("x"));
        s.number_range_enabled = true;
        let report = run(s, &mut NullAuditSink).unwrap();

        assert_eq!(report.groups, vec![GroupSummary { key: "beach".into(), count: 2 }]);
        assert!(report
            .log
            .lines()
            .iter()
            .any(|l| l == "Shuffling: Same world + number range (±5)"));
    }

    #[test]
    fn audit_failure_does_not_fail_the_run() {
        let root = tempfile::tempdir().unwrap();
        seed_levels(&root.path().join("levels"), &["beach1.rton", "beach2.rton"]);

        let report = run(settings(root.path(), false, None), &mut FailingSink).unwrap();
        assert!(report.archive_path.is_file());
        assert_eq!(report.mapping.len(), 2);
    }

    #[test]
    fn originals_are_exported_with_instructions() {
        let root = tempfile::tempdir().unwrap();
        let levels = root.path().join("levels");
        seed_levels(&levels, &["beach1.rton"]);

        let path = export_original_levels(&levels, &root.path().join("out")).unwrap();
        assert_eq!(path.file_name().unwrap(), ORIGINAL_ARCHIVE_NAME);
        assert_eq!(archive_entry(&path, "beach1.rton"), "bytes:beach1.rton");
        assert!(archive_entry(&path, archive::INSTRUCTIONS_NAME).contains("Restart Plants vs Zombies 2"));
    }

    #[test]
    fn status_previews_files_and_reports_audit() {
        let root = tempfile::tempdir().unwrap();
        let names: Vec<String> = (1..=12).map(|n| format!("dino{n:02}.rton")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        seed_levels(&root.path().join("levels"), &refs);
        fs::create_dir_all(root.path().join("dats")).unwrap();
        fs::write(root.path().join("dats").join("pp1.dat"), b"1").unwrap();

        let config = ShufflerConfig {
            levels_dir: root.path().join("levels"),
            dats_dir: root.path().join("dats"),
            output_dir: root.path().join("out"),
            audit_log: Some(root.path().join("audit.jsonl")),
            log_file: None,
            number_range: 5,
        };

        let report = status(&config).unwrap();
        assert_eq!(report.file_count, 12);
        assert_eq!(report.files.len(), 10);
        assert_eq!(report.files[0], "dino01.rton");
        assert_eq!(report.pp_files.get(&1), Some(&true));
        assert_eq!(report.pp_files.get(&2), Some(&false));
        assert_eq!(report.audit_stats.map(|s| s.total_sessions), Some(0));
        assert!(report.audit_error.is_none());
    }
}
