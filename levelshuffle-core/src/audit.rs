use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::grouping::GroupSummary;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShuffleSessionRecord {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub file_count: usize,
    pub same_world_only: bool,
    pub number_range_enabled: bool,
    pub seed: Option<String>,
    pub seed_hash: Option<String>,
    pub groups: Vec<GroupSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMappingRecord {
    pub session_id: String,
    pub original_filename: String,
    pub shuffled_filename: String,
    pub world: Option<String>,
    pub level_number: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub timestamp: DateTime<Utc>,
    pub dat_option: u8,
}

/// Advisory record of what the shuffler did. Callers log failures here and
/// carry on; a failed write never changes a shuffle result.
pub trait AuditSink {
    fn record_session(
        &mut self,
        session: &ShuffleSessionRecord,
        mappings: &[FileMappingRecord],
    ) -> Result<()>;

    fn record_download(&mut self, download: &DownloadRecord) -> Result<()>;
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record_session(&mut self, _: &ShuffleSessionRecord, _: &[FileMappingRecord]) -> Result<()> {
        Ok(())
    }

    fn record_download(&mut self, _: &DownloadRecord) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum AuditEvent {
    Session(ShuffleSessionRecord),
    Mapping(FileMappingRecord),
    Download(DownloadRecord),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditStats {
    pub total_sessions: usize,
    pub total_downloads: usize,
    pub total_file_mappings: usize,
    /// Newest first.
    pub recent_sessions: Vec<ShuffleSessionRecord>,
    pub downloads_by_option: BTreeMap<u8, usize>,
}

/// Append-only JSON-lines audit file.
#[derive(Debug, Clone)]
pub struct JsonlAuditLog {
    path: PathBuf,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, events: &[AuditEvent]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // One buffered write so a session and its mappings land together.
        let mut buf = Vec::new();
        for event in events {
            serde_json::to_writer(&mut buf, event)?;
            buf.push(b'\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&buf)?;
        Ok(())
    }

    /// Totals plus the `recent` newest sessions. A missing file reads as an
    /// empty log; lines that fail to parse are skipped.
    pub fn stats(&self, recent: usize) -> Result<AuditStats> {
        let mut stats = AuditStats::default();
        if !self.path.exists() {
            return Ok(stats);
        }

        let reader = BufReader::new(fs::File::open(&self.path)?);
        let mut sessions = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditEvent>(&line) {
                Ok(AuditEvent::Session(session)) => sessions.push(session),
                Ok(AuditEvent::Mapping(_)) => stats.total_file_mappings += 1,
                Ok(AuditEvent::Download(download)) => {
                    stats.total_downloads += 1;
                    *stats
                        .downloads_by_option
                        .entry(download.dat_option)
                        .or_insert(0) += 1;
                }
                Err(e) => log::warn!(
                    "skipping malformed audit line {} in {}: {}",
                    line_no + 1,
                    self.path.display(),
                    e
                ),
            }
        }

        stats.total_sessions = sessions.len();
        sessions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        sessions.truncate(recent);
        stats.recent_sessions = sessions;

        Ok(stats)
    }
}

impl AuditSink for JsonlAuditLog {
    fn record_session(
        &mut self,
        session: &ShuffleSessionRecord,
        mappings: &[FileMappingRecord],
    ) -> Result<()> {
        let mut events = Vec::with_capacity(mappings.len() + 1);
        events.push(AuditEvent::Session(session.clone()));
        events.extend(mappings.iter().cloned().map(AuditEvent::Mapping));
        self.append(&events)
    }

    fn record_download(&mut self, download: &DownloadRecord) -> Result<()> {
        self.append(&[AuditEvent::Download(download.clone())])
    }
}
