use chrono::Utc;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::audit::{AuditSink, DownloadRecord};
use crate::{Result, ShufflerError};

pub const DAT_OPTIONS: [u8; 3] = [1, 2, 3];
pub const DAT_EXPORT_NAME: &str = "pp.dat";

pub fn dat_path(dats_dir: &Path, option: u8) -> Result<PathBuf> {
    if !DAT_OPTIONS.contains(&option) {
        return Err(ShufflerError::InvalidDatOption(option));
    }
    Ok(dats_dir.join(format!("pp{option}.dat")))
}

/// Which recommended dat files are present, keyed by option.
pub fn available_dats(dats_dir: &Path) -> BTreeMap<u8, bool> {
    DAT_OPTIONS
        .iter()
        .map(|&option| (option, dats_dir.join(format!("pp{option}.dat")).is_file()))
        .collect()
}

/// Copy recommended dat `option` into `output_dir` as `pp.dat`.
///
/// The download is reported to `sink` before copying; a sink failure is
/// logged and does not stop the export.
pub fn export_recommended_dat(
    dats_dir: &Path,
    option: u8,
    output_dir: &Path,
    sink: &mut dyn AuditSink,
) -> Result<PathBuf> {
    let src = dat_path(dats_dir, option)?;
    if !src.is_file() {
        return Err(ShufflerError::MissingDat { option, path: src });
    }

    let record = DownloadRecord {
        timestamp: Utc::now(),
        dat_option: option,
    };
    match sink.record_download(&record) {
        Ok(()) => log::info!("Logged pp{}.dat download", option),
        Err(e) => log::error!("Failed to log download: {}", e),
    }

    fs::create_dir_all(output_dir)?;
    let dest = output_dir.join(DAT_EXPORT_NAME);
    fs::copy(&src, &dest)?;
    Ok(dest)
}
