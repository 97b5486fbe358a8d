use std::fs;
use std::io::{Seek, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::level::LevelFile;
use crate::shuffle::ShuffleMapping;
use crate::Result;

pub const SHUFFLE_LOG_NAME: &str = "shuffle_log.txt";
pub const INSTRUCTIONS_NAME: &str = "INSTALLATION_INSTRUCTIONS.txt";

const INSTALLATION_INSTRUCTIONS: &str = "\
PvZ2 Level Installation Instructions

To install these level files on Android:

1. Ensure your device is rooted or you have file manager access to app data
2. Navigate to: Android/data/com.ea.game.pvz2_row/files/No_Backup/C.D.XX.X/levels
   (Replace C.D.XX.X with your actual game version folder)
3. Backup your original levels folder first!
4. Copy all .rton files from this ZIP to the levels folder
5. Restart Plants vs Zombies 2

Note: Game version folders vary (e.g., C.D.10.1.1, C.D.9.8.1, etc.)
Always backup original files before replacing them.
Modifying game files may void warranties and could cause issues.

For iOS or PC versions, locate the equivalent levels directory in your game installation.
";

/// Human-readable record of one run, shipped inside the archive.
#[derive(Debug, Clone, Default)]
pub struct ShuffleLog {
    lines: Vec<String>,
}

impl ShuffleLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

fn deflated() -> FileOptions {
    FileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Write every level under its shuffled name, then the log.
///
/// A level that cannot be read is noted in the log and left out; the rest of
/// the archive is still written. Returns how many levels made it in.
pub fn write_shuffled_archive<W: Write + Seek>(
    writer: W,
    files: &[LevelFile],
    mapping: &ShuffleMapping,
    log: &mut ShuffleLog,
) -> Result<usize> {
    let mut zip = ZipWriter::new(writer);
    let mut written = 0usize;

    for file in files {
        let new_name = mapping.new_name(file).unwrap_or(file.name.as_str());

        let data = match fs::read(&file.path) {
            Ok(data) => data,
            Err(e) => {
                log.push(format!("Error processing {}: {}", file.name, e));
                log::error!("Error processing {}: {}", file.name, e);
                continue;
            }
        };

        zip.start_file(new_name, deflated())?;
        zip.write_all(&data)?;
        written += 1;
    }

    zip.start_file(SHUFFLE_LOG_NAME, deflated())?;
    zip.write_all(log.render().as_bytes())?;
    zip.finish()?;

    Ok(written)
}

/// Untouched levels plus install instructions. Any unreadable level fails the
/// whole export.
pub fn write_original_archive<W: Write + Seek>(writer: W, files: &[LevelFile]) -> Result<()> {
    let mut zip = ZipWriter::new(writer);

    for file in files {
        let data = fs::read(&file.path)?;
        zip.start_file(file.name.as_str(), deflated())?;
        zip.write_all(&data)?;
    }

    zip.start_file(INSTRUCTIONS_NAME, deflated())?;
    zip.write_all(INSTALLATION_INSTRUCTIONS.as_bytes())?;
    zip.finish()?;

    Ok(())
}
