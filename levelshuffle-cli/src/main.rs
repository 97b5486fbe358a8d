use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::{Path, PathBuf};

use levelshuffle_core::assets::export_recommended_dat;
use levelshuffle_core::{
    export_original_levels, run, status, AuditSink, JsonlAuditLog, NullAuditSink,
    ShuffleSettings, ShufflerConfig,
};

#[derive(Debug, Parser)]
#[command(name = "levelshuffle", version, about = "Shuffle level filenames into a ready-to-install archive")]
struct Args {
    /// JSON config file. Defaults to LevelShuffler/config.json in the user config dir.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    levels_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Shuffle level filenames and write shuffled_levels.zip.
    Shuffle {
        /// Only swap names between levels of the same world.
        #[arg(long, default_value_t = false)]
        same_world: bool,

        /// Only swap names between levels with nearby numbers.
        #[arg(long, default_value_t = false)]
        number_range: bool,

        /// Seed phrase for a reproducible shuffle.
        #[arg(long)]
        seed: Option<String>,

        /// Override the configured distance for --number-range.
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        range: Option<u64>,
    },
    /// Write the untouched levels to original_levels.zip.
    Originals,
    /// Export recommended pp.dat number 1, 2 or 3.
    Dat {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=3))]
        option: u8,
    },
    /// Print level, asset and audit status as JSON.
    Status,
    /// Print audit statistics.
    Stats {
        #[arg(long, default_value_t = 10)]
        recent: usize,
    },
}

fn config_path() -> Option<PathBuf> {
    let mut base = dirs::config_dir().or_else(dirs::data_dir)?;
    base.push("LevelShuffler");
    base.push("config.json");
    Some(base)
}

fn load_config(args: &Args) -> levelshuffle_core::Result<ShufflerConfig> {
    let mut config = match &args.config {
        Some(path) => ShufflerConfig::load(path)?,
        None => config_path()
            .map(|path| ShufflerConfig::load_or_default(&path))
            .unwrap_or_default(),
    };

    if let Some(dir) = &args.levels_dir {
        config.levels_dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    Ok(config)
}

fn setup_logging(verbose: bool, log_file: Option<&Path>) -> Result<(), fern::InitError> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    if let Some(path) = log_file {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}

fn audit_sink(config: &ShufflerConfig) -> Box<dyn AuditSink> {
    match &config.audit_log {
        Some(path) => Box::new(JsonlAuditLog::new(path)),
        None => Box::new(NullAuditSink),
    }
}

fn execute(args: Args, config: ShufflerConfig) -> levelshuffle_core::Result<()> {
    match args.command {
        Command::Shuffle {
            same_world,
            number_range,
            seed,
            range,
        } => {
            let settings = ShuffleSettings {
                same_world_only: same_world,
                number_range_enabled: number_range,
                number_range: range.unwrap_or(config.number_range),
                seed,
                ..ShuffleSettings::from_config(&config)
            };
            let mut sink = audit_sink(&config);
            let report = run(settings, sink.as_mut())?;

            println!("Session {}", report.session_id);
            println!("Created {} shuffle groups:", report.groups.len());
            for group in &report.groups {
                println!("  {}: {} files", group.key, group.count);
            }
            println!(
                "Renamed {} of {} files; wrote {}",
                report.mapping.changed().count(),
                report.file_count,
                report.archive_path.display()
            );
        }
        Command::Originals => {
            let path = export_original_levels(&config.levels_dir, &config.output_dir)?;
            println!("Wrote {}", path.display());
        }
        Command::Dat { option } => {
            let mut sink = audit_sink(&config);
            let path =
                export_recommended_dat(&config.dats_dir, option, &config.output_dir, sink.as_mut())?;
            println!("Wrote {}", path.display());
        }
        Command::Status => {
            let report = status(&config)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Stats { recent } => {
            let Some(path) = &config.audit_log else {
                println!("Audit log disabled in config");
                return Ok(());
            };
            let stats = JsonlAuditLog::new(path).stats(recent)?;

            println!("Total shuffle sessions: {}", stats.total_sessions);
            println!("Total pp.dat downloads: {}", stats.total_downloads);
            println!("Total file mappings:    {}", stats.total_file_mappings);
            println!();
            println!("Recent sessions:");
            for session in &stats.recent_sessions {
                println!(
                    "  {}  {}  files={} same_world={} number_range={} seed={}",
                    session.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    session.session_id,
                    session.file_count,
                    session.same_world_only,
                    session.number_range_enabled,
                    session.seed.as_deref().unwrap_or("-"),
                );
            }
            println!();
            println!("Downloads by option:");
            for (option, count) in &stats.downloads_by_option {
                println!("  pp{}.dat: {}", option, count);
            }
        }
    }

    Ok(())
}

fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = setup_logging(args.verbose, config.log_file.as_deref()) {
        eprintln!("Failed to initialise logging: {err}");
    }

    if let Err(err) = execute(args, config) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shuffle_flags() {
        let args = Args::try_parse_from([
            "levelshuffle",
            "--levels-dir",
            "lv",
            "shuffle",
            "--same-world",
            "--seed",
            "test",
        ])
        .unwrap();

        assert_eq!(args.levels_dir, Some(PathBuf::from("lv")));
        match args.command {
            Command::Shuffle {
                same_world,
                number_range,
                seed,
                range,
            } => {
                assert!(same_world);
                assert!(!number_range);
                assert_eq!(seed.as_deref(), Some("test"));
                assert_eq!(range, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_dat_option() {
        assert!(Args::try_parse_from(["levelshuffle", "dat", "4"]).is_err());
        assert!(Args::try_parse_from(["levelshuffle", "dat", "2"]).is_ok());
    }

    #[test]
    fn overrides_apply_on_top_of_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "levels_dir": "a", "number_range": 7 }"#).unwrap();

        let args = Args::try_parse_from([
            "levelshuffle",
            "--config",
            path.to_str().unwrap(),
            "--output-dir",
            "out",
            "status",
        ])
        .unwrap();
        let config = load_config(&args).unwrap();
        assert_eq!(config.levels_dir, PathBuf::from("a"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.number_range, 7);
    }
}
