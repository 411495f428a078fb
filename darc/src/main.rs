mod output;
mod owner;
mod walk;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::error::ErrorKind;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use darc_core::format::{format_file_mode, format_file_size, format_time};
use darc_core::{ArchiveRequirement, Location, OwnerNames, Pattern, PatternKind, PatternList, varint};
use output::{
    EncodedValue, LocationOutput, OutputWriter, PlanEntry, PlanOutput, VarintDecodeOutput,
    VarintEncodeOutput,
};
use owner::SystemLookup;
use std::collections::HashSet;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Darc - building blocks for a deduplicating archiver
#[derive(Parser)]
#[command(name = "darc")]
#[command(about = "Plan archives, check locations and inspect varints", long_about = None)]
#[command(version)]
struct Cli {
    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the entries an archive of PATHS would contain
    Plan {
        /// Target archive, as [[user@]host:]path::archive
        #[arg(value_parser = parse_archive_location)]
        archive: Location,

        /// Paths to walk
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Include paths matching PATTERN
        #[arg(short, long, value_name = "PATTERN")]
        include: Vec<String>,

        /// Exclude paths matching PATTERN
        #[arg(short, long, value_name = "PATTERN")]
        exclude: Vec<String>,

        /// Show mode, owner, size and modification time
        #[arg(short, long)]
        long: bool,
    },

    /// Check a repository location (no archive allowed)
    Repo {
        /// Repository, as [[user@]host:]path (defaults to DARC_REPOSITORY env var)
        repository: Option<String>,
    },

    /// Parse any location and show its parts
    Location {
        /// Location, as [[user@]host:]path[::archive]
        location: String,
    },

    /// Encode or decode variable-length integers
    #[command(subcommand)]
    Varint(VarintCommands),
}

#[derive(Subcommand)]
enum VarintCommands {
    /// Encode integers, printing hex bytes
    Encode {
        /// Values to encode
        #[arg(required = true)]
        values: Vec<u64>,
    },

    /// Decode a hex string holding one or more consecutive varints
    Decode {
        /// Hex-encoded bytes
        hex: String,
    },
}

/// Accepts only locations that name an archive.
fn parse_archive_location(text: &str) -> darc_core::Result<Location> {
    Location::validate(text, ArchiveRequirement::Required)
}

/// Accepts only locations that name no archive.
fn parse_repository_location(text: &str) -> darc_core::Result<Location> {
    Location::validate(text, ArchiveRequirement::Forbidden)
}

fn main() -> ExitCode {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let output = OutputWriter::new(cli.json);
    let result = match cli.command {
        Commands::Plan {
            archive,
            paths,
            long,
            ..
        } => {
            let patterns = matches
                .subcommand_matches("plan")
                .map(ordered_patterns)
                .unwrap_or_default();
            cmd_plan(&output, archive, &paths, patterns, long)
        }
        Commands::Repo { repository } => cmd_repo(&output, repository),
        Commands::Location { location } => cmd_location(&output, &location),
        Commands::Varint(varint_cmd) => match varint_cmd {
            VarintCommands::Encode { values } => cmd_varint_encode(&output, &values),
            VarintCommands::Decode { hex } => cmd_varint_decode(&output, &hex),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.write_error(&err, 1);
            ExitCode::from(1)
        }
    }
}

/// Rebuild the include/exclude list in the order the flags were given.
fn ordered_patterns(matches: &ArgMatches) -> PatternList {
    let mut indexed = Vec::new();
    for (id, kind) in [
        ("include", PatternKind::Include),
        ("exclude", PatternKind::Exclude),
    ] {
        if let (Some(values), Some(indices)) =
            (matches.get_many::<String>(id), matches.indices_of(id))
        {
            indexed.extend(
                indices
                    .zip(values)
                    .map(|(index, text)| (index, Pattern::new(kind, text.clone()))),
            );
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, pattern)| pattern).collect()
}

/// Exit code clap uses for usage errors.
const USAGE_ERROR: u8 = 2;

/// Exit with a usage error, the way clap reports a bad argument.
///
/// In JSON mode the error is written as a JSON object instead.
fn usage_error(output: &OutputWriter, err: darc_core::Error) -> ! {
    if output.is_json() {
        output.write_error(&anyhow::Error::new(err), USAGE_ERROR);
        std::process::exit(i32::from(USAGE_ERROR));
    }
    Cli::command()
        .error(ErrorKind::ValueValidation, err)
        .exit()
}

fn cmd_plan(
    output: &OutputWriter,
    target: Location,
    paths: &[PathBuf],
    patterns: PatternList,
    long: bool,
) -> Result<()> {
    log::info!(
        "planning archive {:?} with {} patterns",
        target.archive(),
        patterns.len()
    );

    // Never archive a local repository into itself.
    let mut skip_inodes = HashSet::new();
    if !target.is_remote()
        && let Ok(metadata) = std::fs::symlink_metadata(target.path())
        && let Some(key) = walk::inode_key(&metadata)
    {
        skip_inodes.insert(key);
    }

    let names = OwnerNames::new(SystemLookup);
    let now = Local::now();
    let mut entries = Vec::new();

    for path in paths {
        let walker = walk::walk_path(path, &skip_inodes, &patterns)
            .with_context(|| format!("Failed to walk {}", path.display()))?;
        for entry in walker {
            let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
            entries.push(plan_entry(&entry.path, &entry.metadata, long, &names, &now));
        }
    }

    let data = PlanOutput {
        success: true,
        result_code: 0,
        patterns: patterns.iter().map(|pattern| pattern.to_string()).collect(),
        target,
        entries,
    };

    output.write(&data, || {
        let mut text = String::new();
        for entry in &data.entries {
            if long {
                text.push_str(&format!(
                    "{}{} {:<8} {:<8} {:>9} {} {}\n",
                    type_char(&entry.entry_type),
                    entry.mode.as_deref().unwrap_or_default(),
                    entry.owner.as_deref().unwrap_or_default(),
                    entry.group.as_deref().unwrap_or_default(),
                    entry.size.map(format_file_size).unwrap_or_default(),
                    entry.modified.as_deref().unwrap_or_default(),
                    entry.path
                ));
            } else {
                text.push_str(&format!("{}\n", entry.path));
            }
        }
        text.push_str(&format!(
            "{} entries would be stored in {}\n",
            data.entries.len(),
            data.target
        ));
        text
    })
}

fn plan_entry(
    path: &Path,
    metadata: &Metadata,
    long: bool,
    names: &OwnerNames<SystemLookup>,
    now: &DateTime<Local>,
) -> PlanEntry {
    let file_type = metadata.file_type();
    let entry_type = if file_type.is_dir() {
        "directory"
    } else if file_type.is_symlink() {
        "symlink"
    } else if file_type.is_file() {
        "file"
    } else {
        "special"
    };

    let mut entry = PlanEntry {
        path: path.display().to_string(),
        entry_type: entry_type.to_string(),
        mode: None,
        owner: None,
        group: None,
        size: None,
        modified: None,
    };

    if long {
        let (mode, uid, gid) = ownership(metadata);
        entry.mode = Some(format_file_mode(mode));
        entry.owner = Some(names.uid_to_user(uid).unwrap_or_else(|| uid.to_string()));
        entry.group = Some(names.gid_to_group(gid).unwrap_or_else(|| gid.to_string()));
        entry.size = Some(metadata.len());
        entry.modified = metadata
            .modified()
            .ok()
            .map(|time| format_time(&DateTime::<Local>::from(time), now));
    }

    entry
}

#[cfg(unix)]
fn ownership(metadata: &Metadata) -> (u32, u32, u32) {
    use std::os::unix::fs::MetadataExt;
    (metadata.mode(), metadata.uid(), metadata.gid())
}

#[cfg(not(unix))]
fn ownership(metadata: &Metadata) -> (u32, u32, u32) {
    let mode = if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    };
    (mode, 0, 0)
}

fn type_char(entry_type: &str) -> char {
    match entry_type {
        "directory" => 'd',
        "symlink" => 'l',
        "file" => '-',
        _ => '?',
    }
}

fn cmd_repo(output: &OutputWriter, repository: Option<String>) -> Result<()> {
    // CLI arg > DARC_REPOSITORY env var
    let text = repository
        .or_else(|| std::env::var("DARC_REPOSITORY").ok())
        .context("No repository given (pass one or set DARC_REPOSITORY)")?;

    let location = parse_repository_location(&text).unwrap_or_else(|err| usage_error(output, err));
    write_location(output, location)
}

fn cmd_location(output: &OutputWriter, text: &str) -> Result<()> {
    let location = Location::parse(text).unwrap_or_else(|err| usage_error(output, err));
    write_location(output, location)
}

fn write_location(output: &OutputWriter, location: Location) -> Result<()> {
    let data = LocationOutput {
        success: true,
        result_code: 0,
        canonical: location.to_string(),
        location,
    };

    output.write(&data, || {
        let loc = &data.location;
        let mut text = String::new();
        text.push_str(&format!("User: {}\n", loc.user().unwrap_or("-")));
        text.push_str(&format!("Host: {}\n", loc.host().unwrap_or("-")));
        text.push_str(&format!("Path: {}\n", loc.path()));
        text.push_str(&format!("Archive: {}\n", loc.archive().unwrap_or("-")));
        text.push_str(&format!("Canonical: {}\n", data.canonical));
        text
    })
}

fn cmd_varint_encode(output: &OutputWriter, values: &[u64]) -> Result<()> {
    let data = VarintEncodeOutput {
        success: true,
        result_code: 0,
        values: values
            .iter()
            .map(|&value| EncodedValue {
                value,
                hex: hex::encode(varint::encode(value)),
            })
            .collect(),
    };

    output.write(&data, || {
        data.values
            .iter()
            .map(|encoded| format!("{} {}\n", encoded.value, encoded.hex))
            .collect()
    })
}

fn cmd_varint_decode(output: &OutputWriter, hex_str: &str) -> Result<()> {
    let bytes = hex::decode(hex_str.trim()).with_context(|| format!("Invalid hex: {}", hex_str))?;

    let mut values = Vec::new();
    let mut rest = bytes.as_slice();
    while !rest.is_empty() {
        let (value, used) = varint::decode_prefix(rest).with_context(|| {
            format!(
                "Failed to decode varint at byte {}",
                bytes.len() - rest.len()
            )
        })?;
        values.push(value);
        rest = &rest[used..];
    }

    let data = VarintDecodeOutput {
        success: true,
        result_code: 0,
        values,
    };

    output.write(&data, || {
        data.values
            .iter()
            .map(|value| format!("{}\n", value))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_matches(args: &[&str]) -> ArgMatches {
        let mut argv = vec!["darc", "plan", "/srv/repo::a", "/data"];
        argv.extend_from_slice(args);
        let matches = Cli::command().try_get_matches_from(argv).unwrap();
        matches.subcommand_matches("plan").unwrap().clone()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_patterns_keep_flag_order() {
        let matches = plan_matches(&["-e", "/data/tmp", "-i", "*.py", "--exclude", "*.o"]);
        let patterns = ordered_patterns(&matches);
        assert_eq!(
            patterns.as_slice(),
            &[
                Pattern::exclude("/data/tmp"),
                Pattern::include("*.py"),
                Pattern::exclude("*.o"),
            ]
        );
    }

    #[test]
    fn test_no_patterns() {
        let matches = plan_matches(&[]);
        assert!(ordered_patterns(&matches).is_empty());
    }

    #[test]
    fn test_plan_requires_archive() {
        let err = Cli::command()
            .try_get_matches_from(["darc", "plan", "host:path", "/data"])
            .unwrap_err();
        assert!(err.to_string().contains("\"host:path\": No archive specified"));
    }

    #[test]
    fn test_plan_rejects_bad_location() {
        let err = Cli::command()
            .try_get_matches_from(["darc", "plan", "a:b:c", "/data"])
            .unwrap_err();
        assert!(err.to_string().contains("Invalid location format: \"a:b:c\""));
    }

    #[test]
    fn test_repository_forbids_archive() {
        assert!(parse_repository_location("host:path").is_ok());
        assert_eq!(
            parse_repository_location("host:path::a")
                .unwrap_err()
                .to_string(),
            "\"host:path::a\" No archive can be specified"
        );
    }

    #[test]
    fn test_type_char() {
        assert_eq!(type_char("directory"), 'd');
        assert_eq!(type_char("file"), '-');
        assert_eq!(type_char("symlink"), 'l');
    }
}
