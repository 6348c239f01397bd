//! hashpath - move files into a content-addressed directory tree.
//!
//! Prints the final location of every file placed, one per line. Failures are
//! logged to stderr and don't stop the remaining files.

use clap::{ArgAction, Parser};
use hashpath_filter::{Filter, ModeOption, Options};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "hashpath", version)]
#[command(about = "Move files into a content-addressed directory tree")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Root directory of the store
    #[arg(short, long, value_name = "DIR")]
    base_dir: Option<PathBuf>,
    /// Number of nested bucket directories
    #[arg(short = 'l', long, value_name = "N")]
    directory_level: Option<usize>,
    /// Permissions for created bucket directories, in octal
    #[arg(short = 'm', long, value_name = "OCTAL")]
    directory_mode: Option<String>,
    /// What to do when the destination exists: "none" or "all"
    #[arg(short, long, value_name = "POLICY")]
    overwrite: Option<String>,
    /// Keep the original file name instead of naming files by digest
    #[arg(long)]
    keep_filename: bool,
    /// Content digest: "blake3" or "crc32"
    #[arg(short, long, value_name = "ALGORITHM")]
    digest: Option<String>,
    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Files to place
    #[arg(required = true, value_name = "FILES")]
    files: Vec<PathBuf>,
}

impl Cli {
    /// Options given on the command line; unset flags defer to the loaded
    /// configuration.
    fn overrides(&self) -> Options {
        Options {
            base_dir: self.base_dir.clone(),
            directory_level: self.directory_level,
            directory_mode: self.directory_mode.clone().map(ModeOption::Octal),
            overwrite_policy: self.overwrite.clone(),
            hash_filename: self.keep_filename.then_some(false),
            digest: self.digest.clone(),
        }
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .init();
}

/// Place every file, writing each destination to `out`. Returns the number of
/// files that could not be placed.
fn place_all(filter: &Filter, files: &[PathBuf], out: &mut impl Write) -> usize {
    let mut failed = 0;
    for file in files {
        match filter.filter(file) {
            Ok(destination) => {
                if let Err(e) = writeln!(out, "{}", destination.display()) {
                    tracing::error!(error = %e, "Could not write output");
                }
            },
            Err(err) => {
                tracing::error!(
                    file = %file.display(),
                    retryable = err.is_retryable(),
                    error = ?err,
                    "Could not place file"
                );
                failed += 1;
            },
        }
    }
    failed
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match hashpath_config::load_config(cli.config.as_deref(), cli.overrides()) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = ?err, "Invalid configuration");
            return ExitCode::FAILURE;
        },
    };

    let filter = Filter::new(config);
    let failed = place_all(&filter, &cli.files, &mut io::stdout().lock());
    if failed > 0 {
        tracing::warn!(failed, total = cli.files.len(), "Some files were not placed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use hashpath_filter::Config;
    use rstest::rstest;
    use std::fs;

    #[test]
    fn test_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "hashpath", "-b", "/srv/store", "-l", "3", "-m", "0750", "-o", "none", "--keep-filename", "-d", "crc32",
            "-vv", "a.txt", "b.txt",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.files, [PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
        let options = cli.overrides();
        assert_eq!(options.base_dir, Some(PathBuf::from("/srv/store")));
        assert_eq!(options.directory_level, Some(3));
        assert_eq!(options.directory_mode, Some(ModeOption::Octal("0750".to_string())));
        assert_eq!(options.overwrite_policy.as_deref(), Some("none"));
        assert_eq!(options.hash_filename, Some(false));
        assert_eq!(options.digest.as_deref(), Some("crc32"));
    }

    #[test]
    fn test_no_overrides() {
        let cli = Cli::try_parse_from(["hashpath", "a.txt"]).unwrap();
        assert_eq!(cli.overrides(), Options::default());
    }

    #[rstest]
    #[case(&["hashpath"])]
    #[case(&["hashpath", "-l", "two", "a.txt"])]
    fn test_rejected(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_place_all() {
        let store = tempfile::tempdir().unwrap();
        let incoming = tempfile::tempdir().unwrap();
        let present = incoming.path().join("present.txt");
        fs::write(&present, b"content").unwrap();
        let missing = incoming.path().join("missing.txt");

        let filter = Filter::new(Config::new(store.path()).unwrap());
        let mut out = Vec::new();
        let failed = place_all(&filter, &[missing, present.clone()], &mut out);
        assert_eq!(failed, 1);

        let out = String::from_utf8(out).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(PathBuf::from(lines[0]).is_file());
        assert!(!present.exists());
    }
}
