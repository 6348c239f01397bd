//! Layered configuration for the hashpath filter.
//!
//! Named [`Options`] are merged from several sources, lowest precedence first:
//!
//! 1. built-in defaults (every option unset);
//! 2. the per-user `config.{toml,yaml,yml,json}` in the platform configuration
//!    directory (e.g. `~/.config/hashpath/` on Linux);
//! 3. an explicit configuration file, if one is given;
//! 4. `HASHPATH_*` environment variables (`HASHPATH_BASE_DIR`,
//!    `HASHPATH_DIRECTORY_LEVEL`, ...). `HASHPATH_DIRECTORY_MODE` is always read
//!    as octal, so `0755` means `rwxr-xr-x`.
//!
//! [`load_config`] additionally layers caller overrides on top and validates
//! the result into a [`Config`].

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use hashpath_filter::{Config, ModeOption, Options};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Prefix of environment variables read as options.
pub const ENV_PREFIX: &str = "HASHPATH_";

const FILE_STEM: &str = "config";
const EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];
/// Option read from the environment as a raw string rather than a parsed
/// value, since `0755` must stay octal.
const MODE_KEY: &str = "directory_mode";

/// The per-user configuration directory, if the platform has one.
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "hashpath").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Merge all option sources without deserializing them.
pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
    let mut figment = Figment::from(Serialized::defaults(Options::default()));
    if let Some(dir) = config_dir() {
        for extension in EXTENSIONS {
            let candidate = dir.join(FILE_STEM).with_extension(extension);
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "Found user configuration");
                figment = merge_file(figment, &candidate)?;
            }
        }
    }
    if let Some(path) = explicit {
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        figment = merge_file(figment, path)?;
    }
    figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&[MODE_KEY]));
    if let Some(raw) = env_var(MODE_KEY) {
        figment = figment.merge(Serialized::default(MODE_KEY, ModeOption::Octal(raw)));
    }
    Ok(figment)
}

/// Raw value of the prefixed variable for `key`, matched case-insensitively
/// like the rest of the environment.
fn env_var(key: &str) -> Option<String> {
    let name = format!("{ENV_PREFIX}{key}");
    std::env::vars_os().find_map(|(k, v)| {
        let matches = k.to_str().is_some_and(|k| k.eq_ignore_ascii_case(&name));
        if matches { v.into_string().ok().map(|v| v.trim().to_string()) } else { None }
    })
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}

/// Load the merged [`Options`] from files and the environment.
///
/// # Errors
/// - [`ErrorKind::NotFound`] if `explicit` does not exist.
/// - [`ErrorKind::UnsupportedFormat`] if a file has an unknown extension.
/// - [`ErrorKind::Parse`] if a source is malformed or holds a value of the
///   wrong type.
#[instrument(skip_all, fields(explicit = ?explicit))]
pub fn load(explicit: Option<&Path>) -> Result<Options> {
    figment(explicit)?.extract().or_raise(|| ErrorKind::Parse)
}

/// Load options, apply `overrides` on top of every other source, and validate
/// them into a [`Config`].
///
/// Unset fields of `overrides` leave the loaded value alone.
///
/// # Errors
/// Everything [`load`] returns, plus [`ErrorKind::Invalid`] (caused by the
/// filter's configuration error) when the merged options are rejected,
/// including when no base directory was given anywhere.
#[instrument(skip_all, fields(explicit = ?explicit))]
pub fn load_config(explicit: Option<&Path>, overrides: Options) -> Result<Config> {
    let options: Options = figment(explicit)?
        .merge(Serialized::defaults(overrides))
        .extract()
        .or_raise(|| ErrorKind::Parse)?;
    let config = Config::try_from(options).or_raise(|| ErrorKind::Invalid)?;
    tracing::debug!(
        base_dir = %config.base_dir().display(),
        directory_level = config.directory_level(),
        digest = %config.digest(),
        "Loaded configuration"
    );
    Ok(config)
}
