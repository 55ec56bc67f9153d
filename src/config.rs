use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::selection::ModifierKey;

const CONFIG_FILE: &str = "config.toml";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config {path}: {source}")]
	Io { path: String, source: std::io::Error },
	#[error("failed to parse config {path}: {source}")]
	TomlDecode { path: String, source: toml::de::Error },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
	seed: Option<PathBuf>,
	multi_select_key: Option<ModifierKey>,
	log_file: Option<PathBuf>,
	log_filter: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Overrides {
	pub seed: Option<PathBuf>,
	pub multi_select_key: Option<ModifierKey>,
	pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
	pub seed: Option<PathBuf>,
	pub multi_select_key: ModifierKey,
	pub log_file: Option<PathBuf>,
	pub log_filter: String,
}

impl Settings {
	pub fn resolve(overrides: Overrides) -> Result<Self, ConfigError> {
		let file = load_file_config(&config_dir().join(CONFIG_FILE))?;
		Ok(Self::layer(overrides, file, |name| env::var_os(name)))
	}

	fn layer(overrides: Overrides, file: FileConfig, env: impl Fn(&str) -> Option<OsString>) -> Self {
		Self {
			seed: overrides
				.seed
				.or_else(|| env_path(&env, "HOURGRID_SEED"))
				.or(file.seed),
			multi_select_key: overrides
				.multi_select_key
				.or(file.multi_select_key)
				.unwrap_or_default(),
			log_file: overrides
				.log_file
				.or_else(|| env_path(&env, "HOURGRID_LOG"))
				.or(file.log_file),
			log_filter: env("RUST_LOG")
				.and_then(|value| value.into_string().ok())
				.filter(|value| !value.trim().is_empty())
				.or(file.log_filter)
				.unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
		}
	}
}

fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
	let raw = match fs::read_to_string(path) {
		Ok(raw) => raw,
		Err(err) if err.kind() == ErrorKind::NotFound => return Ok(FileConfig::default()),
		Err(source) => {
			return Err(ConfigError::Io {
				path: path.display().to_string(),
				source,
			});
		}
	};

	toml::from_str(&raw).map_err(|source| ConfigError::TomlDecode {
		path: path.display().to_string(),
		source,
	})
}

fn env_path(env: impl Fn(&str) -> Option<OsString>, name: &str) -> Option<PathBuf> {
	let value = env(name)?;
	if value.is_empty() {
		None
	} else {
		Some(PathBuf::from(value))
	}
}

fn config_dir() -> PathBuf {
	if let Some(path) = env::var_os("HOURGRID_CONFIG_DIR") {
		return PathBuf::from(path);
	}

	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("APPDATA") {
			return PathBuf::from(path).join("hourgrid");
		}
	}

	if let Some(path) = env::var_os("XDG_CONFIG_HOME") {
		return PathBuf::from(path).join("hourgrid");
	}

	if let Some(path) = env::var_os("HOME") {
		return PathBuf::from(path).join(".config").join("hourgrid");
	}

	PathBuf::from(".hourgrid")
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;
	use std::ffi::OsString;
	use std::fs;
	use std::path::PathBuf;

	use crate::selection::ModifierKey;

	use super::{ConfigError, FileConfig, Overrides, Settings, load_file_config};

	fn no_env(_: &str) -> Option<OsString> {
		None
	}

	fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
		let vars: HashMap<String, OsString> = pairs
			.iter()
			.map(|(name, value)| (name.to_string(), OsString::from(value)))
			.collect();
		move |name| vars.get(name).cloned()
	}

	#[test]
	fn reads_config_file() {
		let dir = tempfile::tempdir().expect("temp dir");
		let path = dir.path().join("config.toml");
		fs::write(
			&path,
			"multi_select_key = \"control\"\nlog_file = \"/tmp/hourgrid.log\"\nlog_filter = \"debug\"\n",
		)
		.expect("write config");

		let file = load_file_config(&path).expect("config should parse");
		assert_eq!(file.multi_select_key, Some(ModifierKey::Control));
		assert_eq!(file.log_file, Some(PathBuf::from("/tmp/hourgrid.log")));
		assert_eq!(file.log_filter.as_deref(), Some("debug"));
	}

	#[test]
	fn missing_config_file_means_defaults() {
		let dir = tempfile::tempdir().expect("temp dir");
		let file = load_file_config(&dir.path().join("config.toml")).expect("defaults");
		assert!(file.seed.is_none());
		assert!(file.multi_select_key.is_none());
	}

	#[test]
	fn malformed_config_is_an_error() {
		let dir = tempfile::tempdir().expect("temp dir");
		let path = dir.path().join("config.toml");
		fs::write(&path, "multi_select_key = \"hyper\"\n").expect("write config");

		let err = load_file_config(&path).expect_err("unknown key name");
		assert!(matches!(err, ConfigError::TomlDecode { .. }));
	}

	#[test]
	fn cli_overrides_win_over_file() {
		let file = FileConfig {
			seed: Some(PathBuf::from("file-seed.toml")),
			multi_select_key: Some(ModifierKey::Alt),
			log_file: None,
			log_filter: None,
		};
		let overrides = Overrides {
			seed: Some(PathBuf::from("cli-seed.toml")),
			multi_select_key: Some(ModifierKey::Control),
			log_file: None,
		};

		let settings = Settings::layer(overrides, file, no_env);
		assert_eq!(settings.seed, Some(PathBuf::from("cli-seed.toml")));
		assert_eq!(settings.multi_select_key, ModifierKey::Control);
	}

	#[test]
	fn file_fills_in_missing_overrides() {
		let file = FileConfig {
			multi_select_key: Some(ModifierKey::Alt),
			..FileConfig::default()
		};

		let settings = Settings::layer(Overrides::default(), file, no_env);
		assert_eq!(settings.multi_select_key, ModifierKey::Alt);
	}

	#[test]
	fn env_wins_over_file() {
		let file = FileConfig {
			seed: Some(PathBuf::from("file-seed.toml")),
			multi_select_key: None,
			log_file: Some(PathBuf::from("file.log")),
			log_filter: Some("warn".to_string()),
		};
		let env = env_from(&[
			("HOURGRID_SEED", "env-seed.toml"),
			("HOURGRID_LOG", "env.log"),
			("RUST_LOG", "hourgrid=debug"),
		]);

		let settings = Settings::layer(Overrides::default(), file, env);
		assert_eq!(settings.seed, Some(PathBuf::from("env-seed.toml")));
		assert_eq!(settings.log_file, Some(PathBuf::from("env.log")));
		assert_eq!(settings.log_filter, "hourgrid=debug");
	}

	#[test]
	fn cli_wins_over_env() {
		let overrides = Overrides {
			seed: Some(PathBuf::from("cli-seed.toml")),
			multi_select_key: None,
			log_file: Some(PathBuf::from("cli.log")),
		};
		let env = env_from(&[("HOURGRID_SEED", "env-seed.toml"), ("HOURGRID_LOG", "env.log")]);

		let settings = Settings::layer(overrides, FileConfig::default(), env);
		assert_eq!(settings.seed, Some(PathBuf::from("cli-seed.toml")));
		assert_eq!(settings.log_file, Some(PathBuf::from("cli.log")));
	}

	#[test]
	fn blank_env_values_fall_through() {
		let file = FileConfig {
			seed: Some(PathBuf::from("file-seed.toml")),
			log_filter: Some("warn".to_string()),
			..FileConfig::default()
		};
		let env = env_from(&[("HOURGRID_SEED", ""), ("RUST_LOG", "  ")]);

		let settings = Settings::layer(Overrides::default(), file, env);
		assert_eq!(settings.seed, Some(PathBuf::from("file-seed.toml")));
		assert_eq!(settings.log_filter, "warn");
		assert_eq!(settings.multi_select_key, ModifierKey::Shift);
	}

	#[test]
	fn defaults_apply_when_nothing_is_set() {
		let settings = Settings::layer(Overrides::default(), FileConfig::default(), no_env);
		assert_eq!(settings.seed, None);
		assert_eq!(settings.log_file, None);
		assert_eq!(settings.log_filter, "info");
	}
}
