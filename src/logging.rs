use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

use crate::config::Settings;

#[derive(Debug, Error)]
pub enum LoggingError {
	#[error("invalid log filter {filter:?}: {source}")]
	InvalidFilter { filter: String, source: ParseError },
	#[error("failed to open log file: {0}")]
	Io(#[from] io::Error),
	#[error("failed to install log subscriber: {0}")]
	Init(String),
}

/// Logs go to the configured file; the dashboard owns the terminal otherwise.
pub fn init_logging(settings: &Settings) -> Result<(), LoggingError> {
	let filter = EnvFilter::try_new(&settings.log_filter).map_err(|source| LoggingError::InvalidFilter {
		filter: settings.log_filter.clone(),
		source,
	})?;

	let installed = match &settings.log_file {
		Some(path) => {
			if let Some(parent) = path.parent() {
				if !parent.as_os_str().is_empty() {
					std::fs::create_dir_all(parent)?;
				}
			}
			let file = OpenOptions::new().create(true).append(true).open(path)?;
			tracing_subscriber::fmt()
				.with_env_filter(filter)
				.with_ansi(false)
				.with_writer(Mutex::new(file))
				.try_init()
		}
		None => tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_writer(io::sink)
			.try_init(),
	};

	installed.map_err(|err| LoggingError::Init(err.to_string()))
}
