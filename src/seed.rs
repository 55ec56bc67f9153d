use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::domain::{DayRecord, ScheduleError, SlotSequence, SlotStatus, WeekStore};

const BUILTIN_SEED: &str = r#"
[[days]]
date = "2025-04-14"
slots = [0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0]

[[days]]
date = "2025-04-15"
slots = [0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0]

[[days]]
date = "2025-04-16"
slots = [0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 0, 0, 0, 0, 0]
"#;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse seed: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("failed to encode seed: {0}")]
    TomlEncode(#[from] toml::ser::Error),
    #[error("invalid seed for {date}: {source}")]
    InvalidDay {
        date: NaiveDate,
        source: ScheduleError,
    },
    #[error("invalid seed: {0}")]
    InvalidWeek(#[from] ScheduleError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedFile {
    pub days: Vec<SeedDay>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedDay {
    pub date: NaiveDate,
    pub slots: Vec<SlotStatus>,
}

impl SeedFile {
    pub fn into_week(self) -> Result<WeekStore, SeedError> {
        let mut days = Vec::with_capacity(self.days.len());
        for day in self.days {
            let slots = SlotSequence::try_from(day.slots.as_slice()).map_err(|source| {
                SeedError::InvalidDay {
                    date: day.date,
                    source,
                }
            })?;
            days.push(DayRecord::new(day.date, slots));
        }
        Ok(WeekStore::new(days)?)
    }

    pub fn from_week(week: &WeekStore) -> Self {
        Self {
            days: week
                .days()
                .iter()
                .map(|day| SeedDay {
                    date: day.date(),
                    slots: day.slots().as_slice().to_vec(),
                })
                .collect(),
        }
    }
}

pub fn parse_seed(raw: &str) -> Result<WeekStore, SeedError> {
    let seed: SeedFile = toml::from_str(raw)?;
    seed.into_week()
}

pub fn builtin_week() -> Result<WeekStore, SeedError> {
    parse_seed(BUILTIN_SEED)
}

/// Loads the week from `path`, or the built-in week when no path is given.
pub fn load_week(path: Option<&Path>) -> Result<WeekStore, SeedError> {
    let Some(path) = path else {
        info!("using built-in seed");
        return builtin_week();
    };

    let raw = fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let week = parse_seed(&raw)?;
    info!(path = %path.display(), days = week.len(), "loaded seed");
    Ok(week)
}

pub fn render_seed(week: &WeekStore) -> Result<String, SeedError> {
    Ok(toml::to_string_pretty(&SeedFile::from_week(week))?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::domain::{DayId, ScheduleError};

    use super::{SeedError, builtin_week, load_week, parse_seed, render_seed};

    #[test]
    fn builtin_seed_matches_stored_totals() {
        let week = builtin_week().expect("builtin seed should parse");
        let totals = week
            .days()
            .iter()
            .map(|day| {
                let totals = day.totals();
                (day.id().0, totals.work, totals.rest, totals.non_compliant)
            })
            .collect::<Vec<_>>();
        assert_eq!(totals, vec![(14, 9, 15, 0), (15, 10, 14, 0), (16, 10, 12, 2)]);
        assert_eq!(week.days()[2].weekday_label(), "Wednesday");
    }

    #[test]
    fn rejects_unknown_status_codes() {
        let raw = format!(
            "[[days]]\ndate = \"2025-04-14\"\nslots = [{}]\n",
            ["3"; 24].join(", ")
        );
        let err = parse_seed(&raw).expect_err("code 3 is not a status");
        assert!(matches!(err, SeedError::TomlDecode(_)), "{err}");
    }

    #[test]
    fn rejects_short_days() {
        let raw = "[[days]]\ndate = \"2025-04-14\"\nslots = [0, 1, 2]\n";
        let err = parse_seed(raw).expect_err("three slots is not a day");
        assert!(matches!(
            err,
            SeedError::InvalidDay {
                source: ScheduleError::InvalidSequenceLength { actual: 3, .. },
                ..
            }
        ));
    }

    #[test]
    fn rejects_duplicate_days() {
        let slots = ["0"; 24].join(", ");
        let raw = format!(
            "[[days]]\ndate = \"2025-04-14\"\nslots = [{slots}]\n\n[[days]]\ndate = \"2025-05-14\"\nslots = [{slots}]\n"
        );
        let err = parse_seed(&raw).expect_err("same day of month twice");
        assert!(matches!(
            err,
            SeedError::InvalidWeek(ScheduleError::DuplicateDay(DayId(14)))
        ));
    }

    #[test]
    fn loads_rendered_seed_from_disk() {
        let week = builtin_week().expect("builtin seed");
        let rendered = render_seed(&week).expect("render");

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(rendered.as_bytes()).expect("write seed");
        let loaded = load_week(Some(file.path())).expect("load");
        assert_eq!(loaded, week);
    }

    #[test]
    fn missing_seed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = load_week(Some(&dir.path().join("absent.toml"))).expect_err("missing file");
        assert!(matches!(err, SeedError::Io { .. }));
    }
}
