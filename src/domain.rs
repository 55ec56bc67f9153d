use std::fmt::{Display, Formatter};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SLOTS_PER_DAY: usize = 24;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("slot sequence must have {expected} entries, got {actual}")]
    InvalidSequenceLength { expected: usize, actual: usize },
    #[error("day {0} is not part of this week")]
    UnknownDayIdentity(DayId),
    #[error("no day at position {0}")]
    DayIndexOutOfRange(usize),
    #[error("day {0} appears more than once")]
    DuplicateDay(DayId),
    #[error("a week needs at least one day")]
    EmptyWeek,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SlotStatus {
    #[default]
    Rest,
    Work,
    NonCompliant,
}

impl SlotStatus {
    pub const ALL: [SlotStatus; 3] = [SlotStatus::Work, SlotStatus::Rest, SlotStatus::NonCompliant];

    pub fn label(self) -> &'static str {
        match self {
            SlotStatus::Rest => "Rest",
            SlotStatus::Work => "Work",
            SlotStatus::NonCompliant => "NC",
        }
    }

    pub fn code(self) -> u8 {
        match self {
            SlotStatus::Rest => 0,
            SlotStatus::Work => 1,
            SlotStatus::NonCompliant => 2,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown slot status code {0} (expected 0 = rest, 1 = work, 2 = nc)")]
pub struct InvalidStatusCode(pub u8);

impl TryFrom<u8> for SlotStatus {
    type Error = InvalidStatusCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(SlotStatus::Rest),
            1 => Ok(SlotStatus::Work),
            2 => Ok(SlotStatus::NonCompliant),
            other => Err(InvalidStatusCode(other)),
        }
    }
}

impl From<SlotStatus> for u8 {
    fn from(status: SlotStatus) -> Self {
        status.code()
    }
}

/// Statuses for one day, indexed by hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotSequence([SlotStatus; SLOTS_PER_DAY]);

impl SlotSequence {
    #[cfg(test)]
    pub fn filled(status: SlotStatus) -> Self {
        Self([status; SLOTS_PER_DAY])
    }

    pub fn as_slice(&self) -> &[SlotStatus] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = SlotStatus> + '_ {
        self.0.iter().copied()
    }

    /// Copy of this sequence with every listed hour set to `status`.
    /// Hours outside the day are skipped.
    pub fn with_status<I>(&self, hours: I, status: SlotStatus) -> Vec<SlotStatus>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut slots = self.0.to_vec();
        for hour in hours {
            if let Some(slot) = slots.get_mut(hour) {
                *slot = status;
            }
        }
        slots
    }
}

impl TryFrom<&[SlotStatus]> for SlotSequence {
    type Error = ScheduleError;

    fn try_from(slots: &[SlotStatus]) -> Result<Self, Self::Error> {
        let array: [SlotStatus; SLOTS_PER_DAY] =
            slots
                .try_into()
                .map_err(|_| ScheduleError::InvalidSequenceLength {
                    expected: SLOTS_PER_DAY,
                    actual: slots.len(),
                })?;
        Ok(Self(array))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HourTotals {
    pub work: usize,
    pub rest: usize,
    pub non_compliant: usize,
}

impl HourTotals {
    pub fn total(&self) -> usize {
        self.work + self.rest + self.non_compliant
    }
}

impl std::ops::Add for HourTotals {
    type Output = HourTotals;

    fn add(self, other: HourTotals) -> HourTotals {
        HourTotals {
            work: self.work + other.work,
            rest: self.rest + other.rest,
            non_compliant: self.non_compliant + other.non_compliant,
        }
    }
}

pub fn aggregate(slots: &SlotSequence) -> HourTotals {
    slots
        .iter()
        .fold(HourTotals::default(), |mut totals, status| {
            match status {
                SlotStatus::Rest => totals.rest += 1,
                SlotStatus::Work => totals.work += 1,
                SlotStatus::NonCompliant => totals.non_compliant += 1,
            }
            totals
        })
}

/// Day-of-month, unique within one week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DayId(pub u32);

impl Display for DayId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRecord {
    date: NaiveDate,
    slots: SlotSequence,
    totals: HourTotals,
}

impl DayRecord {
    pub fn new(date: NaiveDate, slots: SlotSequence) -> Self {
        Self {
            date,
            totals: aggregate(&slots),
            slots,
        }
    }

    pub fn id(&self) -> DayId {
        DayId(self.date.day())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn month_label(&self) -> String {
        self.date.format("%B").to_string()
    }

    pub fn weekday_label(&self) -> String {
        self.date.format("%A").to_string()
    }

    pub fn slots(&self) -> &SlotSequence {
        &self.slots
    }

    pub fn totals(&self) -> HourTotals {
        self.totals
    }

    fn with_slots(&self, slots: SlotSequence) -> Self {
        Self::new(self.date, slots)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekStore {
    days: Vec<DayRecord>,
}

impl WeekStore {
    pub fn new(mut days: Vec<DayRecord>) -> Result<Self, ScheduleError> {
        if days.is_empty() {
            return Err(ScheduleError::EmptyWeek);
        }

        days.sort_by_key(|day| day.date);
        for (index, day) in days.iter().enumerate() {
            if days[..index].iter().any(|other| other.id() == day.id()) {
                return Err(ScheduleError::DuplicateDay(day.id()));
            }
        }

        Ok(Self { days })
    }

    pub fn days(&self) -> &[DayRecord] {
        &self.days
    }

    pub fn day(&self, index: usize) -> Option<&DayRecord> {
        self.days.get(index)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn get_day(&self, id: DayId) -> Result<usize, ScheduleError> {
        self.days
            .iter()
            .position(|day| day.id() == id)
            .ok_or(ScheduleError::UnknownDayIdentity(id))
    }

    /// Replaces the slots of the day at `index` and refreshes its totals.
    /// This is the only way slots change after seeding.
    pub fn replace_slots(
        &mut self,
        index: usize,
        slots: &[SlotStatus],
    ) -> Result<&DayRecord, ScheduleError> {
        let slots = SlotSequence::try_from(slots)?;
        let record = self
            .days
            .get_mut(index)
            .ok_or(ScheduleError::DayIndexOutOfRange(index))?;
        *record = record.with_slots(slots);
        Ok(record)
    }

    pub fn week_totals(&self) -> HourTotals {
        self.days
            .iter()
            .fold(HourTotals::default(), |acc, day| acc + day.totals())
    }
}
