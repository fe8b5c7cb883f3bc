//! Duty timeline records and pure timeline rules.
//!
//! # Responsibility
//! - Define `Duty` (one assignment interval) and `CareerStatus` (the
//!   derived per-person summary).
//! - Own the retirement sentinel and the one-day-before closing rule.
//!
//! # Invariants
//! - A duty's `end_date` is set exactly once, when a later duty begins.
//! - `CareerStatus::career_start` never changes after the first duty.
//! - Dates are timezone-naive calendar dates; no time component exists.

use crate::model::person::PersonId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for one duty record.
pub type DutyId = Uuid;

/// Title value that marks the end of a career rather than a new active
/// duty. Matched by exact, case-sensitive equality.
pub const RETIRED_TITLE: &str = "RETIRED";

/// One assignment interval in a person's duty history.
///
/// `end_date == None` marks the open (currently active) duty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duty {
    /// Stable global ID.
    pub id: DutyId,
    /// Owning person.
    pub person_id: PersonId,
    /// Rank held during this duty. Free text.
    pub rank: String,
    /// Duty title. Free text; `RETIRED_TITLE` ends the career.
    pub title: String,
    /// First day of the duty, inclusive.
    pub start_date: NaiveDate,
    /// Last day of the duty, inclusive. `None` while the duty is active.
    pub end_date: Option<NaiveDate>,
}

impl Duty {
    /// Creates a new open duty with a generated stable ID.
    pub fn new(
        person_id: PersonId,
        rank: impl Into<String>,
        title: impl Into<String>,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            person_id,
            rank: rank.into(),
            title: title.into(),
            start_date,
            end_date: None,
        }
    }

    /// Returns whether this duty is the person's currently active one.
    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }

    /// Returns whether this duty ends the person's career.
    pub fn is_retirement(&self) -> bool {
        self.title == RETIRED_TITLE
    }
}

/// Derived per-person career summary.
///
/// Created lazily on the first duty, updated on every later one, never
/// deleted. `career_start`/`career_end` bound the whole career, not any
/// single duty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareerStatus {
    /// Owning person. One status row per person.
    pub person_id: PersonId,
    /// Rank of the most recent duty.
    pub current_rank: String,
    /// Title of the most recent duty.
    pub current_title: String,
    /// Start date of the first-ever duty. Immutable after first write.
    pub career_start: NaiveDate,
    /// Day before the newest retirement duty began. `None` while active.
    pub career_end: Option<NaiveDate>,
}

impl CareerStatus {
    /// Derives the initial status from a person's first duty.
    pub fn begin(
        person_id: PersonId,
        rank: impl Into<String>,
        title: impl Into<String>,
        start_date: NaiveDate,
    ) -> Self {
        let title = title.into();
        let career_end = retirement_end(&title, start_date);
        Self {
            person_id,
            current_rank: rank.into(),
            current_title: title,
            career_start: start_date,
            career_end,
        }
    }

    /// Folds one more duty into the summary.
    ///
    /// # Invariants
    /// - `career_start` is untouched.
    /// - A retirement duty overwrites `career_end`; any other title leaves
    ///   a previously set `career_end` unchanged.
    pub fn record(&mut self, rank: impl Into<String>, title: impl Into<String>, start_date: NaiveDate) {
        let title = title.into();
        if let Some(end) = retirement_end(&title, start_date) {
            self.career_end = Some(end);
        }
        self.current_rank = rank.into();
        self.current_title = title;
    }
}

/// Proposed duty input, as supplied by callers before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyRequest {
    /// Display name of the person the duty belongs to.
    pub person_name: String,
    /// Rank held for the new duty.
    pub rank: String,
    /// Title of the new duty.
    pub title: String,
    /// First day of the new duty, inclusive.
    pub start_date: NaiveDate,
}

/// Field-level rejection for a `DutyRequest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DutyRequestError {
    MissingPersonName,
    MissingRank,
    MissingTitle,
}

impl Display for DutyRequestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPersonName => write!(f, "person name cannot be empty"),
            Self::MissingRank => write!(f, "rank cannot be empty"),
            Self::MissingTitle => write!(f, "duty title cannot be empty"),
        }
    }
}

impl Error for DutyRequestError {}

impl DutyRequest {
    /// Checks that no required field is empty or blank.
    pub fn validate(&self) -> Result<(), DutyRequestError> {
        if self.person_name.trim().is_empty() {
            return Err(DutyRequestError::MissingPersonName);
        }
        if self.rank.trim().is_empty() {
            return Err(DutyRequestError::MissingRank);
        }
        if self.title.trim().is_empty() {
            return Err(DutyRequestError::MissingTitle);
        }
        Ok(())
    }
}

/// Returns the calendar day before `date`.
///
/// `NaiveDate::MIN` has no predecessor; it is returned unchanged rather
/// than wrapping.
pub fn day_before(date: NaiveDate) -> NaiveDate {
    date.pred_opt().unwrap_or(NaiveDate::MIN)
}

fn retirement_end(title: &str, start_date: NaiveDate) -> Option<NaiveDate> {
    if title == RETIRED_TITLE {
        Some(day_before(start_date))
    } else {
        None
    }
}
