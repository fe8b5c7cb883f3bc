//! Duty timeline use-cases: validate, record, read back.
//!
//! # Responsibility
//! - Check a proposed duty for admissibility before any mutation.
//! - Apply accepted duties through the repository's transactional write.
//! - Reconstruct a person's ordered history with their career status.
//!
//! # Invariants
//! - The validator is read-only; rejections leave no trace in storage.
//! - The mutator never rejects out-of-order start dates; it always closes
//!   the open duty one day before the new start.
//! - History is returned most recent first.

use crate::model::duty::{CareerStatus, Duty, DutyId, DutyRequest, DutyRequestError};
use crate::model::person::Person;
use crate::repo::audit_log::AuditSink;
use crate::repo::duty_repo::DutyRepository;
use crate::repo::RepoError;
use chrono::NaiveDate;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ACTION_CREATE_DUTY: &str = "create_duty";
const ACTION_DUTY_HISTORY: &str = "duty_history";

/// Service error for duty timeline use-cases.
#[derive(Debug)]
pub enum DutyError {
    /// A required request field is empty or blank.
    Invalid(DutyRequestError),
    /// The referenced person does not exist (write path).
    PersonNotFound(String),
    /// The person already has a duty with this title and start date.
    DuplicateDuty {
        title: String,
        start_date: NaiveDate,
    },
    /// The requested person does not exist (read path).
    NotFound(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl DutyError {
    /// Returns whether the caller can fix this error by changing input,
    /// as opposed to an infrastructure fault.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, Self::Repo(_))
    }
}

impl Display for DutyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "{err}"),
            Self::PersonNotFound(name) => write!(f, "person with name '{name}' not found"),
            Self::DuplicateDuty { title, start_date } => write!(
                f,
                "duty '{title}' with start date {start_date} already exists"
            ),
            Self::NotFound(name) => write!(f, "person with name '{name}' not found"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DutyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DutyRequestError> for DutyError {
    fn from(value: DutyRequestError) -> Self {
        Self::Invalid(value)
    }
}

impl From<RepoError> for DutyError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// A person's full timeline: identity, derived status, ordered history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DutyHistory {
    pub person: Person,
    /// `None` means the person has no duties yet; not an error.
    pub status: Option<CareerStatus>,
    /// Sorted by start date descending.
    pub duties: Vec<Duty>,
}

/// Duty timeline service over a repository and an audit sink.
pub struct DutyService<R: DutyRepository, A: AuditSink> {
    repo: R,
    audit: A,
}

impl<R: DutyRepository, A: AuditSink> DutyService<R, A> {
    pub fn new(repo: R, audit: A) -> Self {
        Self { repo, audit }
    }

    /// Checks a proposed duty for admissibility. Read-only.
    ///
    /// Returns the resolved person so the mutator does not look it up
    /// twice. Deliberately performs no chronological check against the
    /// open duty; the mutator closes it regardless of ordering.
    pub fn validate(&self, request: &DutyRequest) -> Result<Person, DutyError> {
        request.validate()?;

        let person = self
            .repo
            .find_person_by_name(&request.person_name)?
            .ok_or_else(|| DutyError::PersonNotFound(request.person_name.clone()))?;

        if self
            .repo
            .duty_exists(person.id, &request.title, request.start_date)?
        {
            return Err(DutyError::DuplicateDuty {
                title: request.title.clone(),
                start_date: request.start_date,
            });
        }

        Ok(person)
    }

    /// Validates and applies a proposed duty, returning the new duty's ID.
    ///
    /// # Contract
    /// - The career status is created on the first duty and updated on
    ///   every later one; `career_start` is never overwritten.
    /// - A previously open duty is closed one day before the new start.
    /// - All writes commit as one unit or not at all.
    pub fn create_duty(&self, request: &DutyRequest) -> Result<DutyId, DutyError> {
        let outcome = self.validate(request).and_then(|person| {
            self.repo
                .record_duty(&person, &request.rank, &request.title, request.start_date)
                .map_err(DutyError::from)
        });

        match &outcome {
            Ok(duty_id) => {
                info!(
                    "event=duty_create module=duty_service status=ok duty_id={duty_id} start_date={}",
                    request.start_date
                );
                self.audit_success(
                    ACTION_CREATE_DUTY,
                    &format!(
                        "duty '{}' recorded for '{}' starting {}",
                        request.title, request.person_name, request.start_date
                    ),
                    Some(&request.person_name),
                );
            }
            Err(err) if err.is_caller_error() => {
                error!("event=duty_create module=duty_service status=rejected reason={err}");
                self.audit_failure(ACTION_CREATE_DUTY, &err.to_string(), Some(&request.person_name));
            }
            Err(err) => {
                error!("event=duty_create module=duty_service status=error error={err:?}");
                self.audit_exception(ACTION_CREATE_DUTY, err, Some(&request.person_name));
            }
        }

        outcome
    }

    /// Returns the person's identity, career status, and ordered history.
    ///
    /// Pure read; absence of a status only means no duties exist yet.
    pub fn duty_history(&self, name: &str) -> Result<DutyHistory, DutyError> {
        let outcome = self.duty_history_inner(name);

        if let Err(err) = &outcome {
            if err.is_caller_error() {
                error!("event=duty_history module=duty_service status=rejected reason={err}");
            } else {
                error!("event=duty_history module=duty_service status=error error={err:?}");
                self.audit_exception(ACTION_DUTY_HISTORY, err, Some(name));
            }
        }

        outcome
    }

    fn duty_history_inner(&self, name: &str) -> Result<DutyHistory, DutyError> {
        let person = self
            .repo
            .find_person_by_name(name)?
            .ok_or_else(|| DutyError::NotFound(name.to_string()))?;

        let status = self.repo.get_status(person.id)?;
        let duties = self.repo.list_duties(person.id)?;

        Ok(DutyHistory {
            person,
            status,
            duties,
        })
    }

    fn audit_success(&self, action: &str, message: &str, person_name: Option<&str>) {
        if let Err(err) = self.audit.record_success(action, message, person_name) {
            warn!("event=audit_append module=duty_service status=error action={action} error={err}");
        }
    }

    fn audit_failure(&self, action: &str, message: &str, person_name: Option<&str>) {
        if let Err(err) = self.audit.record_failure(action, message, person_name) {
            warn!("event=audit_append module=duty_service status=error action={action} error={err}");
        }
    }

    fn audit_exception(&self, action: &str, error: &DutyError, person_name: Option<&str>) {
        if let Err(err) = self.audit.record_exception(action, error, person_name) {
            warn!("event=audit_append module=duty_service status=error action={action} error={err}");
        }
    }
}
