//! Person registry use-cases: create, rename, look up, list.
//!
//! # Responsibility
//! - Guarantee display-name uniqueness before any person write.
//! - Shape person + career status records for read callers.
//!
//! # Invariants
//! - A person's ID is stable across renames; duties and status follow it.
//! - Renaming a person to their current name is a no-op success.

use crate::model::person::{Person, PersonId};
use crate::repo::audit_log::AuditSink;
use crate::repo::person_repo::{PersonRecord, PersonRepository};
use crate::repo::RepoError;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ACTION_CREATE_PERSON: &str = "create_person";
const ACTION_RENAME_PERSON: &str = "rename_person";
const ACTION_GET_PERSON: &str = "get_person";
const ACTION_LIST_PEOPLE: &str = "list_people";

/// Service error for person registry use-cases.
#[derive(Debug)]
pub enum PersonError {
    /// The supplied name is empty or blank.
    MissingName,
    /// Another person already carries this name.
    DuplicateName(String),
    /// No person with this name exists.
    NotFound(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl PersonError {
    /// Returns whether the caller can fix this error by changing input.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, Self::Repo(_))
    }
}

impl Display for PersonError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "name cannot be empty"),
            Self::DuplicateName(name) => {
                write!(f, "person with name '{name}' already exists")
            }
            Self::NotFound(name) => write!(f, "person with name '{name}' not found"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PersonError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PersonError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Person registry service over a repository and an audit sink.
pub struct PersonService<R: PersonRepository, A: AuditSink> {
    repo: R,
    audit: A,
}

impl<R: PersonRepository, A: AuditSink> PersonService<R, A> {
    pub fn new(repo: R, audit: A) -> Self {
        Self { repo, audit }
    }

    /// Registers a new person under a unique display name.
    pub fn create_person(&self, name: &str) -> Result<PersonId, PersonError> {
        let outcome = self.create_person_inner(name);

        match &outcome {
            Ok(id) => {
                info!("event=person_create module=person_service status=ok person_id={id}");
                self.audit_success(
                    ACTION_CREATE_PERSON,
                    &format!("person '{name}' created with id {id}"),
                    Some(name),
                );
            }
            Err(err) if err.is_caller_error() => {
                error!("event=person_create module=person_service status=rejected reason={err}");
                self.audit_failure(ACTION_CREATE_PERSON, &err.to_string(), Some(name));
            }
            Err(err) => {
                error!("event=person_create module=person_service status=error error={err:?}");
                self.audit_exception(ACTION_CREATE_PERSON, err, Some(name));
            }
        }

        outcome
    }

    fn create_person_inner(&self, name: &str) -> Result<PersonId, PersonError> {
        if name.trim().is_empty() {
            return Err(PersonError::MissingName);
        }

        if self.repo.find_by_name(name)?.is_some() {
            return Err(PersonError::DuplicateName(name.to_string()));
        }

        let person = Person::new(name);
        Ok(self.repo.create_person(&person)?)
    }

    /// Changes a person's display name, keeping their ID and timeline.
    pub fn rename_person(&self, current_name: &str, new_name: &str) -> Result<PersonId, PersonError> {
        let outcome = self.rename_person_inner(current_name, new_name);

        match &outcome {
            Ok(id) => {
                info!("event=person_rename module=person_service status=ok person_id={id}");
                self.audit_success(
                    ACTION_RENAME_PERSON,
                    &format!("person renamed from '{current_name}' to '{new_name}'"),
                    Some(new_name),
                );
            }
            Err(err) if err.is_caller_error() => {
                error!("event=person_rename module=person_service status=rejected reason={err}");
                self.audit_failure(ACTION_RENAME_PERSON, &err.to_string(), Some(current_name));
            }
            Err(err) => {
                error!("event=person_rename module=person_service status=error error={err:?}");
                self.audit_exception(ACTION_RENAME_PERSON, err, Some(current_name));
            }
        }

        outcome
    }

    fn rename_person_inner(
        &self,
        current_name: &str,
        new_name: &str,
    ) -> Result<PersonId, PersonError> {
        if new_name.trim().is_empty() {
            return Err(PersonError::MissingName);
        }

        let person = self
            .repo
            .find_by_name(current_name)?
            .ok_or_else(|| PersonError::NotFound(current_name.to_string()))?;

        if current_name == new_name {
            return Ok(person.id);
        }

        if self.repo.find_by_name(new_name)?.is_some() {
            return Err(PersonError::DuplicateName(new_name.to_string()));
        }

        self.repo.rename_person(person.id, new_name)?;
        Ok(person.id)
    }

    /// Returns one person with their career status.
    pub fn get_person(&self, name: &str) -> Result<PersonRecord, PersonError> {
        let outcome = self
            .repo
            .get_record(name)
            .map_err(PersonError::from)
            .and_then(|record| record.ok_or_else(|| PersonError::NotFound(name.to_string())));

        if let Err(err) = &outcome {
            if !err.is_caller_error() {
                error!("event=person_get module=person_service status=error error={err:?}");
                self.audit_exception(ACTION_GET_PERSON, err, Some(name));
            }
        }

        outcome
    }

    /// Returns all people with their career status, ordered by name.
    pub fn list_people(&self) -> Result<Vec<PersonRecord>, PersonError> {
        let outcome = self.repo.list_records().map_err(PersonError::from);

        if let Err(err) = &outcome {
            error!("event=person_list module=person_service status=error error={err:?}");
            self.audit_exception(ACTION_LIST_PEOPLE, err, None);
        }

        outcome
    }

    fn audit_success(&self, action: &str, message: &str, person_name: Option<&str>) {
        if let Err(err) = self.audit.record_success(action, message, person_name) {
            warn!(
                "event=audit_append module=person_service status=error action={action} error={err}"
            );
        }
    }

    fn audit_failure(&self, action: &str, message: &str, person_name: Option<&str>) {
        if let Err(err) = self.audit.record_failure(action, message, person_name) {
            warn!(
                "event=audit_append module=person_service status=error action={action} error={err}"
            );
        }
    }

    fn audit_exception(&self, action: &str, error: &PersonError, person_name: Option<&str>) {
        if let Err(err) = self.audit.record_exception(action, error, person_name) {
            warn!(
                "event=audit_append module=person_service status=error action={action} error={err}"
            );
        }
    }
}
