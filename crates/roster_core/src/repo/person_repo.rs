//! Person registry repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide person create/rename/lookup persistence on top of `person`.
//! - Shape the person + career status read model used by list/detail
//!   use-cases.
//!
//! # Invariants
//! - `person.name` is unique; collisions are pre-checked by the service
//!   and backstopped by the schema's unique index.
//! - Read models join `career_status` without requiring it to exist.

use crate::model::duty::CareerStatus;
use crate::model::person::{Person, PersonId};
use crate::repo::duty_repo::find_person_by_name;
use crate::repo::{ensure_connection_ready, parse_date, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const PERSON_RECORD_SELECT_SQL: &str = "SELECT
    p.uuid,
    p.name,
    s.current_rank,
    s.current_title,
    s.career_start,
    s.career_end
FROM person p
LEFT JOIN career_status s ON s.person_uuid = p.uuid";

const REQUIRED_TABLES: &[(&str, &[&str])] = &[
    ("person", &["uuid", "name"]),
    (
        "career_status",
        &[
            "person_uuid",
            "current_rank",
            "current_title",
            "career_start",
            "career_end",
        ],
    ),
];

/// Read model for person list/detail use-cases: the identity row plus the
/// derived career status, when one exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
    pub person: Person,
    /// `None` until the person's first duty is recorded.
    pub status: Option<CareerStatus>,
}

/// Repository interface for person registry operations.
pub trait PersonRepository {
    /// Persists a new person row.
    fn create_person(&self, person: &Person) -> RepoResult<PersonId>;
    /// Changes a person's display name. The ID is stable across renames.
    fn rename_person(&self, id: PersonId, new_name: &str) -> RepoResult<()>;
    /// Resolves a person by display name.
    fn find_by_name(&self, name: &str) -> RepoResult<Option<Person>>;
    /// Returns one person with their career status, if the name exists.
    fn get_record(&self, name: &str) -> RepoResult<Option<PersonRecord>>;
    /// Returns all people with their career status, ordered by name.
    fn list_records(&self) -> RepoResult<Vec<PersonRecord>>;
}

/// SQLite-backed person registry repository.
pub struct SqlitePersonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl PersonRepository for SqlitePersonRepository<'_> {
    fn create_person(&self, person: &Person) -> RepoResult<PersonId> {
        self.conn.execute(
            "INSERT INTO person (uuid, name) VALUES (?1, ?2);",
            params![person.id.to_string(), person.name.as_str()],
        )?;

        Ok(person.id)
    }

    fn rename_person(&self, id: PersonId, new_name: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE person SET name = ?2 WHERE uuid = ?1;",
            params![id.to_string(), new_name],
        )?;

        if changed == 0 {
            return Err(RepoError::PersonNotFound(id));
        }

        Ok(())
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Person>> {
        find_person_by_name(self.conn, name)
    }

    fn get_record(&self, name: &str) -> RepoResult<Option<PersonRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PERSON_RECORD_SELECT_SQL} WHERE p.name = ?1;"))?;

        let mut rows = stmt.query([name])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_person_record_row(row)?));
        }

        Ok(None)
    }

    fn list_records(&self) -> RepoResult<Vec<PersonRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PERSON_RECORD_SELECT_SQL} ORDER BY p.name ASC;"))?;

        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_person_record_row(row)?);
        }

        Ok(records)
    }
}

fn parse_person_record_row(row: &Row<'_>) -> RepoResult<PersonRecord> {
    let uuid_text: String = row.get("uuid")?;
    let person_id = parse_uuid(&uuid_text, "person.uuid")?;
    let person = Person::with_id(person_id, row.get::<_, String>("name")?);

    // A row from the LEFT JOIN either carries a full status or none of it.
    let current_rank: Option<String> = row.get("current_rank")?;
    let status = match current_rank {
        Some(current_rank) => {
            let start_text: String = row.get("career_start")?;
            let end_text: Option<String> = row.get("career_end")?;
            let career_end = match end_text {
                Some(value) => Some(parse_date(&value, "career_status.career_end")?),
                None => None,
            };
            Some(CareerStatus {
                person_id,
                current_rank,
                current_title: row.get("current_title")?,
                career_start: parse_date(&start_text, "career_status.career_start")?,
                career_end,
            })
        }
        None => None,
    };

    Ok(PersonRecord { person, status })
}
