//! Duty timeline repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the storage operations the duty services run on: person
//!   lookup, duplicate probe, open-duty lookup, status read, ordered
//!   history, and the transactional timeline write.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - `record_duty` applies close-previous, status upsert, and insert-new
//!   as one transaction; partial writes are never visible.
//! - Per person, at most one duty row has `end_date IS NULL` (also
//!   enforced by a partial unique index in the schema).
//! - History reads are ordered by `start_date DESC`.

use crate::model::duty::{day_before, CareerStatus, Duty, DutyId};
use crate::model::person::{Person, PersonId};
use crate::repo::{ensure_connection_ready, parse_date, parse_uuid, RepoResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

const DUTY_SELECT_SQL: &str = "SELECT
    uuid,
    person_uuid,
    rank,
    title,
    start_date,
    end_date
FROM duty";

const REQUIRED_TABLES: &[(&str, &[&str])] = &[
    ("person", &["uuid", "name"]),
    (
        "duty",
        &["uuid", "person_uuid", "rank", "title", "start_date", "end_date"],
    ),
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

/// Repository interface for duty timeline operations.
pub trait DutyRepository {
    /// Resolves a person by display name.
    fn find_person_by_name(&self, name: &str) -> RepoResult<Option<Person>>;
    /// Returns whether the person already has a duty with this exact
    /// title and start date.
    fn duty_exists(&self, person_id: PersonId, title: &str, start_date: NaiveDate)
        -> RepoResult<bool>;
    /// Returns the person's currently open duty, if any.
    fn open_duty(&self, person_id: PersonId) -> RepoResult<Option<Duty>>;
    /// Returns the person's career status, if any duty was ever recorded.
    fn get_status(&self, person_id: PersonId) -> RepoResult<Option<CareerStatus>>;
    /// Returns the person's full duty history, most recent first.
    fn list_duties(&self, person_id: PersonId) -> RepoResult<Vec<Duty>>;
    /// Applies a validated duty to the person's timeline in one
    /// transaction: updates the career status, closes the open duty one
    /// day before `start_date`, and inserts the new open duty.
    fn record_duty(
        &self,
        person: &Person,
        rank: &str,
        title: &str,
        start_date: NaiveDate,
    ) -> RepoResult<DutyId>;
}

/// SQLite-backed duty timeline repository.
pub struct SqliteDutyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDutyRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl DutyRepository for SqliteDutyRepository<'_> {
    fn find_person_by_name(&self, name: &str) -> RepoResult<Option<Person>> {
        find_person_by_name(self.conn, name)
    }

    fn duty_exists(
        &self,
        person_id: PersonId,
        title: &str,
        start_date: NaiveDate,
    ) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM duty
                WHERE person_uuid = ?1
                  AND title = ?2
                  AND start_date = ?3
            );",
            params![person_id.to_string(), title, date_to_db(start_date)],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn open_duty(&self, person_id: PersonId) -> RepoResult<Option<Duty>> {
        open_duty(self.conn, person_id)
    }

    fn get_status(&self, person_id: PersonId) -> RepoResult<Option<CareerStatus>> {
        get_status(self.conn, person_id)
    }

    fn list_duties(&self, person_id: PersonId) -> RepoResult<Vec<Duty>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DUTY_SELECT_SQL}
             WHERE person_uuid = ?1
             ORDER BY start_date DESC;"
        ))?;

        let mut rows = stmt.query([person_id.to_string()])?;
        let mut duties = Vec::new();
        while let Some(row) = rows.next()? {
            duties.push(parse_duty_row(row)?);
        }

        Ok(duties)
    }

    fn record_duty(
        &self,
        person: &Person,
        rank: &str,
        title: &str,
        start_date: NaiveDate,
    ) -> RepoResult<DutyId> {
        // unchecked_transaction: the repository shares its connection with
        // the audit sink, so it only ever holds a shared borrow.
        let tx = self.conn.unchecked_transaction()?;

        let status = match get_status(&tx, person.id)? {
            Some(mut status) => {
                status.record(rank, title, start_date);
                status
            }
            None => CareerStatus::begin(person.id, rank, title, start_date),
        };
        upsert_status(&tx, &status)?;

        if let Some(open) = open_duty(&tx, person.id)? {
            close_duty(&tx, open.id, day_before(start_date))?;
        }

        let duty = Duty::new(person.id, rank, title, start_date);
        tx.execute(
            "INSERT INTO duty (uuid, person_uuid, rank, title, start_date, end_date)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL);",
            params![
                duty.id.to_string(),
                duty.person_id.to_string(),
                duty.rank.as_str(),
                duty.title.as_str(),
                date_to_db(duty.start_date),
            ],
        )?;

        tx.commit()?;
        Ok(duty.id)
    }
}

pub(crate) fn find_person_by_name(conn: &Connection, name: &str) -> RepoResult<Option<Person>> {
    let row = conn
        .query_row(
            "SELECT uuid, name FROM person WHERE name = ?1;",
            [name],
            |row| {
                let uuid: String = row.get(0)?;
                let name: String = row.get(1)?;
                Ok((uuid, name))
            },
        )
        .optional()?;

    match row {
        Some((uuid, name)) => {
            let id = parse_uuid(&uuid, "person.uuid")?;
            Ok(Some(Person::with_id(id, name)))
        }
        None => Ok(None),
    }
}

fn get_status(conn: &Connection, person_id: PersonId) -> RepoResult<Option<CareerStatus>> {
    let mut stmt = conn.prepare(
        "SELECT
            person_uuid,
            current_rank,
            current_title,
            career_start,
            career_end
         FROM career_status
         WHERE person_uuid = ?1;",
    )?;

    let mut rows = stmt.query([person_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_status_row(row)?));
    }

    Ok(None)
}

fn open_duty(conn: &Connection, person_id: PersonId) -> RepoResult<Option<Duty>> {
    let mut stmt = conn.prepare(&format!(
        "{DUTY_SELECT_SQL}
         WHERE person_uuid = ?1
           AND end_date IS NULL;"
    ))?;

    let mut rows = stmt.query([person_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_duty_row(row)?));
    }

    Ok(None)
}

fn close_duty(conn: &Connection, duty_id: DutyId, end_date: NaiveDate) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE duty SET end_date = ?2 WHERE uuid = ?1 AND end_date IS NULL;",
        params![duty_id.to_string(), date_to_db(end_date)],
    )?;

    if changed == 0 {
        return Err(crate::repo::RepoError::DutyNotFound(duty_id));
    }

    Ok(())
}

fn upsert_status(conn: &Connection, status: &CareerStatus) -> RepoResult<()> {
    // career_start is written once on insert and deliberately absent from
    // the update clause.
    conn.execute(
        "INSERT INTO career_status (
            person_uuid,
            current_rank,
            current_title,
            career_start,
            career_end
        ) VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(person_uuid) DO UPDATE SET
            current_rank = excluded.current_rank,
            current_title = excluded.current_title,
            career_end = excluded.career_end,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![
            status.person_id.to_string(),
            status.current_rank.as_str(),
            status.current_title.as_str(),
            date_to_db(status.career_start),
            status.career_end.map(date_to_db),
        ],
    )?;

    Ok(())
}

fn parse_duty_row(row: &Row<'_>) -> RepoResult<Duty> {
    let uuid_text: String = row.get("uuid")?;
    let person_text: String = row.get("person_uuid")?;
    let start_text: String = row.get("start_date")?;
    let end_text: Option<String> = row.get("end_date")?;

    let end_date = match end_text {
        Some(value) => Some(parse_date(&value, "duty.end_date")?),
        None => None,
    };

    Ok(Duty {
        id: parse_uuid(&uuid_text, "duty.uuid")?,
        person_id: parse_uuid(&person_text, "duty.person_uuid")?,
        rank: row.get("rank")?,
        title: row.get("title")?,
        start_date: parse_date(&start_text, "duty.start_date")?,
        end_date,
    })
}

fn parse_status_row(row: &Row<'_>) -> RepoResult<CareerStatus> {
    let person_text: String = row.get("person_uuid")?;
    let start_text: String = row.get("career_start")?;
    let end_text: Option<String> = row.get("career_end")?;

    let career_end = match end_text {
        Some(value) => Some(parse_date(&value, "career_status.career_end")?),
        None => None,
    };

    Ok(CareerStatus {
        person_id: parse_uuid(&person_text, "career_status.person_uuid")?,
        current_rank: row.get("current_rank")?,
        current_title: row.get("current_title")?,
        career_start: parse_date(&start_text, "career_status.career_start")?,
        career_end,
    })
}

fn date_to_db(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
