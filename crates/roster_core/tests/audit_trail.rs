use chrono::NaiveDate;
use roster_core::db::open_db_in_memory;
use roster_core::{
    AuditEntry, AuditLevel, AuditSink, DutyRequest, DutyService, PersonService, RepoError,
    RepoResult, SqliteAuditLog, SqliteDutyRepository, SqlitePersonRepository,
};
use rusqlite::Connection;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn request(name: &str, title: &str, start_date: NaiveDate) -> DutyRequest {
    DutyRequest {
        person_name: name.to_string(),
        rank: "Lieutenant".to_string(),
        title: title.to_string(),
        start_date,
    }
}

fn register_person(conn: &Connection, name: &str) {
    PersonService::new(
        SqlitePersonRepository::try_new(conn).unwrap(),
        SqliteAuditLog::try_new(conn).unwrap(),
    )
    .create_person(name)
    .unwrap();
}

#[test]
fn successful_duty_records_info_entry() {
    let conn = open_db_in_memory().unwrap();
    register_person(&conn, "Jane Smith");

    DutyService::new(
        SqliteDutyRepository::try_new(&conn).unwrap(),
        SqliteAuditLog::try_new(&conn).unwrap(),
    )
    .create_duty(&request("Jane Smith", "Engineer", date(2024, 1, 1)))
    .unwrap();

    let log = SqliteAuditLog::try_new(&conn).unwrap();
    let entries = log.recent_entries(1).unwrap();
    let latest = &entries[0];
    assert_eq!(latest.level, AuditLevel::Info);
    assert_eq!(latest.action, "create_duty");
    assert_eq!(latest.person_name.as_deref(), Some("Jane Smith"));
    assert!(latest.message.contains("Engineer"));
    assert!(latest.message.contains("2024-01-01"));
    assert!(latest.detail.is_none());
}

#[test]
fn rejected_duty_records_error_entry() {
    let conn = open_db_in_memory().unwrap();

    let service = DutyService::new(
        SqliteDutyRepository::try_new(&conn).unwrap(),
        SqliteAuditLog::try_new(&conn).unwrap(),
    );
    service
        .create_duty(&request("Nobody", "Engineer", date(2024, 1, 1)))
        .unwrap_err();

    let log = SqliteAuditLog::try_new(&conn).unwrap();
    let entries = log.recent_entries(1).unwrap();
    let latest = &entries[0];
    assert_eq!(latest.level, AuditLevel::Error);
    assert_eq!(latest.action, "create_duty");
    assert!(latest.message.contains("Nobody"));
    assert!(latest.detail.is_none());
}

#[test]
fn person_operations_record_entries() {
    let conn = open_db_in_memory().unwrap();
    let service = PersonService::new(
        SqlitePersonRepository::try_new(&conn).unwrap(),
        SqliteAuditLog::try_new(&conn).unwrap(),
    );

    service.create_person("Jane Smith").unwrap();
    service.create_person("Jane Smith").unwrap_err();
    service.rename_person("Jane Smith", "Jane Brown").unwrap();

    let log = SqliteAuditLog::try_new(&conn).unwrap();
    let entries = log.recent_entries(10).unwrap();
    assert_eq!(entries.len(), 3);
    // Most recent first.
    assert_eq!(entries[0].action, "rename_person");
    assert_eq!(entries[0].level, AuditLevel::Info);
    assert_eq!(entries[1].action, "create_person");
    assert_eq!(entries[1].level, AuditLevel::Error);
    assert_eq!(entries[2].action, "create_person");
    assert_eq!(entries[2].level, AuditLevel::Info);
}

#[test]
fn read_paths_do_not_record_entries() {
    let conn = open_db_in_memory().unwrap();
    register_person(&conn, "Jane Smith");
    let baseline = SqliteAuditLog::try_new(&conn)
        .unwrap()
        .recent_entries(10)
        .unwrap()
        .len();

    let service = DutyService::new(
        SqliteDutyRepository::try_new(&conn).unwrap(),
        SqliteAuditLog::try_new(&conn).unwrap(),
    );
    service.duty_history("Jane Smith").unwrap();
    service.duty_history("Nobody").unwrap_err();

    let entries = SqliteAuditLog::try_new(&conn)
        .unwrap()
        .recent_entries(10)
        .unwrap();
    assert_eq!(entries.len(), baseline);
}

/// Sink that always fails, standing in for an unreachable audit store.
struct BrokenSink;

impl AuditSink for BrokenSink {
    fn append(&self, _entry: &AuditEntry) -> RepoResult<()> {
        Err(RepoError::MissingRequiredTable("process_log"))
    }
}

#[test]
fn audit_failure_never_fails_the_operation() {
    let conn = open_db_in_memory().unwrap();
    register_person(&conn, "Jane Smith");

    let service = DutyService::new(SqliteDutyRepository::try_new(&conn).unwrap(), BrokenSink);
    let duty_id = service
        .create_duty(&request("Jane Smith", "Engineer", date(2024, 1, 1)))
        .unwrap();

    // The mutation itself committed.
    let history = service.duty_history("Jane Smith").unwrap();
    assert_eq!(history.duties.len(), 1);
    assert_eq!(history.duties[0].id, duty_id);
}
