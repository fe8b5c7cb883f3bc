use chrono::NaiveDate;
use roster_core::db::open_db_in_memory;
use roster_core::{
    DutyRequest, DutyService, PersonError, PersonService, SqliteAuditLog, SqliteDutyRepository,
    SqlitePersonRepository,
};
use rusqlite::Connection;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn person_service(
    conn: &Connection,
) -> PersonService<SqlitePersonRepository<'_>, SqliteAuditLog<'_>> {
    PersonService::new(
        SqlitePersonRepository::try_new(conn).unwrap(),
        SqliteAuditLog::try_new(conn).unwrap(),
    )
}

#[test]
fn create_and_get_person_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let service = person_service(&conn);

    let id = service.create_person("Jane Smith").unwrap();

    let record = service.get_person("Jane Smith").unwrap();
    assert_eq!(record.person.id, id);
    assert_eq!(record.person.name, "Jane Smith");
    assert!(record.status.is_none());
}

#[test]
fn create_person_rejects_blank_name() {
    let conn = open_db_in_memory().unwrap();
    let service = person_service(&conn);

    let err = service.create_person("   ").unwrap_err();
    assert!(matches!(err, PersonError::MissingName));
}

#[test]
fn create_person_rejects_duplicate_name() {
    let conn = open_db_in_memory().unwrap();
    let service = person_service(&conn);

    service.create_person("Jane Smith").unwrap();
    let err = service.create_person("Jane Smith").unwrap_err();
    assert!(matches!(err, PersonError::DuplicateName(name) if name == "Jane Smith"));

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM person;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn get_unknown_person_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = person_service(&conn);

    let err = service.get_person("Nobody").unwrap_err();
    assert!(matches!(err, PersonError::NotFound(name) if name == "Nobody"));
}

#[test]
fn rename_keeps_id_and_duty_history() {
    let conn = open_db_in_memory().unwrap();
    let service = person_service(&conn);
    let id = service.create_person("Jane Smith").unwrap();

    let duty_service = DutyService::new(
        SqliteDutyRepository::try_new(&conn).unwrap(),
        SqliteAuditLog::try_new(&conn).unwrap(),
    );
    duty_service
        .create_duty(&DutyRequest {
            person_name: "Jane Smith".to_string(),
            rank: "Lieutenant".to_string(),
            title: "Engineer".to_string(),
            start_date: date(2024, 1, 1),
        })
        .unwrap();

    let renamed_id = service.rename_person("Jane Smith", "Jane Brown").unwrap();
    assert_eq!(renamed_id, id);

    let history = duty_service.duty_history("Jane Brown").unwrap();
    assert_eq!(history.person.id, id);
    assert_eq!(history.duties.len(), 1);
    assert!(history.status.is_some());

    assert!(matches!(
        service.get_person("Jane Smith").unwrap_err(),
        PersonError::NotFound(_)
    ));
}

#[test]
fn rename_to_existing_name_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = person_service(&conn);
    service.create_person("Jane Smith").unwrap();
    service.create_person("Bob Johnson").unwrap();

    let err = service.rename_person("Jane Smith", "Bob Johnson").unwrap_err();
    assert!(matches!(err, PersonError::DuplicateName(name) if name == "Bob Johnson"));
}

#[test]
fn rename_to_same_name_is_noop_success() {
    let conn = open_db_in_memory().unwrap();
    let service = person_service(&conn);
    let id = service.create_person("Jane Smith").unwrap();

    let renamed_id = service.rename_person("Jane Smith", "Jane Smith").unwrap();
    assert_eq!(renamed_id, id);
}

#[test]
fn rename_unknown_person_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = person_service(&conn);

    let err = service.rename_person("Nobody", "Somebody").unwrap_err();
    assert!(matches!(err, PersonError::NotFound(name) if name == "Nobody"));
}

#[test]
fn list_people_is_ordered_by_name_and_carries_status() {
    let conn = open_db_in_memory().unwrap();
    let service = person_service(&conn);
    service.create_person("Zoe Alvarez").unwrap();
    service.create_person("Bob Johnson").unwrap();

    let duty_service = DutyService::new(
        SqliteDutyRepository::try_new(&conn).unwrap(),
        SqliteAuditLog::try_new(&conn).unwrap(),
    );
    duty_service
        .create_duty(&DutyRequest {
            person_name: "Zoe Alvarez".to_string(),
            rank: "Commander".to_string(),
            title: "Pilot".to_string(),
            start_date: date(2023, 4, 1),
        })
        .unwrap();

    let records = service.list_people().unwrap();
    let names: Vec<&str> = records
        .iter()
        .map(|record| record.person.name.as_str())
        .collect();
    assert_eq!(names, vec!["Bob Johnson", "Zoe Alvarez"]);

    assert!(records[0].status.is_none());
    let zoe_status = records[1].status.as_ref().unwrap();
    assert_eq!(zoe_status.current_title, "Pilot");
    assert_eq!(zoe_status.career_start, date(2023, 4, 1));
}
