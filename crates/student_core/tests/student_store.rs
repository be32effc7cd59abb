use chrono::NaiveDate;
use rusqlite::Connection;
use student_core::db::migrations::latest_version;
use student_core::db::open_db_in_memory;
use student_core::{NewStudent, RepoError, SqliteStudentRepository, StudentRepository, UniqueField};

fn new_student(email: &str) -> NewStudent {
    NewStudent {
        first_name: "John".to_string(),
        last_name: "Doe".to_string(),
        email: email.to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(2000, 1, 15).unwrap(),
    }
}

#[test]
fn insert_assigns_id_roll_number_and_timestamps() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let student = repo.insert_student(&new_student("a@test.com")).unwrap();

    assert!(!student.id.is_nil());
    assert_eq!(student.roll_number, 1001);
    assert_eq!(student.created_at, student.updated_at);
    assert_eq!(repo.find_by_id(student.id).unwrap(), Some(student));
}

#[test]
fn roll_numbers_are_monotonic_and_never_reused() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let first = repo.insert_student(&new_student("a@test.com")).unwrap();
    let second = repo.insert_student(&new_student("b@test.com")).unwrap();
    assert_eq!(second.roll_number, first.roll_number + 1);

    assert!(repo.delete_by_roll_number(second.roll_number).unwrap());
    let third = repo.insert_student(&new_student("c@test.com")).unwrap();
    assert_eq!(third.roll_number, second.roll_number + 1);
}

#[test]
fn exists_checks_reflect_stored_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    assert!(!repo.exists_by_email("a@test.com").unwrap());
    assert!(!repo.exists_by_roll_number(1001).unwrap());

    repo.insert_student(&new_student("a@test.com")).unwrap();

    assert!(repo.exists_by_email("a@test.com").unwrap());
    assert!(repo.exists_by_roll_number(1001).unwrap());
}

#[test]
fn duplicate_email_insert_is_classified_as_unique_violation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    repo.insert_student(&new_student("a@test.com")).unwrap();
    let err = repo.insert_student(&new_student("a@test.com")).unwrap_err();

    assert!(matches!(err, RepoError::UniqueViolation(UniqueField::Email)));
    assert_eq!(repo.find_all().unwrap().len(), 1);
}

#[test]
fn duplicate_email_update_is_classified_as_unique_violation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    repo.insert_student(&new_student("a@test.com")).unwrap();
    let mut other = repo.insert_student(&new_student("b@test.com")).unwrap();

    other.email = "a@test.com".to_string();
    let err = repo.update_student(&other).unwrap_err();
    assert!(matches!(err, RepoError::UniqueViolation(UniqueField::Email)));
}

#[test]
fn duplicate_roll_number_write_is_classified_as_unique_violation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();
    let existing = repo.insert_student(&new_student("a@test.com")).unwrap();

    // The repository never binds roll numbers, so collide through raw SQL.
    let err = conn
        .execute(
            "INSERT INTO students (
                roll_number, student_id, first_name, last_name, email, date_of_birth,
                created_at, updated_at
            ) VALUES (?1, 'x', 'A', 'B', 'z@test.com', '2000-01-01', 0, 0);",
            [existing.roll_number],
        )
        .unwrap_err();
    assert!(matches!(
        RepoError::from(err),
        RepoError::UniqueViolation(UniqueField::RollNumber)
    ));
}

#[test]
fn update_never_rewrites_identity_columns() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();
    let stored = repo.insert_student(&new_student("a@test.com")).unwrap();

    let mut tampered = stored.clone();
    tampered.roll_number = 9999;
    tampered.created_at = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(0).unwrap();
    tampered.first_name = "Johnny".to_string();

    let updated = repo.update_student(&tampered).unwrap();
    assert_eq!(updated.roll_number, stored.roll_number);
    assert_eq!(updated.created_at, stored.created_at);
    assert_eq!(updated.first_name, "Johnny");
}

#[test]
fn update_of_deleted_row_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();
    let stored = repo.insert_student(&new_student("a@test.com")).unwrap();

    assert!(repo.delete_by_id(stored.id).unwrap());
    assert!(!repo.delete_by_id(stored.id).unwrap());

    let err = repo.update_student(&stored).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == stored.id));
}

#[test]
fn find_all_is_ordered_by_roll_number() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    for email in ["c@test.com", "a@test.com", "b@test.com"] {
        repo.insert_student(&new_student(email)).unwrap();
    }

    let rolls: Vec<_> = repo
        .find_all()
        .unwrap()
        .into_iter()
        .map(|student| student.roll_number)
        .collect();
    assert_eq!(rolls, vec![1001, 1002, 1003]);
}

#[test]
fn corrupted_student_id_is_reported_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();
    repo.insert_student(&new_student("a@test.com")).unwrap();

    conn.execute("UPDATE students SET student_id = 'not-a-uuid';", [])
        .unwrap();

    let err = repo.find_all().unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteStudentRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_students_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    assert!(matches!(
        SqliteStudentRepository::try_new(&conn),
        Err(RepoError::MissingRequiredTable("students"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE students (
            roll_number INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id TEXT NOT NULL UNIQUE,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    assert!(matches!(
        SqliteStudentRepository::try_new(&conn),
        Err(RepoError::MissingRequiredColumn {
            table: "students",
            column: "date_of_birth"
        })
    ));
}
