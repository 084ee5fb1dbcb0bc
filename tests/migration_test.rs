mod helpers;

use rebirth::db;
use rebirth::db::migrations::{get_schema_version, index_exists, run_migrations, CURRENT_SCHEMA_VERSION};

#[test]
fn fresh_db_migrates_to_current_version() {
    let conn = helpers::test_db();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn migrations_are_idempotent() {
    let conn = helpers::test_db();
    run_migrations(&conn).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn v1_db_upgrades_correctly() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    db::schema::init_schema(&conn).unwrap();

    assert_eq!(get_schema_version(&conn).unwrap(), 1);
    assert!(!index_exists(&conn, "idx_messages_user_created").unwrap());

    run_migrations(&conn).unwrap();

    assert_eq!(get_schema_version(&conn).unwrap(), 2);
    assert!(index_exists(&conn, "idx_messages_user_created").unwrap());
    assert!(index_exists(&conn, "idx_milestones_user_created").unwrap());
}
