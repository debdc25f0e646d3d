use crate::support::{install, row, Locked, User};
use activerow::mock::{CallKind, MockExecutor};
use activerow::{set_connection_resolver, DatabaseManager, Model, Value};
use std::sync::Arc;

fn user_row(id: i64, name: &str) -> activerow::Row {
    row(&[("id", Value::Int(id)), ("name", name.into())])
}

#[test]
fn test_create_saves_filled_record() {
    let env = install();
    env.mock.push_id(Ok(Value::Int(7)));

    let user = User::create(row(&[("name", "ann".into()), ("role", "root".into())])).unwrap();

    assert!(user.exists());
    assert_eq!(user.key(), Some(&Value::Int(7)));
    assert!(!user.has("role"));
}

#[test]
fn test_force_create_on_totally_guarded_type() {
    let env = install();

    assert!(Locked::create(row(&[("title", "x".into())])).is_err());
    assert!(env.mock.statements().is_empty());

    let locked = Locked::force_create(row(&[("title", "x".into())])).unwrap();
    assert_eq!(locked.get("title").unwrap(), Value::from("x"));
    assert_eq!(
        env.mock.last_statement().unwrap().sql,
        r#"INSERT INTO "lockeds" ("title") VALUES ($1) RETURNING "id""#
    );
}

#[test]
fn test_all_and_find() {
    let env = install();
    env.mock
        .push_rows(Ok(vec![user_row(1, "a"), user_row(2, "b")]))
        .push_rows(Ok(vec![user_row(2, "b")]))
        .push_rows(Ok(vec![]));

    let users = User::all().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.exists() && !u.is_dirty(&[])));

    let found = User::find(2).unwrap().unwrap();
    assert_eq!(found.get("name").unwrap(), Value::from("b"));
    assert!(User::find(3).unwrap().is_none());

    let select = &env.mock.statements()[1];
    assert_eq!(select.kind, CallKind::Query);
    assert_eq!(
        select.sql,
        r#"SELECT * FROM "users" WHERE "id" = $1 LIMIT $2"#
    );
}

#[test]
fn test_find_many_and_find_or_new() {
    let env = install();
    env.mock.push_rows(Ok(vec![user_row(1, "a"), user_row(3, "c")]));

    let users = User::find_many([1, 2, 3]).unwrap();
    assert_eq!(users.len(), 2);
    assert!(env
        .mock
        .last_statement()
        .unwrap()
        .sql
        .contains(r#""id" IN ($1, $2, $3)"#));

    let fresh = User::find_or_new(9).unwrap();
    assert!(!fresh.exists());
    assert!(fresh.attributes().is_empty());
}

#[test]
fn test_first_or_new_and_first_or_create() {
    let env = install();
    env.mock
        .push_rows(Ok(vec![]))
        .push_rows(Ok(vec![user_row(5, "eve")]))
        .push_rows(Ok(vec![]))
        .push_id(Ok(Value::Int(6)));

    let new = User::first_or_new(row(&[("name", "eve".into())])).unwrap();
    assert!(!new.exists());
    assert_eq!(new.get("name").unwrap(), Value::from("eve"));

    let existing = User::first_or_create(row(&[("name", "eve".into())])).unwrap();
    assert_eq!(existing.key(), Some(&Value::Int(5)));

    let created = User::first_or_create(row(&[("name", "zed".into())])).unwrap();
    assert_eq!(created.key(), Some(&Value::Int(6)));
    assert_eq!(env.mock.write_count(), 1);
}

#[test]
fn test_update_or_create_updates_match() {
    let env = install();
    env.mock.push_rows(Ok(vec![user_row(4, "old")]));

    let user = User::update_or_create(
        row(&[("id", Value::Int(4))]),
        row(&[("email", "old@example.com".into())]),
    )
    .unwrap();

    assert!(user.exists());
    assert!(!user.is_dirty(&[]));
    let stmt = env.mock.last_statement().unwrap();
    assert_eq!(stmt.kind, CallKind::Execute);
    assert!(stmt.sql.starts_with(r#"UPDATE "users" SET "email" = $1"#));
}

#[test]
fn test_destroy_counts_deleted_records() {
    let env = install();
    env.mock.push_rows(Ok(vec![user_row(1, "a"), user_row(2, "b")]));

    assert_eq!(User::destroy([1, 2, 3]).unwrap(), 2);
    let deletes: Vec<_> = env
        .mock
        .statements()
        .into_iter()
        .filter(|s| s.sql.starts_with("DELETE"))
        .collect();
    assert_eq!(deletes.len(), 2);
}

#[test]
fn test_hydrate_and_hydrate_raw() {
    let env = install();

    let records = User::hydrate(vec![user_row(1, "a")], Some("archive"));
    assert_eq!(records[0].connection_name(), Some("archive"));
    assert!(records[0].exists());

    env.mock.push_rows(Ok(vec![user_row(2, "b")]));
    let records = User::hydrate_raw(
        "SELECT * FROM users WHERE name = $1",
        &[Value::from("b")],
        None,
    )
    .unwrap();
    assert_eq!(records.len(), 1);
    let stmt = env.mock.last_statement().unwrap();
    assert_eq!(stmt.sql, "SELECT * FROM users WHERE name = $1");
    assert_eq!(stmt.params.len(), 1);
}

#[test]
fn test_on_named_connection() {
    let env = install();
    let replica = Arc::new(MockExecutor::new());
    replica.push_rows(Ok(vec![user_row(1, "a")]));
    let manager = DatabaseManager::new("default")
        .with_connection("default", env.mock.clone())
        .with_connection("replica", replica.clone());
    set_connection_resolver(Arc::new(manager));

    let users = User::on("replica").unwrap().get().unwrap();
    assert_eq!(users[0].connection_name(), Some("replica"));
    assert_eq!(replica.statements().len(), 1);
    assert!(env.mock.statements().is_empty());
}
