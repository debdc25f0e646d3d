use crate::support::{install, lock, now, row, AuditEntry, Country, User};
use activerow::mock::CallKind;
use activerow::{
    unset_connection_resolver, LifeError, ModelError, Record, SaveOptions, UpdateOutcome, Value,
};

fn bound(value: impl Into<Value>) -> sea_query::Value {
    sea_query::Value::from(value.into())
}

fn persisted_user() -> Record<User> {
    Record::from_row(
        row(&[
            ("id", Value::Int(1)),
            ("name", "alice".into()),
            ("visits", Value::Int(3)),
        ]),
        None,
    )
}

#[test]
fn test_insert_sets_generated_id_and_exists() {
    let env = install();
    env.mock.push_id(Ok(Value::Int(42)));

    let mut user = Record::<User>::from_attributes(row(&[("name", "alice".into())])).unwrap();
    assert!(user.save().unwrap());

    assert!(user.exists());
    assert_eq!(user.get("id").unwrap(), Value::Int(42));
    assert_eq!(user.get("created_at").unwrap(), Value::DateTime(now()));
    assert!(!user.is_dirty(&[]));

    let stmt = env.mock.last_statement().unwrap();
    assert_eq!(stmt.kind, CallKind::InsertGetId);
    assert_eq!(
        stmt.sql,
        r#"INSERT INTO "users" ("name", "updated_at", "created_at") VALUES ($1, $2, $3) RETURNING "id""#
    );
    assert_eq!(stmt.params.len(), 3);
}

#[test]
fn test_insert_without_incrementing_key_is_plain() {
    let env = install();

    let mut country = Record::<Country>::from_attributes(row(&[
        ("code", "NL".into()),
        ("name", "Netherlands".into()),
    ]))
    .unwrap();
    country.save().unwrap();

    let stmt = env.mock.last_statement().unwrap();
    assert_eq!(stmt.kind, CallKind::Execute);
    assert_eq!(
        stmt.sql,
        r#"INSERT INTO "countries" ("code", "name") VALUES ($1, $2)"#
    );
    assert_eq!(country.get("code").unwrap(), Value::from("NL"));
    assert!(country.exists());
}

#[test]
fn test_failed_insert_leaves_record_new_and_dirty() {
    let env = install();
    env.mock
        .push_id(Err(LifeError::QueryError("unique violation".to_string())));

    let mut user = Record::<User>::from_attributes(row(&[("name", "bob".into())])).unwrap();
    let err = user.save().unwrap_err();

    assert_eq!(
        err,
        ModelError::Database(LifeError::QueryError("unique violation".to_string()))
    );
    assert!(!user.exists());
    assert!(user.is_dirty(&["name"]));
    assert!(user.get_original("name").is_none());
}

#[test]
fn test_update_is_keyed_on_original_primary_key() {
    let env = install();

    let mut user = persisted_user();
    user.set("name", "bob").unwrap();
    user.set("id", 99).unwrap();
    assert!(user.save().unwrap());

    let stmt = env.mock.last_statement().unwrap();
    assert_eq!(
        stmt.sql,
        r#"UPDATE "users" SET "id" = $1, "name" = $2, "updated_at" = $3 WHERE "id" = $4"#
    );
    assert_eq!(stmt.params.first(), Some(&bound(99)));
    assert_eq!(stmt.params.last(), Some(&bound(1)));
    assert_eq!(user.get_original("id"), Some(&Value::Int(99)));
}

#[test]
fn test_second_save_is_a_noop() {
    let env = install();

    let mut user = persisted_user();
    assert!(user.save().unwrap());
    assert_eq!(env.mock.write_count(), 0);

    user.set("name", "carol").unwrap();
    user.save().unwrap();
    assert_eq!(env.mock.write_count(), 1);

    assert!(user.save().unwrap());
    assert_eq!(env.mock.write_count(), 1);
}

#[test]
fn test_caller_supplied_timestamps_are_kept() {
    let env = install();

    let mut user = Record::<User>::new();
    user.force_fill(row(&[
        ("name", "dave".into()),
        ("created_at", "2020-01-01T00:00:00".into()),
    ]))
    .unwrap();
    user.save().unwrap();

    assert_eq!(
        user.get("created_at").unwrap().to_string(),
        "2020-01-01T00:00:00"
    );
    assert_eq!(user.get("updated_at").unwrap(), Value::DateTime(now()));
    assert_eq!(env.mock.statements().len(), 1);
}

#[test]
fn test_save_without_timestamps() {
    let env = install();

    let mut user = Record::<User>::from_attributes(row(&[("name", "erin".into())])).unwrap();
    user.save_with(SaveOptions {
        timestamps: false,
        touch: true,
    })
    .unwrap();

    assert!(!user.has("created_at"));
    assert!(!env.mock.last_statement().unwrap().sql.contains("updated_at"));
}

#[test]
fn test_update_failure_keeps_dirty_state() {
    let env = install();
    env.mock
        .push_affected(Err(LifeError::QueryError("deadlock".to_string())));

    let mut user = persisted_user();
    user.set("name", "frank").unwrap();
    assert!(user.save().is_err());
    assert!(user.is_dirty(&["name"]));
    assert!(user.exists());
}

#[test]
fn test_delete_persisted_record() {
    let env = install();

    let mut user = persisted_user();
    assert!(user.delete().unwrap());
    assert!(!user.exists());

    let stmt = env.mock.last_statement().unwrap();
    assert_eq!(stmt.sql, r#"DELETE FROM "users" WHERE "id" = $1"#);
    assert_eq!(stmt.params, vec![bound(1)]);
}

#[test]
fn test_delete_new_record_is_noop() {
    let env = install();

    let mut user = Record::<User>::new();
    assert!(!user.delete().unwrap());
    assert!(env.mock.statements().is_empty());
}

#[test]
fn test_delete_without_primary_key_fails_before_querying() {
    let env = install();

    let mut entry = Record::<AuditEntry>::from_row(row(&[("action", "login".into())]), None);
    assert_eq!(entry.delete().unwrap_err(), ModelError::MissingPrimaryKey);
    assert!(entry.exists());
    assert!(env.mock.statements().is_empty());
}

#[test]
fn test_touch_writes_updated_at_only() {
    let env = install();

    let mut user = persisted_user();
    assert!(user.touch().unwrap());

    let stmt = env.mock.last_statement().unwrap();
    assert_eq!(
        stmt.sql,
        r#"UPDATE "users" SET "updated_at" = $1 WHERE "id" = $2"#
    );
    assert!(!user.is_dirty(&[]));

    let mut country = Record::<Country>::new();
    assert!(!country.touch().unwrap());
}

#[test]
fn test_update_new_record_is_table_wide() {
    let env = install();
    env.mock.push_affected(Ok(5));

    let mut user = Record::<User>::new();
    let outcome = user.update(row(&[("active", Value::Bool(false))])).unwrap();

    assert_eq!(outcome, UpdateOutcome::Bulk(5));
    assert_eq!(
        env.mock.last_statement().unwrap().sql,
        r#"UPDATE "users" SET "active" = $1"#
    );
    assert!(!user.exists());
}

#[test]
fn test_update_persisted_record_fills_and_saves() {
    let env = install();

    let mut user = persisted_user();
    let outcome = user
        .update(row(&[("name", "gina".into()), ("is_admin", Value::Bool(true))]))
        .unwrap();

    assert_eq!(outcome, UpdateOutcome::Saved(true));
    assert!(!user.has("is_admin"));
    assert!(env
        .mock
        .last_statement()
        .unwrap()
        .sql
        .starts_with(r#"UPDATE "users" SET "name" = $1"#));
}

#[test]
fn test_increment_persisted_record() {
    let env = install();

    let mut user = persisted_user();
    assert_eq!(user.increment("visits", 2).unwrap(), 1);

    assert_eq!(user.get("visits").unwrap(), Value::Int(5));
    assert!(!user.is_dirty(&["visits"]));
    let stmt = env.mock.last_statement().unwrap();
    assert_eq!(
        stmt.sql,
        r#"UPDATE "users" SET "visits" = "visits" + $1 WHERE "id" = $2"#
    );

    user.decrement("visits", 1).unwrap();
    assert_eq!(user.get("visits").unwrap(), Value::Int(4));
}

#[test]
fn test_increment_cast_column_stored_as_text() {
    let env = install();

    let mut user = Record::<User>::from_row(
        row(&[("id", Value::Int(1)), ("age", "41".into())]),
        None,
    );
    assert_eq!(user.increment("age", 1).unwrap(), 1);

    assert_eq!(user.get("age").unwrap(), Value::Int(42));
    assert!(!user.is_dirty(&[]));
    assert_eq!(env.mock.last_statement().unwrap().params[0], bound(1));
}

#[test]
fn test_increment_without_key_leaves_record_untouched() {
    let env = install();

    let mut entry = Record::<AuditEntry>::from_row(row(&[("n", Value::Int(1))]), None);
    assert_eq!(entry.increment("n", 5).unwrap_err(), ModelError::MissingPrimaryKey);

    assert_eq!(entry.get("n").unwrap(), Value::Int(1));
    assert_eq!(entry.get_original("n"), Some(&Value::Int(1)));
    assert_eq!(env.mock.write_count(), 0);
}

#[test]
fn test_failed_increment_keeps_old_value() {
    let env = install();
    env.mock
        .push_affected(Err(LifeError::QueryError("deadlock".to_string())));

    let mut user = persisted_user();
    assert!(user.increment("visits", 2).is_err());

    assert_eq!(user.get("visits").unwrap(), Value::Int(3));
    assert_eq!(user.get_original("visits"), Some(&Value::Int(3)));
}

#[test]
fn test_increment_new_record_is_table_wide() {
    let env = install();
    env.mock.push_affected(Ok(12));

    let mut user = Record::<User>::new();
    assert_eq!(user.increment("visits", 1).unwrap(), 12);
    assert_eq!(
        env.mock.last_statement().unwrap().sql,
        r#"UPDATE "users" SET "visits" = "visits" + $1"#
    );
    assert!(!user.has("visits"));
}

#[test]
fn test_fresh_reloads_row() {
    let env = install();
    env.mock.push_rows(Ok(vec![row(&[
        ("id", Value::Int(1)),
        ("name", "reloaded".into()),
    ])]));

    let mut user = persisted_user();
    user.set("name", "local edit").unwrap();
    let fresh = user.fresh().unwrap().unwrap();

    assert_eq!(fresh.get("name").unwrap(), Value::from("reloaded"));
    assert!(!fresh.is_dirty(&[]));
    assert!(env
        .mock
        .last_statement()
        .unwrap()
        .sql
        .contains(r#"WHERE "id" = $1"#));

    assert!(Record::<User>::new().fresh().unwrap().is_none());
}

#[test]
fn test_missing_resolver_is_reported() {
    let _lock = lock();
    unset_connection_resolver();

    let mut user = Record::<User>::from_attributes(row(&[("name", "x".into())])).unwrap();
    assert_eq!(user.save().unwrap_err(), ModelError::ResolverNotSet);
    assert!(!user.exists());
}

#[test]
fn test_unknown_connection_is_reported() {
    let _env = install();

    let mut user = Record::<User>::new();
    user.set_connection(Some("analytics"));
    assert_eq!(
        user.save().unwrap_err(),
        ModelError::ConnectionNotFound("analytics".to_string())
    );
}
