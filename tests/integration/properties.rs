use crate::support::{install, lock, Locked, User};
use activerow::{ModelError, Record, Row, Value};
use proptest::prelude::*;

const KEYS: [&str; 5] = ["name", "email", "admin", "_internal", "nickname"];

fn arb_attributes() -> impl Strategy<Value = Row> {
    prop::collection::vec((prop::sample::select(KEYS.to_vec()), "[a-z]{0,6}"), 0..6).prop_map(
        |pairs| {
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), Value::String(v)))
                .collect()
        },
    )
}

fn arb_json() -> impl Strategy<Value = serde_json::Value> {
    let leaf = prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::from),
        any::<i64>().prop_map(serde_json::Value::from),
        "[a-z ]{0,8}".prop_map(serde_json::Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::from),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
        ]
    })
}

fn arb_persisted_row() -> impl Strategy<Value = Row> {
    prop::collection::vec(("[a-z]{1,5}", any::<i64>()), 0..5).prop_map(|pairs| {
        let mut row = Row::new();
        row.insert("id".to_string(), Value::Int(1));
        for (k, v) in pairs {
            row.insert(format!("c_{k}"), Value::Int(v));
        }
        row
    })
}

proptest! {
    #[test]
    fn prop_protected_fill_raises_only_when_totally_guarded(attrs in arb_attributes()) {
        let _lock = lock();

        let locked = Record::<Locked>::from_attributes(attrs.clone());
        match attrs.keys().next() {
            Some(first) => prop_assert_eq!(locked.unwrap_err(), ModelError::MassAssignment(first.clone())),
            None => prop_assert!(locked.is_ok()),
        }

        prop_assert!(Record::<User>::from_attributes(attrs.clone()).is_ok());

        let mut forced = Record::<Locked>::new();
        prop_assert!(forced.force_fill(attrs.clone()).is_ok());
        prop_assert_eq!(forced.attributes(), &attrs);
    }

    #[test]
    fn prop_dirty_empty_after_hydrate_and_sync(row in arb_persisted_row(), edits in arb_attributes()) {
        let mut record = Record::<User>::from_row(row, None);
        prop_assert!(record.dirty().is_empty());

        for (key, value) in edits {
            record.set(&key, value).unwrap();
        }
        let dirty = record.dirty();
        prop_assert_eq!(record.is_dirty(&[]), !dirty.is_empty());
        for key in KEYS {
            prop_assert_eq!(record.is_dirty(&[key]), dirty.contains_key(key));
        }

        record.sync();
        prop_assert!(record.dirty().is_empty());
        prop_assert!(!record.is_dirty(&[]));
    }

    #[test]
    fn prop_structured_cast_round_trips(json in arb_json()) {
        let mut record = Record::<User>::new();
        record.set("settings", json.clone()).unwrap();

        prop_assert!(matches!(record.attributes()["settings"], Value::String(_)));
        let map = record.to_map().unwrap();
        prop_assert_eq!(&map["settings"], &Value::from(json));
    }

    #[test]
    fn prop_second_save_writes_nothing(row in arb_persisted_row(), edits in arb_attributes()) {
        let env = install();

        let mut record = Record::<User>::from_row(row, None);
        for (key, value) in edits {
            record.set(&key, value).unwrap();
        }
        record.save().unwrap();
        let writes = env.mock.write_count();
        prop_assert!(writes <= 1);

        record.save().unwrap();
        prop_assert_eq!(env.mock.write_count(), writes);
    }
}
