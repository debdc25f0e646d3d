use activerow::mock::MockExecutor;
use activerow::{set_connection_resolver, CastKind, DatabaseManager, Model, Row, Value};
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::{Arc, Mutex, MutexGuard};

static GLOBAL: Mutex<()> = Mutex::new(());

pub struct Installed {
    pub mock: Arc<MockExecutor>,
    _lock: MutexGuard<'static, ()>,
}

/// Lock global state and install a fresh mock as the `default` connection.
pub fn install() -> Installed {
    let lock = GLOBAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let mock = Arc::new(MockExecutor::new());
    let manager = DatabaseManager::new("default").with_connection("default", mock.clone());
    set_connection_resolver(Arc::new(manager));
    Installed { mock, _lock: lock }
}

/// Lock global state without installing anything.
pub fn lock() -> MutexGuard<'static, ()> {
    GLOBAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

/// `fillable = ["name", "email", "settings"]`, default guard, fixed clock.
pub struct User;

impl Model for User {
    fn fillable() -> &'static [&'static str] {
        &["name", "email", "settings"]
    }

    fn hidden() -> &'static [&'static str] {
        &["password"]
    }

    fn casts() -> &'static [(&'static str, CastKind)] {
        &[("settings", CastKind::Mapping), ("age", CastKind::Integer)]
    }

    fn fresh_timestamp() -> NaiveDateTime {
        now()
    }
}

/// Default policy: totally guarded.
pub struct Locked;

impl Model for Locked {
    fn uses_timestamps() -> bool {
        false
    }
}

/// Natural key supplied by the caller, no timestamps.
pub struct Country;

impl Model for Country {
    fn primary_key() -> Option<&'static str> {
        Some("code")
    }

    fn incrementing() -> bool {
        false
    }

    fn guarded() -> &'static [&'static str] {
        &[]
    }

    fn uses_timestamps() -> bool {
        false
    }
}

/// No primary key at all.
pub struct AuditEntry;

impl Model for AuditEntry {
    fn primary_key() -> Option<&'static str> {
        None
    }

    fn guarded() -> &'static [&'static str] {
        &[]
    }

    fn uses_timestamps() -> bool {
        false
    }
}
