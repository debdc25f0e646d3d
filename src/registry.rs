//! Per-record-type process state.
//!
//! Two pieces of state are shared by every instance of a record type: whether the
//! type's `boot` hook has run, and the mass-assignment `unguarded` override. Both live
//! in one registry keyed on the type's `TypeId`.
//!
//! Booting is explicit. Call [`boot`] for every record type at process start; record
//! construction never boots lazily.
//!
//! The unguarded flag is not tied to a thread. While one caller holds a type unguarded,
//! every fill on that type anywhere in the process is unprotected, so callers must
//! serialize `unguard`/`reguard` pairs themselves.

use crate::model::Model;
use once_cell::sync::Lazy;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default, Clone, Copy)]
struct ModelState {
    booted: bool,
    unguarded: bool,
}

static REGISTRY: Lazy<RwLock<HashMap<TypeId, ModelState>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

fn read_state<M: Model>() -> ModelState {
    let registry = match REGISTRY.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    registry.get(&TypeId::of::<M>()).copied().unwrap_or_default()
}

fn update_state<M: Model, R>(f: impl FnOnce(&mut ModelState) -> R) -> R {
    let mut registry = match REGISTRY.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    f(registry.entry(TypeId::of::<M>()).or_default())
}

/// Run `M::boot()` once for this process.
///
/// Returns `true` if this call ran the hook, `false` if the type was already booted.
pub fn boot<M: Model>() -> bool {
    let first = update_state::<M, _>(|state| !std::mem::replace(&mut state.booted, true));
    if first {
        log::debug!("booting record type {}", std::any::type_name::<M>());
        M::boot();
    }
    first
}

#[must_use]
pub fn is_booted<M: Model>() -> bool {
    read_state::<M>().booted
}

/// Disable mass-assignment protection for `M` process-wide.
pub fn unguard<M: Model>() {
    set_unguarded::<M>(true);
}

/// Re-enable mass-assignment protection for `M`.
pub fn reguard<M: Model>() {
    set_unguarded::<M>(false);
}

#[must_use]
pub fn is_unguarded<M: Model>() -> bool {
    read_state::<M>().unguarded
}

/// Set the flag and return its previous value.
pub(crate) fn set_unguarded<M: Model>(unguarded: bool) -> bool {
    update_state::<M, _>(|state| std::mem::replace(&mut state.unguarded, unguarded))
}
