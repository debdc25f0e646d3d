//! Mass-assignment protection.
//!
//! `fillable` is an allow-list and `guarded` a deny-list of keys for protected fills.
//! The default `guarded = ["*"]` with an empty `fillable` leaves a type *totally
//! guarded*: every protected fill of a non-exempt key fails.

use crate::model::Model;
use crate::registry;
use crate::value::Row;
use std::marker::PhantomData;

/// Keys starting with this marker are framework-private and never mass assignable.
pub const INTERNAL_PREFIX: char = '_';

/// Mass-assignment rules for one record type.
#[derive(Debug, Clone, Copy)]
pub struct GuardPolicy<'a> {
    fillable: &'a [&'a str],
    guarded: &'a [&'a str],
    unguarded: bool,
}

impl<'a> GuardPolicy<'a> {
    #[must_use]
    pub fn new(fillable: &'a [&'a str], guarded: &'a [&'a str], unguarded: bool) -> Self {
        Self {
            fillable,
            guarded,
            unguarded,
        }
    }

    /// Policy declared by `M`, with the current process-wide unguarded flag.
    #[must_use]
    pub fn of<M: Model>() -> GuardPolicy<'static> {
        GuardPolicy::new(M::fillable(), M::guarded(), registry::is_unguarded::<M>())
    }

    fn guards_everything(&self) -> bool {
        self.guarded == ["*"]
    }

    /// `true` if `key` may be mass assigned.
    ///
    /// Membership in `fillable` wins over membership in `guarded`.
    #[must_use]
    pub fn is_fillable(&self, key: &str) -> bool {
        if self.unguarded {
            return true;
        }
        if self.fillable.contains(&key) {
            return true;
        }
        if self.is_guarded(key) {
            return false;
        }
        self.fillable.is_empty() && !key.starts_with(INTERNAL_PREFIX)
    }

    #[must_use]
    pub fn is_guarded(&self, key: &str) -> bool {
        self.guarded.contains(&key) || self.guards_everything()
    }

    #[must_use]
    pub fn totally_guarded(&self) -> bool {
        self.fillable.is_empty() && self.guards_everything()
    }

    /// Keep only the `fillable` keys of `input`.
    ///
    /// An empty `fillable` list, or an unguarded type, passes the input through
    /// unchanged; rejection is then left to [`GuardPolicy::is_fillable`].
    #[must_use]
    pub fn filter_fillable(&self, input: Row) -> Row {
        if self.fillable.is_empty() || self.unguarded {
            return input;
        }
        input
            .into_iter()
            .filter(|(key, _)| self.fillable.contains(&key.as_str()))
            .collect()
    }
}

/// Holds `M` unguarded until dropped, then restores the previous flag.
///
/// ```
/// use activerow::{guard::Unguarded, Model};
///
/// struct Post;
/// impl Model for Post {}
///
/// {
///     let _unguarded = Unguarded::<Post>::new();
///     assert!(activerow::registry::is_unguarded::<Post>());
/// }
/// assert!(!activerow::registry::is_unguarded::<Post>());
/// ```
#[must_use = "the type is reguarded as soon as this value is dropped"]
pub struct Unguarded<M: Model> {
    previous: bool,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Unguarded<M> {
    pub fn new() -> Self {
        let previous = registry::set_unguarded::<M>(true);
        Self {
            previous,
            _model: PhantomData,
        }
    }
}

impl<M: Model> Default for Unguarded<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Drop for Unguarded<M> {
    fn drop(&mut self) {
        registry::set_unguarded::<M>(self.previous);
    }
}
