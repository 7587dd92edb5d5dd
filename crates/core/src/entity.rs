//! Entity trait: identity + continuity across state changes.

use std::collections::HashSet;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Returns `true` when no two entities in `entities` share an identifier.
pub fn has_unique_ids<E: Entity>(entities: &[E]) -> bool {
    let mut seen = HashSet::with_capacity(entities.len());
    entities.iter().all(|e| seen.insert(e.id().clone()))
}
