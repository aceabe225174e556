//! Typed per-entity component storage.

use ahash::AHashMap;
use riposte_common::{CombatError, CombatResult, EntityId};

/// Components of one type keyed by entity.
#[derive(Debug, Clone)]
pub struct ComponentStore<T> {
    items: AHashMap<EntityId, T>,
}

impl<T> Default for ComponentStore<T> {
    fn default() -> Self {
        Self {
            items: AHashMap::new(),
        }
    }
}

impl<T> ComponentStore<T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a component, returning the old one.
    pub fn insert(&mut self, id: EntityId, value: T) -> Option<T> {
        self.items.insert(id, value)
    }

    /// Removes a component.
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        self.items.remove(&id)
    }

    /// Component of `id`.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.items.get(&id)
    }

    /// Mutable component of `id`.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.items.get_mut(&id)
    }

    /// Component of `id`, or [`CombatError::UnknownEntity`].
    pub fn try_get(&self, id: EntityId) -> CombatResult<&T> {
        self.get(id).ok_or(CombatError::UnknownEntity(id))
    }

    /// Mutable component of `id`, or [`CombatError::UnknownEntity`].
    pub fn try_get_mut(&mut self, id: EntityId) -> CombatResult<&mut T> {
        self.get_mut(id).ok_or(CombatError::UnknownEntity(id))
    }

    /// Whether `id` has a component.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.items.contains_key(&id)
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.items.iter().map(|(id, v)| (*id, v))
    }

    /// Iterates mutably in unspecified order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.items.iter_mut().map(|(id, v)| (*id, v))
    }

    /// Ids in ascending order, for deterministic passes.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.items.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
