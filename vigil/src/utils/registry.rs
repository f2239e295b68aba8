use std::collections::BTreeMap;

/// An ordered, id-keyed store.
///
/// A `Registry` maps `u64` ids to values. Ids are allocated by the
/// caller (see [`Registry::insert_with_id`]) or by the registry itself
/// (see [`Registry::insert`]) and are **never reused**, so a stale id
/// can never address a newer entry.
///
/// Iteration follows id order, which is also registration order.
pub(crate) struct Registry<T> {
    /// Live entries, ordered by id.
    entries: BTreeMap<u64, T>,

    /// Next id handed out by [`Registry::insert`].
    next: u64,
}

impl<T> Registry<T> {
    /// Creates an empty registry.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next: 0,
        }
    }

    /// Inserts a value under a freshly allocated id and returns the id.
    pub(crate) fn insert(&mut self, item: T) -> u64 {
        let id = self.next;
        self.next += 1;
        self.entries.insert(id, item);
        id
    }

    /// Inserts a value under an id allocated elsewhere.
    ///
    /// The internal counter is bumped past `id` so that later calls to
    /// [`insert`](Self::insert) cannot collide with it.
    pub(crate) fn insert_with_id(&mut self, id: u64, item: T) {
        self.next = self.next.max(id + 1);
        self.entries.insert(id, item);
    }

    /// Removes and returns the value stored under `id`, if any.
    pub(crate) fn remove(&mut self, id: u64) -> Option<T> {
        self.entries.remove(&id)
    }

    pub(crate) fn get_mut(&mut self, id: u64) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    /// Returns a snapshot of the live ids.
    ///
    /// The snapshot is detached from the registry and stays valid while
    /// entries are added or removed.
    pub(crate) fn ids(&self) -> Vec<u64> {
        self.entries.keys().copied().collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (u64, &T)> {
        self.entries.iter().map(|(&id, item)| (id, item))
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub(crate) fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<u64> {
        self.iter().find(|(_, item)| predicate(item)).map(|(id, _)| id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}
