//! Dense entity storage with generational handles
//!
//! Entities live in an insertion-ordered vector. A slot map translates stable
//! handles into dense indices, so a handle to a removed entity simply stops
//! resolving instead of pointing at whatever moved into its place.

use slotmap::{Key, SlotMap};

#[derive(Debug, Clone)]
pub struct Arena<K: Key, T> {
    slots: SlotMap<K, usize>,
    handles: Vec<K>,
    items: Vec<T>,
}

impl<K: Key, T> Default for Arena<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key, T> Arena<K, T> {
    pub fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            handles: Vec::new(),
            items: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert an entity at the end of iteration order and return its handle
    pub fn insert(&mut self, item: T) -> K {
        let index = self.items.len();
        self.items.push(item);
        let id = self.slots.insert(index);
        self.handles.push(id);
        id
    }

    /// Returns true if `id` still refers to a live entity
    #[inline]
    pub fn contains(&self, id: K) -> bool {
        self.slots.contains_key(id)
    }

    pub fn get(&self, id: K) -> Option<&T> {
        let index = *self.slots.get(id)?;
        self.items.get(index)
    }

    pub fn get_mut(&mut self, id: K) -> Option<&mut T> {
        let index = *self.slots.get(id)?;
        self.items.get_mut(index)
    }

    /// Handles in dense iteration order
    pub fn handles(&self) -> &[K] {
        &self.handles
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> + '_ {
        self.handles.iter().copied().zip(self.items.iter())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter()
    }

    /// Remove every entity in `dead`, compacting in place and preserving the
    /// relative order of the survivors. Returns the number removed.
    pub fn remove_many(&mut self, dead: &[K]) -> usize {
        if dead.is_empty() {
            return 0;
        }
        let mut write = 0;
        for read in 0..self.handles.len() {
            let id = self.handles[read];
            if dead.contains(&id) {
                self.slots.remove(id);
                continue;
            }
            if write != read {
                self.handles.swap(write, read);
                self.items.swap(write, read);
            }
            if let Some(slot) = self.slots.get_mut(id) {
                *slot = write;
            }
            write += 1;
        }
        let removed = self.handles.len() - write;
        self.handles.truncate(write);
        self.items.truncate(write);
        removed
    }

    pub fn remove(&mut self, id: K) -> bool {
        self.remove_many(&[id]) == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::new_key_type;

    new_key_type! {
        struct TestId;
    }

    #[test]
    fn test_remove_many_preserves_order() {
        let mut arena: Arena<TestId, u32> = Arena::new();
        let ids: Vec<_> = (0..5).map(|v| arena.insert(v)).collect();

        let removed = arena.remove_many(&[ids[1], ids[3]]);
        assert_eq!(removed, 2);
        assert_eq!(arena.values().copied().collect::<Vec<_>>(), vec![0, 2, 4]);

        // Surviving handles still resolve to their own values
        assert_eq!(arena.get(ids[4]), Some(&4));
        assert_eq!(arena.get(ids[0]), Some(&0));
    }

    #[test]
    fn test_stale_handle_never_resolves() {
        let mut arena: Arena<TestId, u32> = Arena::new();
        let old = arena.insert(7);
        assert!(arena.remove(old));
        let new = arena.insert(8);

        assert!(!arena.contains(old));
        assert!(arena.get(old).is_none());
        assert_eq!(arena.get(new), Some(&8));
        assert!(!arena.remove(old));
    }
}
