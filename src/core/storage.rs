use std::collections::BTreeMap;
use std::fmt::Debug;
use crate::error::PhysicsError;
use crate::Result;

/// A typed handle into a [`HandleStorage`]
pub trait Handle: Copy + Eq + Ord + std::hash::Hash + Debug {
    /// Builds a handle from its raw value
    fn from_raw(raw: u32) -> Self;

    /// Returns the raw value of the handle
    fn raw(self) -> u32;
}

/// Handle-keyed storage for native simulation objects.
///
/// Handles start at 1 and are never reused. Iteration follows handle order,
/// which keeps stepping deterministic.
#[derive(Debug)]
pub struct HandleStorage<H: Handle, T> {
    items: BTreeMap<H, T>,
    next_id: u32,
}

impl<H: Handle, T> Default for HandleStorage<H, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Handle, T> HandleStorage<H, T> {
    /// Creates a new empty storage
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            next_id: 1, // Start at 1, so 0 can represent invalid handle
        }
    }

    /// Adds an item to the storage and returns its handle
    pub fn add(&mut self, item: T) -> H {
        let handle = H::from_raw(self.next_id);
        self.next_id += 1;
        self.items.insert(handle, item);
        handle
    }

    /// Gets a reference to an item by its handle
    pub fn get(&self, handle: H) -> Option<&T> {
        self.items.get(&handle)
    }

    /// Gets a mutable reference to an item by its handle
    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        self.items.get_mut(&handle)
    }

    /// Gets an item, returning an error if not found
    pub fn get_or_err(&self, handle: H) -> Result<&T> {
        self.items
            .get(&handle)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("native handle {:?}", handle)))
    }

    /// Gets a mutable reference to an item, returning an error if not found
    pub fn get_mut_or_err(&mut self, handle: H) -> Result<&mut T> {
        self.items
            .get_mut(&handle)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("native handle {:?}", handle)))
    }

    /// Removes an item from the storage
    pub fn remove(&mut self, handle: H) -> Option<T> {
        self.items.remove(&handle)
    }

    /// Returns whether the handle refers to a live item
    pub fn contains(&self, handle: H) -> bool {
        self.items.contains_key(&handle)
    }

    /// Returns the number of items in the storage
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns whether the storage is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns all live handles in order
    pub fn handles(&self) -> Vec<H> {
        self.items.keys().copied().collect()
    }

    /// Iterates over all items
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> + '_ {
        self.items.iter().map(|(h, item)| (*h, item))
    }

    /// Iterates mutably over all items
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (H, &mut T)> + '_ {
        self.items.iter_mut().map(|(h, item)| (*h, item))
    }
}

/// State of one registry slot
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<T> {
    /// No record was ever registered under this id
    Empty,

    /// A live record
    Live(T),

    /// A record existed and was removed
    Removed,
}

/// Registry storage indexed directly by shared id.
///
/// A removed record leaves a `Removed` tombstone so that sparse iteration can
/// tell "removed" apart from "never existed".
#[derive(Debug, Clone)]
pub struct Slots<T> {
    slots: Vec<Slot<T>>,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Slots<T> {
    /// Creates an empty slot table
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Stores a record at `index`, growing the table as needed.
    /// Returns the previous live record, if any.
    pub fn insert(&mut self, index: usize, value: T) -> Option<T> {
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || Slot::Empty);
        }
        match std::mem::replace(&mut self.slots[index], Slot::Live(value)) {
            Slot::Live(previous) => Some(previous),
            _ => None,
        }
    }

    /// Returns the live record at `index`
    pub fn get(&self, index: usize) -> Option<&T> {
        match self.slots.get(index) {
            Some(Slot::Live(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns the live record at `index` mutably
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        match self.slots.get_mut(index) {
            Some(Slot::Live(value)) => Some(value),
            _ => None,
        }
    }

    /// Removes the live record at `index`, leaving a tombstone
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let slot = self.slots.get_mut(index)?;
        if !matches!(slot, Slot::Live(_)) {
            return None;
        }
        match std::mem::replace(slot, Slot::Removed) {
            Slot::Live(value) => Some(value),
            _ => None,
        }
    }

    /// Returns whether a record was registered at `index` and later removed
    pub fn is_removed(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Slot::Removed))
    }

    /// Returns whether `index` holds a live record
    pub fn contains(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Number of live records
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| matches!(slot, Slot::Live(_))).count()
    }

    /// Iterates live records from the highest index down to 0
    pub fn iter_rev(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.slots.iter().enumerate().rev().filter_map(|(index, slot)| match slot {
            Slot::Live(value) => Some((index, value)),
            _ => None,
        })
    }

    /// Iterates live records in ascending index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| match slot {
            Slot::Live(value) => Some((index, value)),
            _ => None,
        })
    }

    /// Iterates live records mutably in ascending index order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> + '_ {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| match slot {
            Slot::Live(value) => Some((index, value)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_is_distinct_from_never_existed() {
        let mut slots = Slots::new();
        slots.insert(3, "a");
        assert!(!slots.is_removed(1));
        assert!(!slots.contains(1));
        assert_eq!(slots.remove(3), Some("a"));
        assert!(slots.is_removed(3));
        assert_eq!(slots.remove(3), None);
    }

    #[test]
    fn reverse_iteration_skips_holes() {
        let mut slots = Slots::new();
        slots.insert(1, 10);
        slots.insert(2, 20);
        slots.insert(5, 50);
        slots.remove(2);
        let order: Vec<usize> = slots.iter_rev().map(|(i, _)| i).collect();
        assert_eq!(order, vec![5, 1]);
    }
}
