// Entry API, mirroring std's HashMap::entry for in-place lazy insertion.

use std::hash::{BuildHasher, Hash};

use crate::growth::GrowthPolicy;
use crate::map::DenseMap;

pub enum Entry<'a, K, V, S, G> {
    Occupied(OccupiedEntry<'a, K, V, S, G>),
    Vacant(VacantEntry<'a, K, V, S, G>),
}

impl<'a, K, V, S, G> Entry<'a, K, V, S, G>
where
    K: Hash + Eq,
    S: BuildHasher,
    G: GrowthPolicy,
{
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    // unlike or_insert, never constructs V at all on a hit
    pub fn or_insert_with<F: FnOnce() -> V>(self, f: F) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(f()),
        }
    }

    pub fn or_insert_with_key<F: FnOnce(&K) -> V>(self, f: F) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let value = f(entry.key());
                entry.insert(value)
            }
        }
    }

    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }

    // runs f against the value if occupied, then hands self back so it
    // can chain into or_insert
    pub fn and_modify<F: FnOnce(&mut V)>(mut self, f: F) -> Self {
        if let Entry::Occupied(ref mut entry) = self {
            f(entry.get_mut());
        }
        self
    }
}

impl<'a, K, V, S, G> Entry<'a, K, V, S, G>
where
    K: Hash + Eq,
    V: Default,
    S: BuildHasher,
    G: GrowthPolicy,
{
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(V::default)
    }
}

pub struct OccupiedEntry<'a, K, V, S, G> {
    map: &'a mut DenseMap<K, V, S, G>,
    index: usize,
}

impl<'a, K, V, S, G> OccupiedEntry<'a, K, V, S, G>
where
    K: Hash + Eq,
    S: BuildHasher,
    G: GrowthPolicy,
{
    pub(crate) fn new(map: &'a mut DenseMap<K, V, S, G>, index: usize) -> Self {
        OccupiedEntry { map, index }
    }

    pub fn key(&self) -> &K {
        &self.map.entries[self.index].key
    }

    pub fn get(&self) -> &V {
        &self.map.entries[self.index].value
    }

    pub fn get_mut(&mut self) -> &mut V {
        &mut self.map.entries[self.index].value
    }

    pub fn into_mut(self) -> &'a mut V {
        &mut self.map.entries[self.index].value
    }

    pub fn insert(&mut self, value: V) -> V {
        std::mem::replace(&mut self.map.entries[self.index].value, value)
    }

    // swaps the victim with the last entry and repairs whichever chain
    // pointed at it, same as DenseMap::remove_index
    pub fn remove(self) -> V {
        self.map
            .remove_index(self.index)
            .expect("entry index must be valid")
            .1
    }

    pub fn remove_entry(self) -> (K, V) {
        self.map
            .remove_index(self.index)
            .expect("entry index must be valid")
    }
}

pub struct VacantEntry<'a, K, V, S, G> {
    map: &'a mut DenseMap<K, V, S, G>,
    key: K,
}

impl<'a, K, V, S, G> VacantEntry<'a, K, V, S, G> {
    pub(crate) fn new(map: &'a mut DenseMap<K, V, S, G>, key: K) -> Self {
        VacantEntry { map, key }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn into_key(self) -> K {
        self.key
    }
}

impl<'a, K, V, S, G> VacantEntry<'a, K, V, S, G>
where
    K: Hash + Eq,
    S: BuildHasher,
    G: GrowthPolicy,
{
    pub fn insert(self, value: V) -> &'a mut V {
        let index = self.map.insert_new_slot(self.key, value);
        &mut self.map.entries[index].value
    }
}
