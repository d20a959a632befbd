// The map engine: owns the node store and bucket directory, and
// implements lookup, insertion, erasure, iteration, rehashing and
// load-factor management.

use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use crate::entry::{Entry, OccupiedEntry, VacantEntry};
use crate::growth::{GrowthPolicy, PowerOfTwoGrowthPolicy};
use crate::iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::slot::{Slot, END};
use crate::BucketIter;

// size / bucket_count may not exceed this without triggering growth
const DEFAULT_MAX_LOAD_FACTOR: f32 = 0.875;

// Entries live contiguously in one packed Vec<Slot<K, V>>; a separate,
// much smaller Vec<usize> bucket directory holds, per bucket, the index
// of the first entry in that bucket's chain, threaded through each
// entry's own `next` index. `S` is the hasher builder (RandomState by
// default, as in std's HashMap). `G` is the growth policy, see
// GrowthPolicy.
pub struct DenseMap<K, V, S = RandomState, G = PowerOfTwoGrowthPolicy> {
    buckets: Vec<usize>,
    pub(crate) entries: Vec<Slot<K, V>>,
    hash_builder: S,
    max_load_factor: f32,
    _growth: PhantomData<G>,
}

impl<K, V> DenseMap<K, V, RandomState, PowerOfTwoGrowthPolicy> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<K, V, S, G> DenseMap<K, V, S, G>
where
    S: BuildHasher + Default,
    G: GrowthPolicy,
{
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }
}

impl<K, V, S, G> DenseMap<K, V, S, G>
where
    S: BuildHasher,
    G: GrowthPolicy,
{
    // Unlike std's HashMap::new, the bucket directory is allocated right
    // away at minimum_capacity buckets instead of waiting for the first
    // insert - bucket_count should never dip below minimum_capacity, even
    // on a fresh map.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        let max_load_factor = DEFAULT_MAX_LOAD_FACTOR;
        let needed = (capacity as f32 / max_load_factor).ceil() as usize;
        let bucket_count = G::compute_closest_capacity(needed.max(G::minimum_capacity()));
        DenseMap {
            buckets: vec![END; bucket_count],
            entries: Vec::new(),
            hash_builder,
            max_load_factor,
            _growth: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn max_bucket_count(&self) -> usize {
        isize::MAX as usize
    }

    pub fn load_factor(&self) -> f32 {
        if self.buckets.is_empty() {
            0.0
        } else {
            self.entries.len() as f32 / self.buckets.len() as f32
        }
    }

    pub fn max_load_factor(&self) -> f32 {
        self.max_load_factor
    }

    // Triggers a rehash right away if the current load factor now exceeds
    // the new one.
    pub fn set_max_load_factor(&mut self, factor: f32) {
        assert!(factor > 0.0, "max load factor must be strictly positive");
        self.max_load_factor = factor;
        if self.entries.len() as f32 > self.buckets.len() as f32 * factor {
            self.rehash(self.buckets.len());
        }
    }

    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    // shrinks the bucket directory back to minimum_capacity too, not just
    // the entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.buckets = vec![END; G::minimum_capacity()];
    }

    // The dense position of a key can move on erasure (see remove_index)
    // but never on insertion or rehash.
    pub fn get_index(&self, index: usize) -> Option<(&K, &V)> {
        self.entries.get(index).map(|s| (&s.key, &s.value))
    }

    pub fn get_index_mut(&mut self, index: usize) -> Option<(&K, &mut V)> {
        self.entries.get_mut(index).map(|s| (&s.key, &mut s.value))
    }

    // panics if b >= bucket_count()
    pub fn bucket_iter(&self, b: usize) -> BucketIter<'_, K, V> {
        BucketIter::new(&self.entries, self.buckets[b])
    }

    pub fn bucket_size(&self, b: usize) -> usize {
        self.bucket_iter(b).count()
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.entries.iter_mut(),
        }
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    fn hash_of<Q>(&self, key: &Q) -> u64
    where
        Q: Hash + ?Sized,
    {
        let mut hasher = self.hash_builder.build_hasher();
        key.hash(&mut hasher);
        hasher.finish()
    }

    fn index_for_hash(&self, hash: u64) -> usize {
        G::compute_index(hash, self.buckets.len())
    }
}

impl<K, V, S, G> DenseMap<K, V, S, G>
where
    K: Hash + Eq,
    S: BuildHasher,
    G: GrowthPolicy,
{
    // Returns the dense position of key, if present. Storage is
    // contiguous so a position doubles as the "iterator" a lookup would
    // otherwise hand back.
    pub fn find<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.buckets.is_empty() {
            return None;
        }
        let hash = self.hash_of(key);
        let mut current = self.buckets[self.index_for_hash(hash)];
        while current != END {
            let slot = &self.entries[current];
            if slot.key.borrow() == key {
                return Some(current);
            }
            current = slot.next;
        }
        None
    }

    pub fn bucket<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + ?Sized,
    {
        self.index_for_hash(self.hash_of(key))
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).is_some()
    }

    // keys are always unique, so this is just 0 or 1
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.contains_key(key) as usize
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).map(|i| &self.entries[i].value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).map(move |i| &mut self.entries[i].value)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key)
            .map(|i| (&self.entries[i].key, &self.entries[i].value))
    }

    // panics if key is not present
    pub fn at<Q>(&self, key: &Q) -> &V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).expect("no entry found for key")
    }

    // panics if key is not present
    pub fn at_mut<Q>(&mut self, key: &Q) -> &mut V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_mut(key).expect("no entry found for key")
    }

    // Leaves the existing entry alone on a hit - value is just dropped.
    // Use insert_or_assign if you want the new value to win instead.
    pub fn insert(&mut self, key: K, value: V) -> (usize, bool) {
        match self.find(&key) {
            Some(index) => (index, false),
            None => (self.insert_new_slot(key, value), true),
        }
    }

    pub fn insert_or_assign(&mut self, key: K, value: V) -> (usize, bool) {
        match self.find(&key) {
            Some(index) => {
                self.entries[index].value = value;
                (index, false)
            }
            None => (self.insert_new_slot(key, value), true),
        }
    }

    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, S, G> {
        match self.find(&key) {
            Some(index) => Entry::Occupied(OccupiedEntry::new(self, index)),
            None => Entry::Vacant(VacantEntry::new(self, key)),
        }
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find(key)?;
        self.remove_index(index)
    }

    // Unlinks the entry from its bucket chain, then swaps the last entry
    // into its place to keep the node store dense. If that moved entry
    // wasn't the one we just removed, whichever chain pointed at its old
    // position (the old last index) needs patching to point at `index`.
    pub fn remove_index(&mut self, index: usize) -> Option<(K, V)> {
        if index >= self.entries.len() {
            return None;
        }

        self.unlink_from_chain(index);
        let removed = self.entries.swap_remove(index);

        let new_len = self.entries.len();
        if index != new_len {
            self.repair_chain_pointer(new_len, index);
        }

        Some((removed.key, removed.value))
    }

    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut i = 0;
        while i < self.entries.len() {
            let keep = {
                let slot = &mut self.entries[i];
                f(&slot.key, &mut slot.value)
            };
            if keep {
                i += 1;
            } else {
                self.remove_index(i);
            }
        }
    }

    // Rebuilds the bucket directory so bucket_count is the smallest
    // admissible capacity >= max(minimum_capacity, n, size / max_load_factor).
    // No-op if that's already the current capacity. Entry positions in the
    // node store don't move, only the chain linkage does.
    pub fn rehash(&mut self, n: usize) {
        let needed_for_size = (self.entries.len() as f32 / self.max_load_factor).ceil() as usize;
        let target_min = n.max(G::minimum_capacity()).max(needed_for_size);
        let target = G::compute_closest_capacity(target_min);
        if target == self.buckets.len() {
            return;
        }

        self.buckets = vec![END; target];
        for i in 0..self.entries.len() {
            let hash = self.hash_of(&self.entries[i].key);
            let b = self.index_for_hash(hash);
            self.entries[i].next = self.buckets[b];
            self.buckets[b] = i;
        }
    }

    // reserve(count) rehashes for an absolute element count, same as
    // C++'s unordered_map::reserve(count) - not an incremental "this many
    // more" the way std's HashMap::reserve works.
    pub fn reserve(&mut self, count: usize) {
        self.rehash((count as f32 / self.max_load_factor).ceil() as usize);
    }

    pub(crate) fn insert_new_slot(&mut self, key: K, value: V) -> usize {
        self.maybe_grow();
        let hash = self.hash_of(&key);
        let b = self.index_for_hash(hash);
        let next = self.buckets[b];
        self.entries.push(Slot::new(key, value, next));
        let index = self.entries.len() - 1;
        self.buckets[b] = index;
        index
    }

    fn maybe_grow(&mut self) {
        let projected = self.entries.len() as f32 + 1.0;
        if self.buckets.is_empty() || projected > self.buckets.len() as f32 * self.max_load_factor
        {
            let new_target = (self.buckets.len() * 2).max(G::minimum_capacity());
            self.rehash(new_target);
        }
    }

    // Must run before the entry at `index` is moved or popped.
    fn unlink_from_chain(&mut self, index: usize) {
        let hash = self.hash_of(&self.entries[index].key);
        let b = self.index_for_hash(hash);

        if self.buckets[b] == index {
            self.buckets[b] = self.entries[index].next;
            return;
        }

        let mut current = self.buckets[b];
        loop {
            let next = self.entries[current].next;
            if next == index {
                self.entries[current].next = self.entries[index].next;
                return;
            }
            current = next;
        }
    }

    // Finds whichever slot (a bucket head, or another entry's next)
    // currently points at old_index and repoints it at new_index. Used
    // right after a swap-with-last move during erasure.
    fn repair_chain_pointer(&mut self, old_index: usize, new_index: usize) {
        let hash = self.hash_of(&self.entries[new_index].key);
        let b = self.index_for_hash(hash);

        if self.buckets[b] == old_index {
            self.buckets[b] = new_index;
            return;
        }

        let mut current = self.buckets[b];
        loop {
            if self.entries[current].next == old_index {
                self.entries[current].next = new_index;
                return;
            }
            current = self.entries[current].next;
        }
    }
}

// mirrors C++20's std::erase_if(container, pred), kept as a free function
// distinct from the member-style retain
pub fn erase_if<K, V, S, G, F>(map: &mut DenseMap<K, V, S, G>, mut pred: F)
where
    K: Hash + Eq,
    S: BuildHasher,
    G: GrowthPolicy,
    F: FnMut(&K, &mut V) -> bool,
{
    map.retain(|k, v| !pred(k, v));
}

impl<K, V, S, G> Default for DenseMap<K, V, S, G>
where
    S: BuildHasher + Default,
    G: GrowthPolicy,
{
    fn default() -> Self {
        Self::with_capacity_and_hasher(0, S::default())
    }
}

impl<K: Clone, V: Clone, S: Clone, G> Clone for DenseMap<K, V, S, G> {
    fn clone(&self) -> Self {
        DenseMap {
            buckets: self.buckets.clone(),
            entries: self.entries.clone(),
            hash_builder: self.hash_builder.clone(),
            max_load_factor: self.max_load_factor,
            _growth: PhantomData,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S, G> fmt::Debug for DenseMap<K, V, S, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, G> PartialEq for DenseMap<K, V, S, G>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
    G: GrowthPolicy,
{
    // same size and every key has a value-equal counterpart in the other
    // map - bucket_count and max_load_factor don't factor in
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).map_or(false, |ov| v == ov))
    }
}

impl<K, V, S, G> Eq for DenseMap<K, V, S, G>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
    G: GrowthPolicy,
{
}

impl<K, V, S, G> FromIterator<(K, V)> for DenseMap<K, V, S, G>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
    G: GrowthPolicy,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        let mut map = Self::with_capacity_and_hasher(lower, S::default());
        for (k, v) in iter {
            map.insert_or_assign(k, v);
        }
        map
    }
}

impl<K, V, S, G> Extend<(K, V)> for DenseMap<K, V, S, G>
where
    K: Hash + Eq,
    S: BuildHasher,
    G: GrowthPolicy,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert_or_assign(k, v);
        }
    }
}

impl<K, V, S, G> IntoIterator for DenseMap<K, V, S, G> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.entries.into_iter(),
        }
    }
}

impl<'a, K, V, S, G> IntoIterator for &'a DenseMap<K, V, S, G> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, G> IntoIterator for &'a mut DenseMap<K, V, S, G> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<'q, K, Q, V, S, G> Index<&'q Q> for DenseMap<K, V, S, G>
where
    K: Borrow<Q> + Hash + Eq,
    Q: Hash + Eq + ?Sized,
    S: BuildHasher,
    G: GrowthPolicy,
{
    type Output = V;

    // panics on a miss, same as std's HashMap Index impl - [] can't
    // auto-insert in Rust since Index::index only borrows &self
    fn index(&self, key: &'q Q) -> &V {
        self.at(key)
    }
}

impl<'q, K, Q, V, S, G> IndexMut<&'q Q> for DenseMap<K, V, S, G>
where
    K: Borrow<Q> + Hash + Eq,
    Q: Hash + Eq + ?Sized,
    S: BuildHasher,
    G: GrowthPolicy,
{
    fn index_mut(&mut self, key: &'q Q) -> &mut V {
        self.at_mut(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_map_has_minimum_bucket_count() {
        let map: DenseMap<&str, i32> = DenseMap::new();
        assert_eq!(map.len(), 0);
        assert_eq!(map.bucket_count(), 8);
        assert_eq!(map.load_factor(), 0.0);
        assert!(map.iter().next().is_none());
    }

    #[test]
    fn insert_and_get() {
        let mut map = DenseMap::new();
        assert_eq!(map.len(), 0);
        assert!(map.is_empty());
        map.insert("testing", 123);
        assert!(!map.is_empty());
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&"testing"), Some(&123));
        assert_eq!(map.remove(&"testing"), Some(123));
        assert_eq!(map.len(), 0);
        assert!(map.is_empty());
        assert_eq!(map.get(&"testing"), None);
    }

    #[test]
    fn insert_does_not_overwrite_on_hit() {
        let mut map = DenseMap::new();
        map.insert("a", 1);
        let (idx, inserted) = map.insert("a", 2);
        assert!(!inserted);
        assert_eq!(map.get_index(idx), Some((&"a", &1)));
    }

    #[test]
    fn insert_or_assign_overwrites() {
        let mut map = DenseMap::new();
        map.insert_or_assign("a", 1);
        let (idx, inserted) = map.insert_or_assign("a", 2);
        assert!(!inserted);
        assert_eq!(map.get_index(idx), Some((&"a", &2)));
    }

    #[test]
    fn iter_visits_all_entries() {
        let mut map = DenseMap::new();
        map.insert("a", 123);
        map.insert("b", 1231);
        map.insert("c", 1232);
        map.insert("d", 12334);
        map.insert("e", 12345);

        for (&k, &v) in &map {
            match k {
                "a" => assert_eq!(v, 123),
                "b" => assert_eq!(v, 1231),
                "c" => assert_eq!(v, 1232),
                "d" => assert_eq!(v, 12334),
                "e" => assert_eq!(v, 12345),
                _ => unreachable!(),
            }
        }

        assert_eq!((&map).into_iter().count(), 5);
    }

    #[test]
    fn clear_resets_bucket_count_to_minimum() {
        let mut map: DenseMap<i32, i32> = (0..1000).map(|i| (i, i)).collect();
        assert!(map.bucket_count() > 8);
        map.clear();
        assert_eq!(map.len(), 0);
        assert_eq!(map.bucket_count(), 8);
        assert!(map.bucket_iter(0).next().is_none());
    }

    #[test]
    fn rehash_preserves_contents_at_scale() {
        let mut map = DenseMap::new();
        for i in 0..1000 {
            map.insert(format!("test{i}"), i);
        }
        assert_eq!(map.len(), 1000);
        assert!(map.bucket_count() as f32 >= 1000.0 / 0.875);
        for i in 0..1000 {
            assert_eq!(map.get(&format!("test{i}")), Some(&i));
        }
    }

    #[test]
    fn erase_repairs_bucket_chain_after_swap() {
        let mut map = DenseMap::new();
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("c", 3);

        let first = map.find(&"a").unwrap();
        map.remove_index(first);

        assert_eq!(map.len(), 2);
        assert!(map.get(&"b").is_some());
        assert!(map.get(&"c").is_some());
        assert!(map.get(&"a").is_none());
    }

    #[test]
    fn lowering_max_load_factor_triggers_growth() {
        let mut map = DenseMap::new();
        map.insert(1, "one");
        map.insert(2, "two");
        assert_eq!(map.bucket_count(), 8);

        map.set_max_load_factor(0.2);
        assert!(map.bucket_count() >= 16);
        assert_eq!(map.get(&1), Some(&"one"));
        assert_eq!(map.get(&2), Some(&"two"));
    }

    #[test]
    fn reserve_is_an_absolute_count_not_incremental() {
        let mut map: DenseMap<i32, i32> = DenseMap::new();
        map.insert(1, 1);
        map.insert(2, 2);
        // reserve(100) means "room for 100 total", not "100 more" - a
        // second call with the same count should stay a no-op
        map.reserve(100);
        let after_first = map.bucket_count();
        assert!(after_first as f32 >= 100.0 / map.max_load_factor());
        map.reserve(100);
        assert_eq!(map.bucket_count(), after_first);
        assert_eq!(map.get(&1), Some(&1));
        assert_eq!(map.get(&2), Some(&2));
    }

    #[test]
    fn retain_keeps_density() {
        let mut map: DenseMap<i32, i32> = (0..20).map(|i| (i, i)).collect();
        map.retain(|k, _| k % 2 == 0);
        assert_eq!(map.len(), 10);
        for (k, v) in map.iter() {
            assert_eq!(k, v);
            assert_eq!(k % 2, 0);
        }
    }

    #[test]
    fn erase_if_free_function_matches_retain_inverse() {
        let mut map: DenseMap<i32, i32> = (0..20).map(|i| (i, i)).collect();
        erase_if(&mut map, |k, _| k % 2 == 0);
        assert_eq!(map.len(), 10);
        assert!(map.iter().all(|(k, _)| k % 2 == 1));
    }

    #[test]
    fn equality_ignores_bucket_count_and_max_load_factor() {
        let mut a = DenseMap::with_capacity(4);
        let mut b = DenseMap::with_capacity(1000);
        a.insert("x", 1);
        b.insert("x", 1);
        b.set_max_load_factor(0.5);
        assert_eq!(a, b);
    }

    #[test]
    fn index_panics_on_missing_key() {
        let map: DenseMap<&str, i32> = DenseMap::new();
        let result = std::panic::catch_unwind(|| map["missing"]);
        assert!(result.is_err());
    }

    #[test]
    fn transparent_lookup_avoids_building_the_owned_key() {
        let mut map: DenseMap<String, i32> = DenseMap::new();
        map.insert(String::from("hello"), 1);
        map.insert(String::from("world"), 2);

        // looked up by &str, no String ever constructed for the query
        assert_eq!(map.get("hello"), Some(&1));
        assert_eq!(map.get("missing"), None);
        assert!(map.contains_key("world"));
        assert_eq!(map.remove("world"), Some(2));
        assert_eq!(map.len(), 1);
    }
}
