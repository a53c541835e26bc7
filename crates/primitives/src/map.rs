//! Map types keyed by the integer-like ids of this crate.
//!
//! The ids are already well distributed, so hashing them again
//! would be wasted work; `nohash-hasher` passes them through.

use core::hash::{BuildHasherDefault, Hash};
use nohash_hasher::{IsEnabled, NoHashHasher};

/// A map with integer-like keys that are not hashed before use.
pub type IntMap<K, V> = hashbrown::HashMap<K, V, BuildHasherDefault<NoHashHasher<K>>>;

/// A set with integer-like keys that are not hashed before use.
pub type IntSet<K> = hashbrown::HashSet<K, BuildHasherDefault<NoHashHasher<K>>>;

/// Extension trait to collect into an [`IntMap`] without naming the hasher.
pub trait IntMapExt<K, V> {
    fn int_map(self) -> IntMap<K, V>;
}

impl<K: IsEnabled + Hash + Eq, V, I: Iterator<Item = (K, V)>> IntMapExt<K, V> for I {
    fn int_map(self) -> IntMap<K, V> {
        self.collect()
    }
}
