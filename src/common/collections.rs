//! Hash collections used throughout the crate.
//!
//! Keys are small integers (pids, window ids), hashed with Fx.

pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub type HashSet<T> = rustc_hash::FxHashSet<T>;
