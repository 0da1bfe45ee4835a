//! A persistent (copy-on-write) trie keyed by byte strings.
//!
//! Every mutating operation returns a new [`Trie`] that shares all untouched
//! subtrees with its predecessor, so old versions stay readable forever and
//! concurrent readers need no synchronization.
mod trie;

pub use trie::Trie;
