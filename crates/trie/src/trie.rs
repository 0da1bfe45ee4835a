use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// A single immutable trie node.
///
/// Children are shared by reference across trie versions. The value slot
/// holds a type-erased payload; a node carries a value only if some key
/// terminates exactly here.
#[derive(Default)]
struct TrieNode {
    children: HashMap<u8, Arc<TrieNode>>,
    value: Option<Arc<dyn Any + Send + Sync>>,
}

impl TrieNode {
    fn is_value_node(&self) -> bool {
        self.value.is_some()
    }
}

/// A handle to one version of a persistent trie.
///
/// Cloning is cheap (it copies the root pointer), and every `put`/`remove`
/// produces a fresh handle while leaving this one untouched.
#[derive(Clone, Default)]
pub struct Trie {
    root: Option<Arc<TrieNode>>,
}

impl Trie {
    /// Creates an empty trie.
    pub fn new() -> Self {
        Trie { root: None }
    }

    /// Looks up `key` and returns its value if one of type `T` is stored.
    ///
    /// Returns `None` when the key is absent, when the terminal node carries
    /// no value, or when the stored value has a different type.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        let mut node = self.root.as_ref()?;
        for byte in key.bytes() {
            node = node.children.get(&byte)?;
        }
        node.value.as_ref()?.downcast_ref::<T>()
    }

    /// Returns a trie in which `key` maps to `value`, sharing every subtree
    /// the key path does not touch.
    ///
    /// `T` does not need to be clonable; the value is moved into shared
    /// storage. Putting over an existing key replaces its value but keeps
    /// all keys below it.
    pub fn put<T: Send + Sync + 'static>(&self, key: &str, value: T) -> Trie {
        let value: Arc<dyn Any + Send + Sync> = Arc::new(value);
        let root = Self::put_walk(self.root.as_deref(), key.as_bytes(), value);
        Trie {
            root: Some(Arc::new(root)),
        }
    }

    /// Copy-on-write descent for `put`. Copies the node on the path (or
    /// conjures an empty one) and splices in the rebuilt child.
    fn put_walk(node: Option<&TrieNode>, key: &[u8], value: Arc<dyn Any + Send + Sync>) -> TrieNode {
        let children = node.map(|n| n.children.clone()).unwrap_or_default();
        match key.split_first() {
            None => TrieNode {
                children,
                value: Some(value),
            },
            Some((&byte, rest)) => {
                let mut copy = TrieNode {
                    children,
                    value: node.and_then(|n| n.value.clone()),
                };
                let child = Self::put_walk(copy.children.get(&byte).map(Arc::as_ref), rest, value);
                copy.children.insert(byte, Arc::new(child));
                copy
            }
        }
    }

    /// Returns a trie in which `key` has no value.
    ///
    /// Nodes left without a value and without children are dropped, and the
    /// collapse propagates upward so no valueless leaf survives. Removing an
    /// absent key returns an equivalent trie.
    pub fn remove(&self, key: &str) -> Trie {
        let root = match self.root.as_ref() {
            Some(root) => Self::remove_walk(root, key.as_bytes()),
            None => None,
        };
        Trie { root }
    }

    /// Copy-on-write removal. Returns the replacement node, or `None` when
    /// the node ends up valueless and childless so the parent drops the edge.
    fn remove_walk(node: &Arc<TrieNode>, key: &[u8]) -> Option<Arc<TrieNode>> {
        match key.split_first() {
            None => {
                if node.children.is_empty() {
                    return None;
                }
                Some(Arc::new(TrieNode {
                    children: node.children.clone(),
                    value: None,
                }))
            }
            Some((&byte, rest)) => {
                let child = match node.children.get(&byte) {
                    Some(child) => child,
                    // The key is absent; the whole subtree stays as-is.
                    None => return Some(Arc::clone(node)),
                };

                let mut copy = TrieNode {
                    children: node.children.clone(),
                    value: node.value.clone(),
                };
                match Self::remove_walk(child, rest) {
                    Some(new_child) => {
                        copy.children.insert(byte, new_child);
                    }
                    None => {
                        copy.children.remove(&byte);
                        if !copy.is_value_node() && copy.children.is_empty() {
                            return None;
                        }
                    }
                }
                Some(Arc::new(copy))
            }
        }
    }
}
