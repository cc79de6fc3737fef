//! Case-insensitive name maps.
//!
//! Variable, timer, action, plugin and function names all match
//! ASCII-case-insensitively. [`NameMap`] keeps the spelling of the first
//! insertion for listings and iterates in insertion order.

use std::collections::HashMap;

/// Insertion-ordered map with ASCII-case-insensitive string keys.
#[derive(Debug, Clone)]
pub struct NameMap<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> Default for NameMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl<V> NameMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.index.get(&fold(name)).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        match self.index.get(&fold(name)) {
            Some(&i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&fold(name))
    }

    /// Inserts or replaces. Returns the previous value, if any.
    pub fn insert(&mut self, name: &str, value: V) -> Option<V> {
        let folded = fold(name);
        match self.index.get(&folded) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.index.insert(folded, self.entries.len());
                self.entries.push((name.to_string(), value));
                None
            }
        }
    }

    /// Returns the slot for `name`, creating it with `make` when absent.
    pub fn get_or_insert_with(&mut self, name: &str, make: impl FnOnce() -> V) -> &mut V {
        let folded = fold(name);
        let i = match self.index.get(&folded) {
            Some(&i) => i,
            None => {
                let i = self.entries.len();
                self.index.insert(folded, i);
                self.entries.push((name.to_string(), make()));
                i
            }
        };
        &mut self.entries[i].1
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(name, value)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut map = NameMap::new();
        map.insert("Temp", 1);

        assert_eq!(map.get("temp"), Some(&1));
        assert_eq!(map.get("TEMP"), Some(&1));
        assert_eq!(map.get("temp2"), None);

        assert_eq!(map.insert("TEMP", 2), Some(1));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("temp"), Some(&2));
    }

    #[test]
    fn test_keeps_first_spelling_and_order() {
        let mut map = NameMap::new();
        map.insert("Beta", 1);
        map.insert("alpha", 2);
        map.insert("BETA", 3);

        let names: Vec<_> = map.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        assert_eq!(names, vec![("Beta".to_string(), 3), ("alpha".to_string(), 2)]);
    }

    #[test]
    fn test_get_or_insert_with() {
        let mut map = NameMap::new();
        *map.get_or_insert_with("x", || 1) += 1;
        *map.get_or_insert_with("X", || 100) += 1;
        assert_eq!(map.get("x"), Some(&3));

        map.clear();
        assert!(map.is_empty());
        assert!(!map.contains("x"));
    }
}
