//! Ordered string pairs.

/// An insertion-ordered list of string key/value pairs.
///
/// Keys are unique: [`set`](Self::set) overwrites an existing entry in
/// place, so the original insertion slot is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PairList {
    entries: Vec<(String, String)>,
}

impl PairList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing any existing value for `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Get the value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get the value for `key`, comparing keys ASCII case-insensitively.
    #[must_use]
    pub fn get_ignore_case(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Iterate over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Returns the number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PairList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut list = Self::new();
        for (k, v) in iter {
            list.set(k, v);
        }
        list
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for PairList {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_keeps_insertion_order() {
        let mut pairs = PairList::new();
        pairs.set("b", "1");
        pairs.set("a", "2");
        let keys: Vec<_> = pairs.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut pairs = PairList::new();
        pairs.set("a", "1");
        pairs.set("b", "2");
        pairs.set("a", "3");
        let all: Vec<_> = pairs.iter().collect();
        assert_eq!(all, vec![("a", "3"), ("b", "2")]);
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn keys_are_case_sensitive() {
        let pairs: PairList = [("Key", "x")].into_iter().collect();
        assert_eq!(pairs.get("key"), None);
        assert_eq!(pairs.get_ignore_case("key"), Some("x"));
    }

    #[test]
    fn remove_returns_value() {
        let mut pairs: PairList = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(pairs.remove("a").as_deref(), Some("1"));
        assert!(!pairs.contains_key("a"));
        assert_eq!(pairs.remove("zzz"), None);
    }

    #[test]
    fn default_is_empty() {
        let pairs = PairList::default();
        assert!(pairs.is_empty());
        assert_eq!(pairs.len(), 0);
    }
}
