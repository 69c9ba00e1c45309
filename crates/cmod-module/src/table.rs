//! Insertion-ordered name tables.
//!
//! Member tables keep declaration order (ancestors first) and let a later
//! declaration replace an earlier one in place, the same shadowing a
//! subclass applies to its superclass.

/// One named entry together with its fully qualified routing key.
#[derive(Clone)]
pub(crate) struct Entry<T> {
    pub(crate) name: String,
    pub(crate) key: String,
    pub(crate) value: T,
}

/// An ordered map from member name to value.
#[derive(Clone)]
pub(crate) struct MemberTable<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Default for MemberTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> MemberTable<T> {
    /// Insert `value` under `name`. An existing entry keeps its position and
    /// has its key and value replaced. Returns true if an entry was replaced.
    pub(crate) fn upsert(&mut self, name: &str, key: String, value: T) -> bool {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.name == name) {
            existing.key = key;
            existing.value = value;
            return true;
        }
        self.entries.push(Entry {
            name: name.to_string(),
            key,
            value,
        });
        false
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Entry<T>> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Entry<T>> + '_ {
        self.entries.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
