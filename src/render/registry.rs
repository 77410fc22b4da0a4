//! Name-keyed registry of plugin contributions.

use std::cell::RefCell;
use std::rc::Rc;

/// Registry of named implementations of one capability.
///
/// Entries keep registration order so iteration is deterministic. The
/// registry is shared behind `Rc` by the plugin contexts, hence the interior
/// mutability.
pub struct Registry<T: ?Sized> {
    kind: &'static str,
    entries: RefCell<Vec<(String, Rc<T>)>>,
}

impl<T: ?Sized> Registry<T> {
    /// Create an empty registry. `kind` only appears in log messages.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: RefCell::new(Vec::new()),
        }
    }

    /// Register an implementation, replacing one with the same name.
    pub fn register(&self, name: &str, value: Rc<T>) {
        let mut entries = self.entries.borrow_mut();
        match entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => {
                log::debug!("Replacing {} '{}'", self.kind, name);
                entry.1 = value;
            }
            None => entries.push((name.to_string(), value)),
        }
    }

    /// Register an implementation unless the name is taken.
    ///
    /// Returns false (and logs) when an implementation is already registered.
    pub fn register_unique(&self, name: &str, value: Rc<T>) -> bool {
        if self.contains(name) {
            log::warn!("'{}' is already registered as {}", name, self.kind);
            return false;
        }
        self.entries.borrow_mut().push((name.to_string(), value));
        true
    }

    /// Remove an implementation. Returns false for unknown names.
    pub fn unregister(&self, name: &str) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(n, _)| n != name);
        let removed = entries.len() != before;
        if !removed {
            log::warn!("Trying to unregister unknown {} '{}'", self.kind, name);
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<Rc<T>> {
        self.entries
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| Rc::clone(v))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.borrow().iter().any(|(n, _)| n == name)
    }

    /// All entries in registration order.
    pub fn all(&self) -> Vec<(String, Rc<T>)> {
        self.entries
            .borrow()
            .iter()
            .map(|(n, v)| (n.clone(), Rc::clone(v)))
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.borrow().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}
