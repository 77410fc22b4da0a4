//! String-keyed command bus shared by plugins, tools and the editor.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

/// A command handler. Arguments are untyped JSON values.
pub type CommandHandler = Rc<dyn Fn(&[Value])>;

/// Global command registry of one editor.
#[derive(Default)]
pub struct CommandBus {
    handlers: RefCell<HashMap<String, CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any handler with the same name.
    pub fn register(&self, name: &str, handler: impl Fn(&[Value]) + 'static) {
        self.handlers
            .borrow_mut()
            .insert(name.to_string(), Rc::new(handler));
    }

    pub fn unregister(&self, name: &str) {
        self.handlers.borrow_mut().remove(name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.borrow().contains_key(name)
    }

    /// Run a command. Unknown names are logged and ignored.
    ///
    /// Returns whether a handler ran.
    pub fn call(&self, name: &str, args: &[Value]) -> bool {
        // clone out so the handler can register or call other commands
        let handler = self.handlers.borrow().get(name).cloned();
        match handler {
            Some(handler) => {
                handler(args);
                true
            }
            None => {
                log::warn!("No plugin registered for command '{}'", name);
                false
            }
        }
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for CommandBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBus")
            .field("commands", &self.names())
            .finish()
    }
}
