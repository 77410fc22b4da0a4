//! Installation and keybinding dispatch of plugins.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{EngineError, EngineResult};
use crate::keybinding::{KeyEvent, Keybinding};

use super::{Plugin, PluginConfig, PluginHost, PluginRegistrar};

struct Installed {
    config: PluginConfig,
    plugin: Rc<dyn Plugin>,
    context: Rc<PluginRegistrar>,
}

/// Plugins installed into one editor, in install order.
pub struct PluginManager {
    host: PluginHost,
    installed: RefCell<Vec<Installed>>,
}

impl PluginManager {
    pub fn new(host: PluginHost) -> Self {
        Self {
            host,
            installed: RefCell::new(Vec::new()),
        }
    }

    /// Activate a plugin and append it to the installed list.
    ///
    /// A descriptor without an implementation is a programming error and
    /// fails with [`EngineError::PluginMissing`].
    pub fn install(&self, mut config: PluginConfig) -> EngineResult<()> {
        let Some(plugin) = config.plugin.clone() else {
            log::error!("Plugin '{}' has no implementation", config.name);
            return Err(EngineError::PluginMissing {
                name: config.name.clone(),
            });
        };

        let context = Rc::new(PluginRegistrar::new(self.host.clone(), config.tools.clone()));
        plugin.activate(context.as_ref());
        config.active = true;
        log::debug!("Installed plugin '{}' v{}", config.name, config.version);

        self.installed.borrow_mut().push(Installed {
            config,
            plugin,
            context,
        });
        Ok(())
    }

    /// Replace every installed plugin with `plugins`.
    ///
    /// All previously installed plugins are deactivated before the first new
    /// one is activated. Installation stops at the first failing descriptor.
    pub fn install_all(&self, plugins: Vec<PluginConfig>) -> EngineResult<()> {
        self.cleanup();
        let count = plugins.len();
        for plugin in plugins {
            self.install(plugin)?;
        }
        log::info!("Installed {} plugins", count);
        Ok(())
    }

    /// Re-run the install of the current plugin list (after views changed).
    pub fn reinstall(&self) -> EngineResult<()> {
        let configs = self.installed_plugins();
        self.install_all(configs)
    }

    /// Dispatch a key event to plugin-level keybindings.
    pub fn handle_keybindings(&self, event: &mut KeyEvent) {
        let bindings: Vec<Keybinding> = self
            .installed
            .borrow()
            .iter()
            .flat_map(|p| p.config.keybindings.iter().cloned())
            .collect();

        for binding in bindings {
            if binding.matches(event) {
                for command in binding.action.commands() {
                    self.host.commands.call(command, &[]);
                }
                event.prevent_default();
            }
        }
    }

    /// Deactivate and forget every installed plugin.
    pub fn cleanup(&self) {
        let installed: Vec<Installed> = self.installed.borrow_mut().drain(..).collect();
        for entry in installed {
            entry.plugin.deactivate(entry.context.as_ref());
            log::debug!("Deactivated plugin '{}'", entry.config.name);
        }
    }

    pub fn installed_plugins(&self) -> Vec<PluginConfig> {
        self.installed
            .borrow()
            .iter()
            .map(|p| p.config.clone())
            .collect()
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.installed.borrow().iter().any(|p| p.config.name == name)
    }
}
