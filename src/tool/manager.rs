//! Tool registry and activation state machine.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::commands::CommandBus;
use crate::constants::{EDIT_TOOL, RASTER_CAPABLE_TOOLS, SELECTION_PRESERVING_TOOL};
use crate::events::Subscribers;
use crate::keybinding::{BindingScope, KeyEvent, Keybinding};
use crate::model::{AnnotationClass, ClassId};
use crate::state::{Cursor, EditorState};
use crate::view::ActiveViewSlot;

use super::{SubAnnotationPayload, Tool, ToolConfig, ToolContext, ToolOption};

/// What the UI needs to list a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub tool_tip: String,
    pub active: bool,
    pub priority: Option<i32>,
}

struct ToolEntry {
    name: String,
    tool: Rc<dyn Tool>,
    config: ToolConfig,
    context: Rc<ToolContext>,
    active: bool,
}

impl ToolEntry {
    fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name.clone(),
            tool_tip: self.config.tool_tip.clone(),
            active: self.active,
            priority: self.config.priority,
        }
    }
}

/// Registry of every tool of one editor.
///
/// At most one entry is active at a time. Hooks are always called with the
/// registry unborrowed.
pub struct ToolManager {
    entries: RefCell<Vec<ToolEntry>>,
    previous: RefCell<Option<String>>,
    available: RefCell<Vec<ToolInfo>>,
    commands: Rc<CommandBus>,
    state: Rc<EditorState>,
    active_view: ActiveViewSlot,
    weak_self: Weak<ToolManager>,
    /// Emitted with the new list whenever availability is recomputed
    pub available_tools_changed: Subscribers<Vec<ToolInfo>>,
    /// Emitted with the tool name after every successful activation
    pub tool_activated: Subscribers<String>,
}

impl ToolManager {
    pub fn new(
        commands: Rc<CommandBus>,
        state: Rc<EditorState>,
        active_view: ActiveViewSlot,
    ) -> Rc<Self> {
        Rc::new_cyclic(|weak_self| Self {
            entries: RefCell::new(Vec::new()),
            previous: RefCell::new(None),
            available: RefCell::new(Vec::new()),
            commands,
            state,
            active_view,
            weak_self: weak_self.clone(),
            available_tools_changed: Subscribers::new(),
            tool_activated: Subscribers::new(),
        })
    }

    /// Register `tool` under `name`, replacing a tool of the same name.
    ///
    /// Also registers the `{name}.activate` command. Returns false (and logs)
    /// if `config.name` differs from `name`.
    pub fn register_tool(&self, name: &str, tool: Rc<dyn Tool>, config: ToolConfig) -> bool {
        if self.contains(name) {
            self.unregister_tool(name);
        }

        if config.name != name {
            log::warn!(
                "Registering tool with name '{}' but config name '{}'",
                name,
                config.name
            );
            return false;
        }

        let weak = self.weak_self.clone();
        let tool_name = name.to_string();
        self.commands
            .register(&format!("{name}.activate"), move |args| {
                let Some(manager) = weak.upgrade() else {
                    return;
                };
                let payload = args
                    .first()
                    .and_then(|v| serde_json::from_value::<SubAnnotationPayload>(v.clone()).ok());
                manager.activate_tool_with_store(&tool_name, payload.as_ref());
            });

        let context = Rc::new(ToolContext::new(
            Rc::clone(&self.commands),
            Rc::clone(&self.state),
            Rc::clone(&self.active_view),
        ));
        self.entries.borrow_mut().push(ToolEntry {
            name: name.to_string(),
            tool,
            config,
            context,
            active: false,
        });
        log::debug!("Registered tool '{}'", name);

        self.define_available_tools();
        true
    }

    /// Remove a tool, deactivating it first if it is active.
    pub fn unregister_tool(&self, name: &str) {
        let Some(active) = self.with_entry(name, |e| e.active) else {
            return;
        };
        if active {
            self.deactivate_tool(name);
        }

        self.entries.borrow_mut().retain(|e| e.name != name);
        self.define_available_tools();
        self.commands.unregister(&format!("{name}.activate"));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.borrow().iter().any(|e| e.name == name)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.with_entry(name, |e| e.active).unwrap_or(false)
    }

    /// Names of the active entries (never more than one).
    pub fn active_tools(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.active)
            .map(|e| e.name.clone())
            .collect()
    }

    /// Name of the active tool.
    pub fn current_tool(&self) -> Option<String> {
        self.entries
            .borrow()
            .iter()
            .find(|e| e.active)
            .map(|e| e.name.clone())
    }

    pub fn find_by_name(&self, name: &str) -> Option<ToolInfo> {
        self.with_entry(name, ToolEntry::info)
    }

    /// Tool that creates annotations of the given main type.
    pub fn find_by_main_annotation_type_name(&self, type_name: &str) -> Option<ToolInfo> {
        match type_name {
            "cuboid" => self.find_by_name("bounding_box_3d_tool"),
            "line" => self.find_by_name("polyline_tool"),
            other => self.find_by_name(&format!("{other}_tool")),
        }
    }

    pub fn config(&self, name: &str) -> Option<ToolConfig> {
        self.with_entry(name, |e| e.config.clone())
    }

    pub fn tool(&self, name: &str) -> Option<Rc<dyn Tool>> {
        self.with_entry(name, |e| Rc::clone(&e.tool))
    }

    pub fn context(&self, name: &str) -> Option<Rc<ToolContext>> {
        self.with_entry(name, |e| Rc::clone(&e.context))
    }

    /// Deactivate one tool: run its hook and release its subscriptions.
    pub fn deactivate_tool(&self, name: &str) {
        let Some((tool, context)) = self.with_entry(name, |e| (Rc::clone(&e.tool), Rc::clone(&e.context)))
        else {
            return;
        };
        tool.deactivate(&context);
        self.set_active(name, false);
        context.release_handles();
        log::debug!("Deactivated tool '{}'", name);
    }

    /// Activate a tool, deactivating every other active tool first.
    ///
    /// Does nothing for unknown or disabled tools. The `activate` hook is not
    /// re-run for a tool that is already active.
    pub fn activate_tool(&self, name: &str, payload: Option<&SubAnnotationPayload>) -> bool {
        let Some((tool, context, disabled, already_active)) = self.with_entry(name, |e| {
            (Rc::clone(&e.tool), Rc::clone(&e.context), e.config.disabled, e.active)
        }) else {
            log::warn!("Tool with name '{}' is not registered", name);
            return false;
        };
        if disabled {
            return false;
        }

        let others: Vec<String> = self
            .entries
            .borrow()
            .iter()
            .filter(|e| e.name != name && e.active)
            .map(|e| e.name.clone())
            .collect();
        for other in others {
            *self.previous.borrow_mut() = Some(other.clone());
            self.deactivate_tool(&other);
            self.state.select_cursor(Cursor::Default);
        }

        if !already_active {
            tool.activate(&context);
            self.set_active(name, true);
            log::debug!("Activated tool '{}'", name);
        }

        if let Some(payload) = payload {
            tool.select_master_annotation(&context, &payload.master);
        }

        self.tool_activated.emit(&name.to_string());
        true
    }

    /// Activate a tool on behalf of the user and sync the editor state.
    ///
    /// Deselects annotations (unless the tool preserves selection), records
    /// the tool and its annotation types and picks a matching class.
    pub fn activate_tool_with_store(&self, name: &str, payload: Option<&SubAnnotationPayload>) {
        if self.current_tool().as_deref() == Some(name) {
            if let Some(payload) = payload {
                if let Some((tool, context)) =
                    self.with_entry(name, |e| (Rc::clone(&e.tool), Rc::clone(&e.context)))
                {
                    if tool.master_annotation().as_ref() != Some(&payload.master.id) {
                        tool.select_master_annotation(&context, &payload.master);
                    }
                }
            }
            return;
        }

        self.activate_tool(name, payload);

        if name != SELECTION_PRESERVING_TOOL {
            let view = self.active_view.borrow().clone();
            if let Some(view) = view {
                view.annotation_manager().deselect_all_annotations();
            }
        }

        let Some(current) = self.current_tool() else {
            return;
        };
        self.state.set_current_tool(Some(current));
        self.state
            .set_tool_annotation_types(self.current_annotation_types());
        self.auto_select_class();
    }

    /// Re-activate the tool that was active before the last switch.
    pub fn activate_previous_tool(&self) {
        let previous = self.previous.borrow_mut().take();
        if let Some(previous) = previous {
            self.activate_tool_with_store(&previous, None);
        }
    }

    /// Activate the best available tool for drawing with `class_id`.
    ///
    /// Prefers the current tool when it supports the class's main type.
    pub fn activate_tool_for_class(&self, class_id: ClassId) {
        let Some(class) = self.state.class(class_id) else {
            return;
        };
        let available = self.available.borrow().clone();
        let candidates: Vec<String> = available
            .iter()
            .filter(|info| {
                self.with_entry(&info.name, |e| e.config.annotation_types.contains(&class.main_type))
                    .unwrap_or(false)
            })
            .map(|info| info.name.clone())
            .collect();

        let current = self.current_tool();
        let Some(tool) = candidates
            .iter()
            .find(|c| Some(c.as_str()) == current.as_deref())
            .or(candidates.first())
            .cloned()
        else {
            return;
        };

        self.state.preselect_class_for_tool(&tool, class.id);
        self.activate_tool_with_store(&tool, None);
    }

    /// Run the `reset` hook of the active tool.
    pub fn reset_current_tool(&self) {
        let current = self.entries.borrow().iter().find(|e| e.active).map(|e| {
            (Rc::clone(&e.tool), Rc::clone(&e.context))
        });
        if let Some((tool, context)) = current {
            tool.reset(&context);
        }
    }

    /// Annotation types the active tool creates.
    pub fn current_annotation_types(&self) -> Vec<String> {
        let Some((name, mut types)) = self
            .entries
            .borrow()
            .iter()
            .find(|e| e.active)
            .map(|e| (e.name.clone(), e.config.annotation_types.clone()))
        else {
            return Vec::new();
        };

        if name == EDIT_TOOL {
            if let Some(class) = self.selected_annotation_class() {
                return vec![class.main_type];
            }
        }

        if self.state.flags().rasters
            && RASTER_CAPABLE_TOOLS.contains(&name.as_str())
            && !types.iter().any(|t| t == "mask")
        {
            types.push("mask".to_string());
        }
        types
    }

    fn selected_annotation_class(&self) -> Option<AnnotationClass> {
        let view = self.active_view.borrow().clone()?;
        let selected = view.annotation_manager().selected_annotation()?;
        self.state.class(selected.class_id?)
    }

    fn auto_select_class(&self) {
        let Some(tool) = self.current_tool() else {
            return;
        };

        if tool == EDIT_TOOL {
            if let Some(class) = self.selected_annotation_class() {
                self.state.select_class(Some(class.id));
            }
            return;
        }

        let types = self.state.tool_annotation_types();
        if types.is_empty() {
            return;
        }
        let supports = |class: &AnnotationClass| types.contains(&class.main_type);

        let selected = self.state.selected_class().and_then(|id| self.state.class(id));
        if selected.as_ref().is_some_and(supports) {
            return;
        }

        let preselected = self
            .state
            .preselected_class_for_tool(&tool)
            .and_then(|id| self.state.class(id))
            .filter(supports);
        let class = preselected.or_else(|| self.state.classes().into_iter().find(|c| supports(c)));
        self.state.select_class(class.map(|c| c.id));
    }

    /// Recompute the list of tools the user may pick.
    ///
    /// Sub-tools are never listed. Read-only and consensus contexts restrict
    /// the list to their allow-lists. Prioritised tools come first, ascending;
    /// the rest keep registration order.
    pub fn define_available_tools(&self) {
        let access = self.state.access();
        let allow = self.state.tool_access();
        let readonly = access.is_readonly();

        let mut tools: Vec<ToolInfo> = self
            .entries
            .borrow()
            .iter()
            .filter(|e| !e.config.sub)
            .filter(|e| {
                if readonly {
                    allow.readonly_tools.contains(&e.name)
                } else if access.within_consensus {
                    allow.consensus_tools.contains(&e.name)
                } else {
                    true
                }
            })
            .map(ToolEntry::info)
            .collect();
        tools.sort_by_key(|t| match t.priority {
            Some(p) => (0, p),
            None => (1, 0),
        });

        *self.available.borrow_mut() = tools.clone();
        self.available_tools_changed.emit(&tools);
    }

    pub fn available_tools(&self) -> Vec<ToolInfo> {
        self.available.borrow().clone()
    }

    /// Dispatch a key event to tool keybindings.
    ///
    /// Bindings scoped to `active` only fire for the active tool. Every
    /// matching binding calls its commands and marks the event handled.
    pub fn handle_keybindings(&self, event: &mut KeyEvent) {
        let bindings: Vec<Keybinding> = self
            .entries
            .borrow()
            .iter()
            .flat_map(|e| {
                e.config
                    .keybindings
                    .iter()
                    .filter(move |kb| kb.when != Some(BindingScope::Active) || e.active)
                    .cloned()
            })
            .collect();

        for binding in bindings {
            if binding.matches(event) {
                for command in binding.action.commands() {
                    self.commands.call(command, &[]);
                }
                event.prevent_default();
            }
        }
    }

    /// Options of the active tool.
    pub fn tool_options(&self) -> Vec<ToolOption> {
        self.with_current(|config| config.tool_options.clone())
            .unwrap_or_default()
    }

    /// Activate an option of the active tool, deactivating the other options
    /// of its category.
    pub fn activate_tool_option(&self, id: &str) {
        self.with_current(|config| {
            let Some(category) = config
                .tool_options
                .iter()
                .find(|o| o.id == id)
                .map(|o| o.category.clone())
            else {
                return;
            };
            for option in config.tool_options.iter_mut() {
                if option.id == id {
                    option.active = true;
                } else if category.is_some() && option.category == category {
                    option.active = false;
                }
            }
        });
    }

    pub fn deactivate_tool_option(&self, id: &str) {
        self.with_current(|config| {
            if let Some(option) = config.tool_options.iter_mut().find(|o| o.id == id) {
                option.active = false;
            }
        });
    }

    pub fn deactivate_tool_options(&self) {
        self.with_current(|config| {
            for option in config.tool_options.iter_mut() {
                option.active = false;
            }
        });
    }

    pub fn set_tool_option_props(&self, id: &str, props: serde_json::Value) {
        self.with_current(|config| {
            if let Some(option) = config.tool_options.iter_mut().find(|o| o.id == id) {
                option.props = props;
            }
        });
    }

    /// Forget the available list.
    pub fn cleanup(&self) {
        self.available.borrow_mut().clear();
    }

    fn with_entry<R>(&self, name: &str, f: impl FnOnce(&ToolEntry) -> R) -> Option<R> {
        self.entries.borrow().iter().find(|e| e.name == name).map(f)
    }

    fn with_current<R>(&self, f: impl FnOnce(&mut ToolConfig) -> R) -> Option<R> {
        self.entries
            .borrow_mut()
            .iter_mut()
            .find(|e| e.active)
            .map(|e| f(&mut e.config))
    }

    fn set_active(&self, name: &str, active: bool) {
        if let Some(entry) = self.entries.borrow_mut().iter_mut().find(|e| e.name == name) {
            entry.active = active;
        }
    }
}
