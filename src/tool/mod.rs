//! Tools: interactive behaviours contributed by plugins.
//!
//! A tool is registered under a unique name together with its declarative
//! [`ToolConfig`]. The [`ToolManager`] keeps exactly one tool active across the
//! whole editor.

mod manager;

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::commands::CommandBus;
use crate::events::Subscription;
use crate::keybinding::Keybinding;
use crate::model::{Annotation, AnnotationId};
use crate::state::EditorState;
use crate::view::{ActiveViewSlot, View};

pub use manager::{ToolInfo, ToolManager};

/// Behaviour of one tool.
///
/// Hooks receive the tool's own context; they run with no manager state
/// borrowed, so they may call commands or activate other tools.
pub trait Tool {
    fn activate(&self, context: &ToolContext);

    fn deactivate(&self, context: &ToolContext);

    /// Abandon any in-progress interaction (item or view switch).
    fn reset(&self, context: &ToolContext);

    /// Whether `annotation` should be drawn while this tool is active.
    fn should_render(&self, _annotation: &Annotation) -> bool {
        true
    }

    /// Whether the tool is in the middle of drawing an annotation.
    fn is_drawing(&self) -> bool {
        false
    }

    /// Save the annotation currently being drawn.
    fn confirm_current_annotation(&self, _context: &ToolContext) {}

    /// Sub-annotation tools: the annotation new sub-annotations attach to.
    fn master_annotation(&self) -> Option<AnnotationId> {
        None
    }

    /// Sub-annotation tools: attach to `master`.
    fn select_master_annotation(&self, _context: &ToolContext, _master: &Annotation) {}
}

/// Payload forwarded to sub-annotation tools on activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubAnnotationPayload {
    pub master: Annotation,
}

/// A switchable option of a tool (e.g. brush shape).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOption {
    pub id: String,
    /// Options sharing a category are mutually exclusive
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub props: serde_json::Value,
}

impl ToolOption {
    pub fn new(id: &str, category: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            category: category.map(str::to_string),
            active: false,
            props: serde_json::Value::Null,
        }
    }
}

/// Declarative descriptor of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    pub name: String,
    /// Lower sorts first; tools without a priority follow the prioritised ones
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub keybindings: Vec<Keybinding>,
    /// Annotation type names the tool creates
    #[serde(default)]
    pub annotation_types: Vec<String>,
    /// Sub-tools never show up in the available list
    #[serde(default)]
    pub sub: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub tool_options: Vec<ToolOption>,
    #[serde(default)]
    pub tool_tip: String,
}

impl ToolConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            priority: None,
            keybindings: Vec::new(),
            annotation_types: Vec::new(),
            sub: false,
            disabled: false,
            tool_options: Vec::new(),
            tool_tip: String::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_keybinding(mut self, keybinding: Keybinding) -> Self {
        self.keybindings.push(keybinding);
        self
    }

    pub fn with_annotation_types(mut self, types: &[&str]) -> Self {
        self.annotation_types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_option(mut self, option: ToolOption) -> Self {
        self.tool_options.push(option);
        self
    }

    pub fn sub(mut self) -> Self {
        self.sub = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// What a tool can reach while it runs.
pub struct ToolContext {
    pub commands: Rc<CommandBus>,
    pub state: Rc<EditorState>,
    active_view: ActiveViewSlot,
    handles: RefCell<Vec<Subscription>>,
}

impl ToolContext {
    pub fn new(commands: Rc<CommandBus>, state: Rc<EditorState>, active_view: ActiveViewSlot) -> Self {
        Self {
            commands,
            state,
            active_view,
            handles: RefCell::new(Vec::new()),
        }
    }

    /// The view tool input applies to.
    pub fn active_view(&self) -> Option<View> {
        self.active_view.borrow().clone()
    }

    /// Keep a subscription until the tool is deactivated.
    pub fn hold(&self, subscription: Subscription) {
        self.handles.borrow_mut().push(subscription);
    }

    pub fn held_handles(&self) -> usize {
        self.handles.borrow().len()
    }

    pub(crate) fn release_handles(&self) {
        let handles: Vec<Subscription> = self.handles.borrow_mut().drain(..).collect();
        for handle in handles {
            handle.release();
        }
    }
}
