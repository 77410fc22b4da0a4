//! Editor-wide mutable state shared by the managers.
//!
//! Everything the tool and plugin managers need to know about the surrounding
//! application (feature flags, permissions, classes, the current tool) lives
//! here and is passed to the editor explicitly instead of being read from
//! globals.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::config::{FeatureFlags, ToolAccessConfig};
use crate::model::{AnnotationClass, ClassId};

/// Cursor shape requested by the active tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Cursor {
    #[default]
    Default,
    Crosshair,
    Pointer,
    Grab,
    ZoomIn,
}

/// Permission context used to filter the available tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessContext {
    /// The current item is complete
    pub item_complete: bool,
    /// The user works inside a consensus stage
    pub within_consensus: bool,
    /// The user's consensus stage was marked as ready
    pub consensus_locked: bool,
    /// The active view is read-only
    pub view_readonly: bool,
}

impl AccessContext {
    /// Only the read-only allow-list applies.
    pub fn is_readonly(&self) -> bool {
        self.item_complete || (self.within_consensus && self.consensus_locked) || self.view_readonly
    }
}

/// Shared editor state.
#[derive(Debug, Default)]
pub struct EditorState {
    flags: FeatureFlags,
    tool_access: ToolAccessConfig,
    cursor: Cell<Cursor>,
    access: Cell<AccessContext>,
    current_tool: RefCell<Option<String>>,
    tool_annotation_types: RefCell<Vec<String>>,
    classes: RefCell<Vec<AnnotationClass>>,
    selected_class: Cell<Option<ClassId>>,
    preselected_class_for_tool: RefCell<HashMap<String, ClassId>>,
}

impl EditorState {
    pub fn new(flags: FeatureFlags, tool_access: ToolAccessConfig) -> Self {
        Self {
            flags,
            tool_access,
            ..Self::default()
        }
    }

    pub fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    pub fn tool_access(&self) -> &ToolAccessConfig {
        &self.tool_access
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor.get()
    }

    pub fn select_cursor(&self, cursor: Cursor) {
        self.cursor.set(cursor);
    }

    pub fn access(&self) -> AccessContext {
        self.access.get()
    }

    pub fn set_access(&self, access: AccessContext) {
        self.access.set(access);
    }

    pub fn current_tool(&self) -> Option<String> {
        self.current_tool.borrow().clone()
    }

    pub fn set_current_tool(&self, name: Option<String>) {
        *self.current_tool.borrow_mut() = name;
    }

    pub fn tool_annotation_types(&self) -> Vec<String> {
        self.tool_annotation_types.borrow().clone()
    }

    pub fn set_tool_annotation_types(&self, types: Vec<String>) {
        *self.tool_annotation_types.borrow_mut() = types;
    }

    pub fn classes(&self) -> Vec<AnnotationClass> {
        self.classes.borrow().clone()
    }

    pub fn set_classes(&self, classes: Vec<AnnotationClass>) {
        *self.classes.borrow_mut() = classes;
    }

    pub fn class(&self, id: ClassId) -> Option<AnnotationClass> {
        self.classes.borrow().iter().find(|c| c.id == id).cloned()
    }

    pub fn selected_class(&self) -> Option<ClassId> {
        self.selected_class.get()
    }

    pub fn select_class(&self, id: Option<ClassId>) {
        self.selected_class.set(id);
    }

    pub fn preselected_class_for_tool(&self, tool: &str) -> Option<ClassId> {
        self.preselected_class_for_tool.borrow().get(tool).copied()
    }

    /// Remember `class` as the class to use the next time `tool` is activated.
    pub fn preselect_class_for_tool(&self, tool: &str, class: ClassId) {
        self.preselected_class_for_tool
            .borrow_mut()
            .insert(tool.to_string(), class);
    }
}
