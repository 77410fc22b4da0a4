use std::cell::Cell;
use std::rc::Rc;

use crate::config::EngineConfig;
use crate::editor::Editor;
use crate::layout::{LayoutConfig, LayoutKind, ViewConfig};
use crate::plugins::{builtin_plugins, ZOOM_TOOL};
use crate::state::Cursor;
use crate::test_support::{image_item, Harness, ManualScheduler};
use crate::tool::{Tool, ToolConfig, ToolContext};

#[derive(Default)]
struct CountingTool {
    activations: Cell<u32>,
    deactivations: Cell<u32>,
    resets: Cell<u32>,
}

impl Tool for CountingTool {
    fn activate(&self, _context: &ToolContext) {
        self.activations.set(self.activations.get() + 1);
    }

    fn deactivate(&self, _context: &ToolContext) {
        self.deactivations.set(self.deactivations.get() + 1);
    }

    fn reset(&self, _context: &ToolContext) {
        self.resets.set(self.resets.get() + 1);
    }
}

fn two_view_editor(h: &Harness) -> Rc<Editor> {
    let editor = Editor::new(
        EngineConfig::default(),
        h.services.clone(),
        Rc::new(ManualScheduler::default()),
    );
    editor
        .init(LayoutConfig {
            kind: LayoutKind::Vertical,
            views: vec![ViewConfig::new(image_item(1)), ViewConfig::new(image_item(2))],
        })
        .unwrap();
    editor
}

fn register(editor: &Editor, name: &str) -> Rc<CountingTool> {
    let tool = Rc::new(CountingTool::default());
    assert!(editor.tools().register_tool(name, tool.clone(), ToolConfig::new(name)));
    tool
}

#[test]
fn test_switching_tools_keeps_exactly_one_active() {
    let h = Harness::new();
    let editor = two_view_editor(&h);
    let x = register(&editor, "x_tool");
    let y = register(&editor, "y_tool");

    assert!(editor.call_command("x_tool.activate", &[]));
    assert!(editor.call_command("y_tool.activate", &[]));
    assert!(editor.call_command("y_tool.activate", &[]));

    assert_eq!(editor.tools().active_tools(), vec!["y_tool".to_string()]);
    assert_eq!(x.activations.get(), 1);
    assert_eq!(x.deactivations.get(), 1);
    assert_eq!(y.activations.get(), 1);
    assert_eq!(editor.state().current_tool().as_deref(), Some("y_tool"));

    // activation through the command deselects on the active view only
    assert!(h.annotations.for_view(0).unwrap().deselections.get() >= 1);
    assert_eq!(h.annotations.for_view(1).unwrap().deselections.get(), 0);
}

#[test]
fn test_changing_active_view_resets_active_tool() {
    let h = Harness::new();
    let editor = two_view_editor(&h);
    let x = register(&editor, "x_tool");
    editor.call_command("x_tool.activate", &[]);

    editor.set_active_view(0).unwrap();
    assert_eq!(x.resets.get(), 0);

    editor.set_active_view(1).unwrap();
    assert_eq!(x.resets.get(), 1);
    assert_eq!(editor.active_view().map(|v| v.id()), Some(1));
    assert!(editor.tools().is_active("x_tool"));
}

#[test]
fn test_builtin_zoom_tool_restores_cursor() {
    let h = Harness::new();
    let editor = two_view_editor(&h);
    editor.install_all_plugins(builtin_plugins()).unwrap();
    register(&editor, "x_tool");

    assert!(editor.tools().contains(ZOOM_TOOL));
    editor.call_command("zoom_tool.activate", &[]);
    assert_eq!(editor.state().cursor(), Cursor::ZoomIn);

    editor.call_command("x_tool.activate", &[]);
    assert_eq!(editor.state().cursor(), Cursor::Default);
    assert_eq!(editor.tools().active_tools(), vec!["x_tool".to_string()]);

    editor.plugins().cleanup();
    assert!(!editor.tools().contains(ZOOM_TOOL));
}
