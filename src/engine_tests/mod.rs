//! Scenario tests driving views and the editor end to end through the
//! controllable collaborators in `test_support`.

mod frame_loading;
mod item_switching;
mod playback;
mod tools;
mod zoom;

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::EngineConfig;
use crate::events::Subscription;
use crate::index_map::FrameIndex;
use crate::test_support::Harness;
use crate::view::View;

fn view(h: &Harness) -> View {
    View::new(0, &h.services, &EngineConfig::default())
}

/// Record every frame index a view reports as loaded.
fn record_frame_loads(view: &View) -> (Rc<RefCell<Vec<FrameIndex>>>, Subscription) {
    let loaded = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&loaded);
    let subscription = view
        .frame_loaded()
        .subscribe(move |index| sink.borrow_mut().push(*index));
    (loaded, subscription)
}
