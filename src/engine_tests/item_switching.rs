use std::cell::RefCell;
use std::rc::Rc;

use super::view;
use crate::error::EngineError;
use crate::index_map::{FrameIndex, ItemGroup};
use crate::item_loader::LoadOutcome;
use crate::test_support::{image_item, loaded_image, loaded_video, lq_url, video_item, Harness};

#[test]
fn test_later_item_wins_when_it_resolves_first() {
    let mut h = Harness::new();
    let view = view(&h);
    let applied = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&applied);
    let _loaded = view.item_loaded().subscribe(move |id| sink.borrow_mut().push(*id));

    let a = view.set_item(image_item(1), None);
    let b = view.set_item(image_item(2), None);
    assert_eq!(h.resolver.calls(), vec![1, 2]);

    h.resolver.respond(2, loaded_image(2, 20, 10));
    h.resolver.respond(1, loaded_image(1, 5, 5));

    assert_eq!(h.pool.run_until(b).unwrap(), LoadOutcome::Applied);
    assert_eq!(h.pool.run_until(a).unwrap(), LoadOutcome::Superseded);
    assert_eq!(view.loaded_image().map(|i| i.id), Some(2));
    assert_eq!(view.item().map(|i| i.id), Some(2));
    assert_eq!(*applied.borrow(), vec![2]);
}

#[test]
fn test_earlier_item_resolving_first_is_never_shown() {
    let mut h = Harness::new();
    let view = view(&h);
    let applied = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&applied);
    let _loaded = view.item_loaded().subscribe(move |id| sink.borrow_mut().push(*id));

    let a = view.set_item(image_item(1), None);
    let b = view.set_item(image_item(2), None);

    h.resolver.respond(1, loaded_image(1, 5, 5));
    assert_eq!(h.pool.run_until(a).unwrap(), LoadOutcome::Superseded);
    assert!(view.loaded_image().is_none());
    assert!(view.is_loading());

    h.resolver.respond(2, loaded_image(2, 20, 10));
    assert_eq!(h.pool.run_until(b).unwrap(), LoadOutcome::Applied);
    assert_eq!(view.loaded_image().map(|i| i.width), Some(20));
    assert_eq!(*applied.borrow(), vec![2]);
}

#[test]
fn test_superseded_video_requests_no_frames() {
    let mut h = Harness::new();
    let view = view(&h);

    let a = view.set_item(video_item(1), None);
    let b = view.set_item(image_item(2), None);
    h.resolver.respond(1, loaded_video(1, 5));
    h.resolver.respond(2, loaded_image(2, 8, 8));
    h.settle();

    assert_eq!(h.pool.run_until(a).unwrap(), LoadOutcome::Superseded);
    assert_eq!(h.pool.run_until(b).unwrap(), LoadOutcome::Applied);
    assert!(h.decoder.calls().is_empty());
    assert!(view.loaded_video().is_none());
}

#[test]
fn test_repeating_pending_item_is_unchanged() {
    let mut h = Harness::new();
    let view = view(&h);

    let first = view.set_item(image_item(1), None);
    let repeat = view.set_item(image_item(1), None);
    assert_eq!(h.pool.run_until(repeat).unwrap(), LoadOutcome::Unchanged);
    assert_eq!(h.resolver.calls(), vec![1]);

    h.resolver.respond(1, loaded_image(1, 5, 5));
    assert_eq!(h.pool.run_until(first).unwrap(), LoadOutcome::Applied);

    let again = view.set_item(image_item(1), None);
    assert_eq!(h.pool.run_until(again).unwrap(), LoadOutcome::Unchanged);
    assert_eq!(h.resolver.calls(), vec![1]);
}

#[test]
fn test_failed_resolve_keeps_previous_media() {
    let mut h = Harness::new();
    let view = view(&h);

    let shown = view.set_item(image_item(2), None);
    h.resolver.respond(2, loaded_image(2, 20, 10));
    h.pool.run_until(shown).unwrap();

    let failing = view.set_item(image_item(3), None);
    h.resolver.fail(3);
    let err = h.pool.run_until(failing).unwrap_err();
    assert!(matches!(err, EngineError::MediaResolution { item_id: 3, .. }));
    assert_eq!(view.item().map(|i| i.id), Some(2));
    assert!(!view.is_loading());

    // the failed item can be requested again
    let retry = view.set_item(image_item(3), None);
    h.resolver.respond(3, loaded_image(3, 1, 1));
    assert_eq!(h.pool.run_until(retry).unwrap(), LoadOutcome::Applied);
    assert_eq!(h.resolver.calls(), vec![2, 3, 3]);
}

#[test]
fn test_clear_supersedes_pending_item() {
    let mut h = Harness::new();
    let view = view(&h);

    let pending = view.set_item(image_item(1), None);
    view.clear();
    h.resolver.respond(1, loaded_image(1, 5, 5));

    assert_eq!(h.pool.run_until(pending).unwrap(), LoadOutcome::Superseded);
    assert!(view.item().is_none());
    assert!(!view.is_loading());
}

#[test]
fn test_frames_of_replaced_video_are_dropped() {
    let mut h = Harness::new();
    let view = view(&h);

    let first = view.set_item(video_item(1), None);
    h.resolver.respond(1, loaded_video(1, 4));
    h.pool.run_until(first).unwrap();
    h.settle();
    assert_eq!(h.decoder.outstanding().len(), 3);

    let second = view.set_item(video_item(2), None);
    h.resolver.respond(2, loaded_video(2, 4));
    h.pool.run_until(second).unwrap();
    h.settle();

    let (loaded, _subscription) = super::record_frame_loads(&view);
    for i in 0..3 {
        assert!(h.decoder.complete(&lq_url(1, i)));
    }
    h.settle();

    let video = view.loaded_video().unwrap();
    assert_eq!(video.id, 2);
    assert!(!video.frames.is_lq_loaded(FrameIndex(0)));
    assert!(loaded.borrow().is_empty());
}

#[test]
fn test_repeating_pending_item_retargets_its_group() {
    let mut h = Harness::new();
    let view = view(&h);

    let shown = view.set_item(video_item(1), None);
    h.resolver.respond(1, loaded_video(1, 6));
    h.pool.run_until(shown).unwrap();

    let first = view.set_item(video_item(2), Some(ItemGroup::new([0, 1])));
    let retarget = view.set_item(video_item(2), Some(ItemGroup::new([4, 5])));
    assert_eq!(h.pool.run_until(retarget).unwrap(), LoadOutcome::Unchanged);
    assert_eq!(h.resolver.calls(), vec![1, 2]);

    // the shown item is left alone while the next one loads
    assert_eq!(view.item().map(|i| i.id), Some(1));
    assert_eq!(view.current_frame_index(), Some(FrameIndex(0)));
    assert!(view.group().is_none());

    h.resolver.respond(2, loaded_video(2, 6));
    assert_eq!(h.pool.run_until(first).unwrap(), LoadOutcome::Applied);
    assert_eq!(view.item().map(|i| i.id), Some(2));
    assert_eq!(view.group(), Some(ItemGroup::new([4, 5])));
    assert_eq!(view.current_frame_index(), Some(FrameIndex(4)));
}
