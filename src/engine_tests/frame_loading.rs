use futures::future::join;

use super::{record_frame_loads, view};
use crate::index_map::{FrameIndex, ItemGroup, ZeroBasedIndex};
use crate::item_loader::LoadOutcome;
use crate::model::Quality;
use crate::test_support::{hq_url, loaded_video, lq_url, video_item, Harness};

fn loaded_view(h: &mut Harness, frames: usize, group: Option<ItemGroup>) -> crate::view::View {
    let view = view(h);
    let load = view.set_item(video_item(1), group);
    h.resolver.respond(1, loaded_video(1, frames));
    assert_eq!(h.pool.run_until(load).unwrap(), LoadOutcome::Applied);
    h.settle();
    view
}

#[test]
fn test_item_switch_prefetches_forward_window_only() {
    let mut h = Harness::new();
    let view = loaded_view(&mut h, 10, None);

    assert_eq!(h.decoder.calls(), vec![lq_url(1, 0), lq_url(1, 1), lq_url(1, 2)]);
    assert_eq!(view.current_frame_index(), Some(FrameIndex(0)));
    assert!(view.frame_loader().queued().is_empty());
}

#[test]
fn test_concurrent_frame_loads_share_one_decode() {
    let mut h = Harness::new();
    let view = loaded_view(&mut h, 5, None);
    let (loaded, _subscription) = record_frame_loads(&view);

    let first = view.load_frame(FrameIndex(3));
    let second = view.load_frame(FrameIndex(3));
    let decodes = |h: &Harness| {
        h.decoder
            .calls()
            .iter()
            .filter(|url| **url == lq_url(1, 3))
            .count()
    };
    assert_eq!(decodes(&h), 1);

    assert!(h.decoder.complete(&lq_url(1, 3)));
    let (a, b) = h.pool.run_until(join(first, second));
    assert!(a && b);
    assert_eq!(decodes(&h), 1);
    assert!(view.frames()[&FrameIndex(3)].lq_data_loaded());
    assert_eq!(*loaded.borrow(), vec![FrameIndex(3)]);

    // already loaded: resolves without decoding again
    assert!(h.pool.run_until(view.load_frame(FrameIndex(3))));
    assert_eq!(decodes(&h), 1);
}

#[test]
fn test_failed_decode_resolves_false_and_can_retry() {
    let mut h = Harness::new();
    let view = loaded_view(&mut h, 5, None);

    let load = view.load_frame(FrameIndex(4));
    assert!(h.decoder.fail(&lq_url(1, 4)));
    assert!(!h.pool.run_until(load));
    assert!(!view.frame_loader().is_in_flight(FrameIndex(4), Quality::Low));

    let retry = view.load_frame(FrameIndex(4));
    assert!(h.decoder.complete(&lq_url(1, 4)));
    assert!(h.pool.run_until(retry));

    // unknown frames resolve false without decoding
    let calls = h.decoder.calls().len();
    assert!(!h.pool.run_until(view.load_frame(FrameIndex(9))));
    assert_eq!(h.decoder.calls().len(), calls);
}

#[test]
fn test_group_restricts_loading_to_active_frames() {
    let mut h = Harness::new();
    let view = loaded_view(&mut h, 5, Some(ItemGroup::new([2, 3])));

    assert_eq!(view.current_frame_index(), Some(FrameIndex(2)));
    assert_eq!(h.decoder.calls(), vec![lq_url(1, 2), lq_url(1, 3)]);

    h.decoder.complete_all();
    h.settle();

    let video = view.loaded_video().unwrap();
    for i in [2, 3] {
        assert!(video.frames.get(FrameIndex(i)).unwrap().lq_data_loaded());
    }
    for i in [0, 1, 4] {
        assert!(!video.frames.get(FrameIndex(i)).unwrap().lq_data_loaded());
    }
    // the stopped view upgrades its current frame
    assert_eq!(h.decoder.outstanding(), vec![hq_url(1, 2)]);
    assert_eq!(view.frames().keys().copied().collect::<Vec<_>>(), vec![FrameIndex(2), FrameIndex(3)]);
}

#[test]
fn test_group_index_mapping_round_trips() {
    let mut h = Harness::new();
    let view = loaded_view(&mut h, 6, Some(ItemGroup::new([5, 1, 3])));

    for index in [1, 3, 5].map(FrameIndex) {
        let zero = view.to_zero_based_index(index).unwrap();
        assert_eq!(view.to_origin_based_index(zero), Some(index));
    }
    assert_eq!(view.to_zero_based_index(FrameIndex(3)), Some(ZeroBasedIndex(1)));
    assert_eq!(view.to_zero_based_index(FrameIndex(2)), None);
    assert_eq!(view.to_origin_based_index(ZeroBasedIndex(3)), None);
    assert_eq!(
        view.zero_based_frames().keys().copied().collect::<Vec<_>>(),
        vec![ZeroBasedIndex(0), ZeroBasedIndex(1), ZeroBasedIndex(2)]
    );

    view.set_group(None);
    assert_eq!(view.current_frame_index(), Some(FrameIndex(0)));
    assert_eq!(view.to_zero_based_index(FrameIndex(4)), Some(ZeroBasedIndex(4)));
}

#[test]
fn test_jump_recentres_window_and_upgrades_target() {
    let mut h = Harness::new();
    let view = loaded_view(&mut h, 10, None);
    h.decoder.complete_all();
    h.settle();

    assert!(view.jump_to_frame(FrameIndex(6), false));
    assert!(!view.jump_to_frame(FrameIndex(42), false));

    let calls = h.decoder.calls();
    for url in [lq_url(1, 6), lq_url(1, 7), lq_url(1, 8), hq_url(1, 6)] {
        assert!(calls.contains(&url), "missing decode of {url}");
    }
    assert!(!calls.contains(&lq_url(1, 5)));
    assert!(!calls.contains(&lq_url(1, 9)));
}
