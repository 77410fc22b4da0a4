use std::time::Duration;

use web_time::Instant;

use super::view;
use crate::index_map::{FrameIndex, ItemGroup};
use crate::playback::PlaybackStep;
use crate::test_support::{hq_url, loaded_video, lq_url, video_item, Harness};

fn playing_view(h: &mut Harness, group: Option<ItemGroup>) -> crate::view::View {
    let view = view(h);
    let load = view.set_item(video_item(1), group);
    h.resolver.respond(1, loaded_video(1, 5));
    h.pool.run_until(load).unwrap();
    h.settle();
    view
}

#[test]
fn test_playback_holds_until_current_frame_is_loaded() {
    let mut h = Harness::new();
    let view = playing_view(&mut h, None);
    let t0 = Instant::now();

    view.play(t0);
    assert!(view.is_playing());
    assert_eq!(view.tick(t0 + Duration::from_millis(100)), PlaybackStep::Hold);
    assert_eq!(view.tick(t0 + Duration::from_millis(500)), PlaybackStep::Hold);
    assert_eq!(view.current_frame_index(), Some(FrameIndex(0)));
    // holding joins the in-flight load instead of decoding again
    assert_eq!(h.decoder.calls().iter().filter(|u| **u == lq_url(1, 0)).count(), 1);

    assert!(h.decoder.complete(&lq_url(1, 0)));
    h.settle();
    // no high-quality upgrade while playing
    assert!(!h.decoder.calls().contains(&hq_url(1, 0)));

    assert_eq!(view.tick(t0 + Duration::from_millis(600)), PlaybackStep::Advance);
    assert_eq!(view.current_frame_index(), Some(FrameIndex(1)));
}

#[test]
fn test_playback_wraps_within_group_and_stop_upgrades() {
    let mut h = Harness::new();
    let view = playing_view(&mut h, Some(ItemGroup::new([1, 3])));
    h.decoder.complete_all();
    h.settle();

    let mut now = Instant::now();
    view.play(now);
    let mut visited = Vec::new();
    for _ in 0..3 {
        now += Duration::from_secs(1);
        assert_eq!(view.tick(now), PlaybackStep::Advance);
        visited.push(view.current_frame_index().unwrap().0);
    }
    assert_eq!(visited, vec![3, 1, 3]);

    view.stop();
    assert!(!view.is_playing());
    assert!(h.decoder.calls().contains(&hq_url(1, 3)));
    assert_eq!(view.tick(now + Duration::from_secs(1)), PlaybackStep::Idle);
}

#[test]
fn test_lead_time_prefetches_next_frame() {
    let mut h = Harness::new();
    let view = playing_view(&mut h, None);
    h.decoder.complete_all();
    h.settle();
    assert!(view.jump_to_frame(FrameIndex(4), false));

    let t0 = Instant::now();
    view.play(t0);
    // 24 fps: the next frame is due after ~41ms, lead is 100ms
    assert_eq!(view.tick(t0), PlaybackStep::Prefetch);
    assert_eq!(view.next_frame_index(), Some(FrameIndex(0)));
}

#[test]
fn test_play_without_video_is_a_no_op() {
    let h = Harness::new();
    let view = view(&h);
    view.play(Instant::now());
    assert!(!view.is_playing());
    assert_eq!(view.tick(Instant::now()), PlaybackStep::Idle);
}
