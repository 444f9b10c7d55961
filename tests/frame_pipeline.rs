// SPDX-License-Identifier: MPL-2.0
//! End-to-end tests of the frame pipeline over generated streams.

use approx::assert_abs_diff_eq;
use std::sync::Arc;
use std::time::{Duration, Instant};
use vidinspect::config::PipelineConfig;
use vidinspect::video_player::{
    FrameLoader, FramePool, FrameProducer, FrameSource, FrameWindow, LoadDirection, Player,
    Rational, RgbFrame, SyntheticSource,
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn start_loader(source: SyntheticSource, pool_frames: usize) -> (FrameLoader, Arc<FramePool>) {
    let info = *source.stream_info();
    let pool = Arc::new(FramePool::new());
    pool.create_frames(pool_frames, info.width, info.height);
    let loader = FrameLoader::start(Box::new(source), Arc::clone(&pool), 5).unwrap();
    (loader, pool)
}

fn wait_frame(loader: &FrameLoader) -> Option<RgbFrame> {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if let Some(frame) = loader.get_frame() {
            return Some(frame);
        }
        if loader.is_end_of_stream() {
            return loader.get_frame();
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    None
}

fn collect_pts(loader: &FrameLoader, pool: &FramePool, limit: usize) -> Vec<i64> {
    let mut out = Vec::new();
    while out.len() < limit {
        let Some(frame) = wait_frame(loader) else {
            break;
        };
        out.push(frame.pts);
        pool.put(frame);
    }
    out
}

#[test]
fn ten_frame_stream_forward_then_seek() {
    let source = SyntheticSource::new(10);
    let info = *source.stream_info();
    assert_eq!(info.time_base, Rational::new(1, 30));

    let (loader, pool) = start_loader(source, 4);
    assert_eq!(collect_pts(&loader, &pool, 20), (0..10).collect::<Vec<_>>());
    assert!(loader.is_end_of_stream());

    loader.seek(LoadDirection::Forward, Some(4));
    assert_eq!(collect_pts(&loader, &pool, 20), (4..10).collect::<Vec<_>>());
}

#[test]
fn frames_carry_their_own_pixels() {
    let (loader, pool) = start_loader(SyntheticSource::new(5), 2);
    for expected in 0..5u8 {
        let frame = wait_frame(&loader).expect("frame");
        assert_eq!(SyntheticSource::frame_index(&frame), Some(expected));
        assert!(frame.data().iter().all(|&b| b == expected));
        pool.put(frame);
    }
}

#[test]
fn backward_seek_found_and_not_found() {
    // Found: 30 frames at 90 kHz, 3000 units each, keyframe every 6 frames.
    let source = SyntheticSource::new(30)
        .with_timing(Rational::new(1, 90_000), 3_000)
        .with_gop(6);
    let (loader, pool) = start_loader(source, 4);
    loader.seek(LoadDirection::Backward, Some(3_000 * 14 + 1_500));
    let frame = wait_frame(&loader).expect("covering frame");
    assert_eq!(frame.pts, 3_000 * 14);
    assert!(frame.contains_pts(3_000 * 14 + 1_500));
    pool.put(frame);

    // Not found: the target falls into a timestamp gap.
    let source = SyntheticSource::new(10).with_gap_after(4, 100);
    let (loader, _pool) = start_loader(source, 4);
    loader.seek(LoadDirection::Backward, Some(50));
    assert!(wait_frame(&loader).is_none());
    assert!(loader.is_end_of_stream());
}

#[test]
fn window_over_real_loader_steps_both_ways_without_gaps() {
    let (loader, pool) = start_loader(SyntheticSource::new(40).with_gop(5), 8);
    let mut window = FrameWindow::new(8, 2, Arc::clone(&pool));

    let pump = |window: &mut FrameWindow, loader: &FrameLoader| {
        let deadline = Instant::now() + Duration::from_millis(200);
        while Instant::now() < deadline {
            window.fill_from(loader);
            std::thread::sleep(Duration::from_millis(1));
        }
    };

    pump(&mut window, &loader);
    assert_eq!(window.len(), 8);

    let mut shown = vec![window.current().unwrap().pts];
    for _ in 0..20 {
        while !window.seek_next_frame(&loader) {
            pump(&mut window, &loader);
        }
        shown.push(window.current().unwrap().pts);
        window.fill_from(&loader);
    }
    for _ in 0..15 {
        while !window.seek_prev_frame(&loader) {
            pump(&mut window, &loader);
        }
        shown.push(window.current().unwrap().pts);
        window.fill_from(&loader);
    }

    let forward: Vec<i64> = (0..=20).collect();
    let backward: Vec<i64> = (5..20).rev().collect();
    assert_eq!(&shown[..21], forward.as_slice());
    assert_eq!(&shown[21..], backward.as_slice());
    assert!(window.len() <= window.capacity());
    assert_eq!(window.stats().discontinuities, 0);
}

#[test]
fn every_frame_returns_to_the_pool() {
    let mut player = Player::new(PipelineConfig::default());
    player
        .start(Box::new(SyntheticSource::new(50).with_gop(10)))
        .unwrap();
    player.resume();

    let mut clock = Instant::now();
    let deadline = Instant::now() + TIMEOUT;
    let mut updates = 0;
    while updates < 20 && Instant::now() < deadline {
        clock += Duration::from_millis(40);
        if player.has_update(clock) {
            updates += 1;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(updates, 20);

    player.seek_progress(80.0, false);
    player.step_backward();
    for _ in 0..50 {
        player.has_update(Instant::now());
        std::thread::sleep(Duration::from_millis(1));
    }
    assert!(player.pool_stats().allocated >= PipelineConfig::default().pool_frames);

    player.stop();
    assert_eq!(player.pool_stats().checked_out(), 0);
}

#[test]
fn player_progress_round_trip() {
    let mut player = Player::new(PipelineConfig::default());
    let info = player
        .start(Box::new(
            SyntheticSource::new(250).with_timing(Rational::new(1, 90_000), 3_600),
        ))
        .unwrap();

    for percent in [0.0, 12.5, 50.0, 99.0, 100.0] {
        let pts = info.progress_to_pts(percent);
        assert_abs_diff_eq!(info.calc_progress(pts), percent, epsilon = 1e-6);
    }
    assert_eq!(info.progress_to_pts(-5.0), info.start_pts);
    assert_eq!(info.progress_to_pts(150.0), info.end_pts());

    player.seek_progress(40.0, false);
    let deadline = Instant::now() + TIMEOUT;
    while !player.has_update(Instant::now()) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(player.current_frame().map(|f| f.pts), Some(100 * 3_600));
    assert_abs_diff_eq!(player.play_state().progress, 40.0, epsilon = 1e-6);
}
