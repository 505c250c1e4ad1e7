use super::*;

fn info(total_frames: f32, duration_ms: u64) -> LoadedInfo {
    LoadedInfo {
        total_frames,
        duration_ms,
        width: 10,
        height: 10,
    }
}

fn frames(player: &mut Player, n: usize) -> Vec<u32> {
    (0..n).map(|_| player.tick().frame).collect()
}

#[test]
fn single_pass_stops_on_the_last_frame() {
    let mut p = Player::new(Playback::default(), &info(4.0, 400));
    let first = p.tick();
    assert!(first.started);
    assert_eq!(first.frame, 0);
    assert_eq!(frames(&mut p, 4), vec![1, 2, 3, 4]);
    assert_eq!(p.passes(), 1);

    let end = p.tick();
    assert!(end.ended && !end.started);
    assert_eq!(end.frame, 4);
    assert_eq!(p.tick().frame, 4);
    assert!(p.is_ended());
}

#[test]
fn restart_wraps_to_the_first_frame() {
    let opts = Playback {
        repeat_count: Some(2),
        ..Playback::default()
    };
    let mut p = Player::new(opts, &info(3.0, 300));
    let ticks: Vec<Tick> = (0..9).map(|_| p.tick()).collect();
    let seen: Vec<u32> = ticks.iter().map(|t| t.frame).collect();
    assert_eq!(seen, vec![0, 1, 2, 3, 0, 1, 2, 3, 3]);
    assert_eq!(ticks.iter().filter(|t| t.repeated).count(), 2);
    assert!(ticks[3].repeated);
    assert!(ticks[8].ended);
}

#[test]
fn reverse_bounces_between_the_ends() {
    let opts = Playback {
        repeat_count: Some(2),
        repeat_mode: RepeatMode::Reverse,
        ..Playback::default()
    };
    let mut p = Player::new(opts, &info(3.0, 300));
    assert_eq!(frames(&mut p, 9), vec![0, 1, 2, 3, 2, 1, 0, 0, 0]);
    assert!(p.is_ended());
}

#[test]
fn endless_playback_never_ends() {
    let opts = Playback {
        repeat_count: None,
        ..Playback::default()
    };
    let mut p = Player::new(opts, &info(2.0, 200));
    let ticks: Vec<Tick> = (0..100).map(|_| p.tick()).collect();
    assert!(ticks.iter().all(|t| !t.ended));
    assert_eq!(p.passes(), 33);
}

#[test]
fn range_is_clamped_to_the_animation() {
    let opts = Playback {
        first: 50,
        last: Some(80),
        ..Playback::default()
    };
    let p = Player::new(opts, &info(10.0, 1000));
    assert_eq!(p.last_frame(), 10);
    assert_eq!(p.first_frame(), 10);

    let opts = Playback {
        first: 2,
        last: Some(5),
        ..Playback::default()
    };
    let mut p = Player::new(opts, &info(10.0, 1000));
    assert_eq!(frames(&mut p, 5), vec![2, 3, 4, 5, 5]);
}

#[test]
fn interval_follows_duration_and_speed() {
    let p = Player::new(Playback::default(), &info(10.0, 1000));
    assert_eq!(p.interval(), Duration::from_millis(100));

    let fast = Playback {
        speed: 2.0,
        ..Playback::default()
    };
    assert_eq!(Player::new(fast, &info(10.0, 1000)).interval(), Duration::from_millis(50));

    let stalled = Playback {
        speed: 0.0,
        ..Playback::default()
    };
    assert_eq!(Player::new(stalled, &info(10.0, 1000)).interval(), Duration::from_millis(100));
    assert_eq!(Player::new(Playback::default(), &info(0.0, 0)).interval(), FALLBACK_INTERVAL);
}

#[test]
fn rewind_starts_a_fresh_run() {
    let mut p = Player::new(Playback::default(), &info(1.0, 100));
    frames(&mut p, 3);
    assert!(p.is_ended());
    p.rewind();
    let t = p.tick();
    assert!(t.started && !t.ended);
    assert_eq!(t.frame, 0);
}
