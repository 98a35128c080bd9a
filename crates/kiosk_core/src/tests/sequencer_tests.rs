use std::sync::Mutex as StdMutex;

use shared::domain::Region;
use tokio::time::sleep;

use super::*;
use crate::{
    surface::ParticleSpec,
    test_support::{assert_near, RecordingSurface, RenderOp},
};

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

type FiredLog = Arc<StdMutex<Vec<(&'static str, u128)>>>;

fn recording_step(delay_ms: u64, label: &'static str, log: &FiredLog, origin: Instant) -> SequenceStep {
    let log = Arc::clone(log);
    SequenceStep::at_ms(delay_ms, move |_| {
        log.lock()
            .unwrap()
            .push((label, origin.elapsed().as_millis()));
    })
}

#[tokio::test(start_paused = true)]
async fn steps_fire_at_offsets_from_sequence_start() {
    let surface = RecordingSurface::new();
    let sequencer = AnimationSequencer::new(surface);
    let origin = Instant::now();
    let log: FiredLog = Arc::default();

    sequencer.play_sequence(vec![
        recording_step(300, "third", &log, origin),
        recording_step(0, "first", &log, origin),
        recording_step(100, "second", &log, origin),
    ]);
    sleep(ms(500)).await;

    let fired = log.lock().unwrap().clone();
    let labels: Vec<_> = fired.iter().map(|(label, _)| *label).collect();
    assert_eq!(labels, vec!["first", "second", "third"]);
    assert_near(fired[0].1, 0);
    assert_near(fired[1].1, 100);
    assert_near(fired[2].1, 300);
}

#[tokio::test(start_paused = true)]
async fn sequence_is_active_until_final_step() {
    let sequencer = AnimationSequencer::new(RecordingSurface::new());
    assert!(!sequencer.is_sequence_active());

    let handle = sequencer.play_sequence(vec![SequenceStep::end(ms(1000))]);
    assert!(sequencer.is_sequence_active());
    assert!(handle.is_active());

    sleep(ms(990)).await;
    assert!(sequencer.is_sequence_active());

    sleep(ms(20)).await;
    assert!(!sequencer.is_sequence_active());
    assert!(!handle.is_active());
}

#[tokio::test(start_paused = true)]
async fn starting_a_sequence_cancels_the_previous_one() {
    let sequencer = AnimationSequencer::new(RecordingSurface::new());
    let origin = Instant::now();
    let log: FiredLog = Arc::default();

    let first = sequencer.play_sequence(vec![
        recording_step(0, "a0", &log, origin),
        recording_step(200, "a200", &log, origin),
        recording_step(600, "a600", &log, origin),
    ]);
    sleep(ms(100)).await;
    let second = sequencer.play_sequence(vec![
        recording_step(0, "b0", &log, origin),
        recording_step(300, "b300", &log, origin),
    ]);
    assert!(!first.is_active());
    assert!(second.is_active());

    sleep(ms(1000)).await;
    let labels: Vec<_> = log.lock().unwrap().iter().map(|(label, _)| *label).collect();
    assert_eq!(labels, vec!["a0", "b0", "b300"]);
}

#[tokio::test(start_paused = true)]
async fn cancel_all_drops_pending_steps_and_restores_markers() {
    let surface = RecordingSurface::new();
    let sequencer = AnimationSequencer::new(surface.clone());
    let origin = Instant::now();
    let log: FiredLog = Arc::default();

    sequencer.play_sequence(vec![
        SequenceStep::at_ms(0, |fx| {
            fx.run_transient_effect(Target::StatusPanel, MarkerKind::Shake, Duration::from_secs(5));
        }),
        recording_step(500, "late", &log, origin),
    ]);
    sleep(ms(100)).await;
    assert!(surface.marker_active(Target::StatusPanel, MarkerKind::Shake));

    sequencer.cancel_all();
    assert!(!sequencer.is_sequence_active());
    assert!(!surface.marker_active(Target::StatusPanel, MarkerKind::Shake));
    assert_eq!(sequencer.active_transient_count(), 0);

    sleep(ms(6000)).await;
    assert!(log.lock().unwrap().is_empty());
    // Restored exactly once; the aborted timer does not touch the marker again.
    assert_eq!(
        surface.count(|op| *op == RenderOp::Marker(Target::StatusPanel, MarkerKind::Shake, false)),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn transient_effect_removes_itself() {
    let surface = RecordingSurface::new();
    let sequencer = AnimationSequencer::new(surface.clone());
    let target = Target::Region(Region::Head);

    assert!(sequencer.run_transient_effect(target, MarkerKind::Attention, ms(1000)));
    assert!(surface.marker_active(target, MarkerKind::Attention));
    assert!(sequencer.is_marker_active(target, MarkerKind::Attention));

    sleep(ms(1100)).await;
    assert!(!surface.marker_active(target, MarkerKind::Attention));
    assert!(!sequencer.is_marker_active(target, MarkerKind::Attention));
    let removed = surface.times_of(&RenderOp::Marker(target, MarkerKind::Attention, false));
    assert_eq!(removed.len(), 1);
    assert_near(removed[0], 1000);
}

#[tokio::test(start_paused = true)]
async fn reapplying_a_marker_extends_it_and_removes_it_once() {
    let surface = RecordingSurface::new();
    let sequencer = AnimationSequencer::new(surface.clone());
    let target = Target::StatusPanel;

    sequencer.run_transient_effect(target, MarkerKind::Shake, ms(500));
    sleep(ms(300)).await;
    sequencer.run_transient_effect(target, MarkerKind::Shake, ms(500));

    sleep(ms(300)).await;
    assert!(surface.marker_active(target, MarkerKind::Shake), "first timer must not remove it");

    sleep(ms(300)).await;
    assert!(!surface.marker_active(target, MarkerKind::Shake));
    let removed = surface.times_of(&RenderOp::Marker(target, MarkerKind::Shake, false));
    assert_eq!(removed.len(), 1);
    assert_near(removed[0], 800);
}

#[tokio::test(start_paused = true)]
async fn transient_effects_on_different_targets_run_concurrently() {
    let surface = RecordingSurface::new();
    let sequencer = AnimationSequencer::new(surface.clone());

    sequencer.run_transient_effect(Target::Region(Region::HandsLeft), MarkerKind::Attention, ms(400));
    sequencer.run_transient_effect(Target::Region(Region::HandsRight), MarkerKind::Attention, ms(800));
    assert_eq!(sequencer.active_transient_count(), 2);

    sleep(ms(500)).await;
    assert!(!surface.marker_active(Target::Region(Region::HandsLeft), MarkerKind::Attention));
    assert!(surface.marker_active(Target::Region(Region::HandsRight), MarkerKind::Attention));

    sleep(ms(400)).await;
    assert_eq!(sequencer.active_transient_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn missing_target_is_a_silent_no_op() {
    let surface = RecordingSurface::new();
    surface.detach(Target::Region(Region::Feet));
    let sequencer = AnimationSequencer::new(surface.clone());
    let origin = Instant::now();
    let log: FiredLog = Arc::default();

    assert!(!sequencer.run_transient_effect(
        Target::Region(Region::Feet),
        MarkerKind::Attention,
        ms(100)
    ));
    assert_eq!(sequencer.active_transient_count(), 0);

    sequencer.play_sequence(vec![
        SequenceStep::at_ms(0, |fx| {
            fx.run_transient_effect(Target::Region(Region::Feet), MarkerKind::Success, ms(100));
            fx.run_transient_effect(Target::Region(Region::Head), MarkerKind::Success, ms(100));
        }),
        recording_step(50, "sibling", &log, origin),
    ]);
    sleep(ms(200)).await;

    assert_eq!(log.lock().unwrap().len(), 1);
    assert_eq!(
        surface.count(|op| matches!(op, RenderOp::Marker(Target::Region(Region::Head), MarkerKind::Success, _))),
        2
    );
    assert_eq!(
        surface.count(|op| matches!(op, RenderOp::Marker(Target::Region(Region::Feet), _, _))),
        0
    );
}

#[tokio::test(start_paused = true)]
async fn particles_are_removed_after_their_lifetime() {
    let surface = RecordingSurface::new();
    let sequencer = AnimationSequencer::new(surface.clone());

    let id = sequencer
        .spawn_particle(
            ParticleSpec {
                size_px: 8,
                color: "#10B981",
                x_percent: 42.0,
            },
            ms(1500),
        )
        .expect("particle spawned");
    assert_eq!(surface.live_particles().len(), 1);
    assert_eq!(surface.live_particles()[0].id, id);

    sleep(ms(1600)).await;
    assert!(surface.live_particles().is_empty());
}

#[tokio::test(start_paused = true)]
async fn handle_cancel_only_affects_its_own_sequence() {
    let sequencer = AnimationSequencer::new(RecordingSurface::new());

    let first = sequencer.play_sequence(vec![SequenceStep::end(ms(1000))]);
    let second = sequencer.play_sequence(vec![SequenceStep::end(ms(1000))]);
    assert!(!first.cancel());
    assert!(second.is_active());
    assert!(second.cancel());
    assert!(!sequencer.is_sequence_active());
}
