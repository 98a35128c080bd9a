use std::time::Duration;

use rand::Rng;
use shared::domain::Region;

use crate::{
    sequencer::{AnimationSequencer, SequenceStep},
    surface::{skip_render_error, MarkerKind, ParticleSpec, Slot, Target},
};

pub const GRANTED_SPAN: Duration = Duration::from_millis(4000);
pub const REGION_STAGGER: Duration = Duration::from_millis(100);
pub const REGION_SUCCESS_PULSE: Duration = Duration::from_millis(600);
pub const STATUS_TRANSITION_AT: Duration = Duration::from_millis(200);
pub const STATUS_FADE_OUT: Duration = Duration::from_millis(300);
pub const STATUS_FADE_IN: Duration = Duration::from_millis(500);
pub const WELCOME_AT: Duration = Duration::from_millis(400);
pub const WELCOME_SLIDE_IN: Duration = Duration::from_millis(600);
pub const PARTICLES_AT: Duration = Duration::from_millis(600);
pub const PARTICLE_COUNT: usize = 30;
pub const PARTICLE_STAGGER: Duration = Duration::from_millis(50);
pub const PARTICLE_LIFETIME: Duration = Duration::from_millis(1500);
pub const PARTICLE_MIN_SIZE_PX: u32 = 5;
pub const PARTICLE_MAX_SIZE_PX: u32 = 15;
pub const SUCCESS_PALETTE: [&str; 4] = ["#10B981", "#34D399", "#6EE7B7", "#A7F3D0"];
pub const PROGRESS_AT: Duration = Duration::from_millis(800);
pub const DEFAULT_PROGRESS_FILL: Duration = Duration::from_millis(3000);

pub const DENIED_SPAN: Duration = Duration::from_millis(2000);
pub const SHAKE: Duration = Duration::from_millis(500);
pub const MISSING_FLASH_AT: Duration = Duration::from_millis(200);
pub const MISSING_FLASH: Duration = Duration::from_millis(1000);
pub const REASON_ATTENTION_AT: Duration = Duration::from_millis(400);
pub const REASON_ATTENTION: Duration = Duration::from_millis(1000);

pub fn particle_burst<R: Rng>(rng: &mut R) -> Vec<ParticleSpec> {
    (0..PARTICLE_COUNT)
        .map(|_| ParticleSpec {
            size_px: rng.gen_range(PARTICLE_MIN_SIZE_PX..=PARTICLE_MAX_SIZE_PX),
            color: SUCCESS_PALETTE[rng.gen_range(0..SUCCESS_PALETTE.len())],
            x_percent: rng.gen_range(0.0..100.0),
        })
        .collect()
}

pub fn access_granted(
    regions: &[Region],
    progress_fill: Duration,
    particles: Vec<ParticleSpec>,
) -> Vec<SequenceStep> {
    let mut steps = Vec::with_capacity(regions.len() + particles.len() + 6);

    for (index, region) in regions.iter().copied().enumerate() {
        steps.push(SequenceStep::new(REGION_STAGGER * index as u32, move |fx| {
            fx.run_transient_effect(
                Target::Region(region),
                MarkerKind::Success,
                REGION_SUCCESS_PULSE,
            );
        }));
    }

    steps.push(SequenceStep::new(STATUS_TRANSITION_AT, |fx| {
        fx.run_transient_effect(Target::StatusPanel, MarkerKind::FadeOut, STATUS_FADE_OUT);
    }));
    steps.push(SequenceStep::new(
        STATUS_TRANSITION_AT + STATUS_FADE_OUT,
        |fx| {
            fx.run_transient_effect(Target::StatusPanel, MarkerKind::FadeIn, STATUS_FADE_IN);
        },
    ));

    steps.push(SequenceStep::new(WELCOME_AT, |fx| {
        skip_render_error(
            fx.surface().set_visible(Slot::WelcomeMessage, true),
            "set_visible",
        );
        fx.run_transient_effect(
            Target::Element(Slot::WelcomeMessage),
            MarkerKind::SlideIn,
            WELCOME_SLIDE_IN,
        );
    }));

    for (index, particle) in particles.into_iter().enumerate() {
        steps.push(SequenceStep::new(
            PARTICLES_AT + PARTICLE_STAGGER * index as u32,
            move |fx: &AnimationSequencer| {
                fx.spawn_particle(particle, PARTICLE_LIFETIME);
            },
        ));
    }

    steps.push(SequenceStep::new(PROGRESS_AT, move |fx| {
        skip_render_error(
            fx.surface().run_progress_fill(progress_fill),
            "run_progress_fill",
        );
    }));

    steps.push(SequenceStep::end(GRANTED_SPAN));
    steps
}

/// `missing_regions` is evaluated when the flash step fires, not when the
/// sequence is built.
pub fn access_denied<F>(missing_regions: F) -> Vec<SequenceStep>
where
    F: Fn() -> Vec<Region> + Send + 'static,
{
    vec![
        SequenceStep::new(Duration::ZERO, |fx| {
            fx.run_transient_effect(Target::StatusPanel, MarkerKind::Shake, SHAKE);
        }),
        SequenceStep::new(MISSING_FLASH_AT, move |fx| {
            for region in missing_regions() {
                fx.run_transient_effect(
                    Target::Region(region),
                    MarkerKind::Attention,
                    MISSING_FLASH,
                );
            }
        }),
        SequenceStep::new(REASON_ATTENTION_AT, |fx| {
            fx.run_transient_effect(
                Target::Element(Slot::StatusMessage),
                MarkerKind::Attention,
                REASON_ATTENTION,
            );
        }),
        SequenceStep::end(DENIED_SPAN),
    ]
}

#[cfg(test)]
#[path = "tests/sequences_tests.rs"]
mod tests;
