use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
    time::Duration,
};

use tokio::{task::JoinHandle, time::Instant};
use tracing::debug;

use crate::surface::{
    skip_render_error, MarkerKind, ParticleId, ParticleSpec, RenderError, RenderSurface, Target,
};

pub type StepAction = Box<dyn FnOnce(&AnimationSequencer) + Send + 'static>;

type RestoreFn = Box<dyn FnOnce(&dyn RenderSurface) -> Result<(), RenderError> + Send + 'static>;

pub struct SequenceStep {
    pub delay: Duration,
    action: StepAction,
}

impl SequenceStep {
    pub fn new(delay: Duration, action: impl FnOnce(&AnimationSequencer) + Send + 'static) -> Self {
        Self {
            delay,
            action: Box::new(action),
        }
    }

    pub fn at_ms(delay_ms: u64, action: impl FnOnce(&AnimationSequencer) + Send + 'static) -> Self {
        Self::new(Duration::from_millis(delay_ms), action)
    }

    pub fn end(delay: Duration) -> Self {
        Self::new(delay, |_| {})
    }
}

impl fmt::Debug for SequenceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceStep")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TransientKey {
    Marker(Target, MarkerKind),
    Particle(ParticleId),
}

struct TransientEntry {
    token: u64,
    restore: RestoreFn,
    timer: JoinHandle<()>,
}

struct ActiveSequence {
    generation: u64,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct SequencerState {
    // Bumped on every start and every cancellation; a step only fires while
    // its sequence's generation is still the current one.
    generation: u64,
    active: Option<ActiveSequence>,
    transients: HashMap<TransientKey, TransientEntry>,
}

struct SequencerInner {
    surface: Arc<dyn RenderSurface>,
    state: Mutex<SequencerState>,
    next_token: AtomicU64,
}

impl SequencerInner {
    fn lock_state(&self) -> MutexGuard<'_, SequencerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SequencerInner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(active) = state.active.take() {
            active.task.abort();
        }
        for (_, entry) in state.transients.drain() {
            entry.timer.abort();
        }
    }
}

#[derive(Clone)]
pub struct AnimationSequencer {
    inner: Arc<SequencerInner>,
}

impl fmt::Debug for AnimationSequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock_state();
        f.debug_struct("AnimationSequencer")
            .field("generation", &state.generation)
            .field("sequence_active", &state.active.is_some())
            .field("transients", &state.transients.len())
            .finish()
    }
}

#[derive(Clone)]
pub struct SequenceHandle {
    generation: u64,
    inner: Weak<SequencerInner>,
}

impl fmt::Debug for SequenceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceHandle")
            .field("generation", &self.generation)
            .finish()
    }
}

impl SequenceHandle {
    pub fn is_active(&self) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        let state = inner.lock_state();
        state
            .active
            .as_ref()
            .is_some_and(|active| active.generation == self.generation)
    }

    pub fn cancel(&self) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        let sequencer = AnimationSequencer { inner };
        if !self.is_active() {
            return false;
        }
        sequencer.cancel_all();
        true
    }
}

impl AnimationSequencer {
    pub fn new(surface: Arc<dyn RenderSurface>) -> Self {
        Self {
            inner: Arc::new(SequencerInner {
                surface,
                state: Mutex::new(SequencerState::default()),
                next_token: AtomicU64::new(1),
            }),
        }
    }

    pub fn surface(&self) -> &dyn RenderSurface {
        self.inner.surface.as_ref()
    }

    pub fn is_sequence_active(&self) -> bool {
        self.inner.lock_state().active.is_some()
    }

    pub fn active_transient_count(&self) -> usize {
        self.inner.lock_state().transients.len()
    }

    pub fn is_marker_active(&self, target: Target, marker: MarkerKind) -> bool {
        self.inner
            .lock_state()
            .transients
            .contains_key(&TransientKey::Marker(target, marker))
    }

    pub fn play_sequence(&self, mut steps: Vec<SequenceStep>) -> SequenceHandle {
        self.cancel_all();
        steps.sort_by_key(|step| step.delay);
        let step_count = steps.len();

        let mut state = self.inner.lock_state();
        state.generation += 1;
        let generation = state.generation;
        // Spawned under the lock so the task cannot observe a half-registered sequence.
        let task = tokio::spawn(run_sequence(
            Arc::downgrade(&self.inner),
            generation,
            Instant::now(),
            steps,
        ));
        state.active = Some(ActiveSequence { generation, task });
        drop(state);

        debug!(generation, steps = step_count, "sequencer: sequence started");
        SequenceHandle {
            generation,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Aborts pending steps and restores every applied transient to baseline.
    pub fn cancel_all(&self) {
        let (active, transients) = {
            let mut state = self.inner.lock_state();
            state.generation += 1;
            (state.active.take(), std::mem::take(&mut state.transients))
        };

        if let Some(active) = active {
            active.task.abort();
            debug!(
                generation = active.generation,
                "sequencer: sequence cancelled"
            );
        }
        if !transients.is_empty() {
            debug!(count = transients.len(), "sequencer: restoring transients");
        }
        for (_, entry) in transients {
            entry.timer.abort();
            skip_render_error(
                (entry.restore)(self.inner.surface.as_ref()),
                "restore_transient",
            );
        }
    }

    pub fn run_transient_effect(
        &self,
        target: Target,
        marker: MarkerKind,
        duration: Duration,
    ) -> bool {
        self.run_transient(
            TransientKey::Marker(target, marker),
            |surface| surface.set_visual_marker(target, marker, true),
            Box::new(move |surface| surface.set_visual_marker(target, marker, false)),
            duration,
        )
    }

    pub fn spawn_particle(&self, spec: ParticleSpec, lifetime: Duration) -> Option<ParticleId> {
        let id = ParticleId(self.inner.next_token.fetch_add(1, Ordering::Relaxed));
        let particle = spec.with_id(id);
        let spawned = self.run_transient(
            TransientKey::Particle(id),
            |surface| surface.spawn_particle(&particle),
            Box::new(move |surface| surface.remove_particle(id)),
            lifetime,
        );
        spawned.then_some(id)
    }

    fn run_transient(
        &self,
        key: TransientKey,
        apply: impl FnOnce(&dyn RenderSurface) -> Result<(), RenderError>,
        restore: RestoreFn,
        duration: Duration,
    ) -> bool {
        if let Err(err) = apply(self.inner.surface.as_ref()) {
            debug!(?key, error = %err, "sequencer: transient skipped");
            return false;
        }

        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        let mut state = self.inner.lock_state();
        let inner = Arc::downgrade(&self.inner);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(inner) = inner.upgrade() {
                AnimationSequencer { inner }.expire(key, token);
            }
        });
        if let Some(previous) = state
            .transients
            .insert(key, TransientEntry { token, restore, timer })
        {
            // Same target and marker: the newest timer owns the removal.
            previous.timer.abort();
        }
        true
    }

    fn expire(&self, key: TransientKey, token: u64) {
        let entry = {
            let mut state = self.inner.lock_state();
            match state.transients.get(&key) {
                Some(entry) if entry.token == token => state.transients.remove(&key),
                _ => None,
            }
        };
        if let Some(entry) = entry {
            skip_render_error(
                (entry.restore)(self.inner.surface.as_ref()),
                "restore_transient",
            );
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.lock_state().generation == generation
    }

    fn finish_sequence(&self, generation: u64) {
        let mut state = self.inner.lock_state();
        if state
            .active
            .as_ref()
            .is_some_and(|active| active.generation == generation)
        {
            state.active = None;
            debug!(generation, "sequencer: sequence finished");
        }
    }
}

async fn run_sequence(
    inner: Weak<SequencerInner>,
    generation: u64,
    started: Instant,
    steps: Vec<SequenceStep>,
) {
    for step in steps {
        tokio::time::sleep_until(started + step.delay).await;
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let sequencer = AnimationSequencer { inner };
        if !sequencer.is_current(generation) {
            return;
        }
        (step.action)(&sequencer);
    }
    if let Some(inner) = inner.upgrade() {
        AnimationSequencer { inner }.finish_sequence(generation);
    }
}

#[cfg(test)]
#[path = "tests/sequencer_tests.rs"]
mod tests;
