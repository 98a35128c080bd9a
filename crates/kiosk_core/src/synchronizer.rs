use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use rand::{rngs::StdRng, SeedableRng};
use shared::{
    domain::{AccessState, Region},
    protocol::{AccessStatusEvent, ConfigEvent, DetectionEvent, IdentityEvent, ServerEvent},
};
use tracing::{debug, info};

use crate::{
    coverage::{compute_region_statuses, missing_equipment, summarize, CoverageSummary, RegionStatusMap},
    sequencer::AnimationSequencer,
    sequences::{self, DEFAULT_PROGRESS_FILL},
    surface::{skip_render_error, MarkerKind, RenderSurface, Slot, Target},
};

const FACE_RECOGNIZED_FADE_IN: Duration = Duration::from_millis(500);
const STATUS_STYLES: [MarkerKind; 3] = [MarkerKind::Granted, MarkerKind::Denied, MarkerKind::Checking];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    Active,
    #[default]
    Disconnected,
}

impl ConnectionStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "System Active",
            Self::Disconnected => "Disconnected",
        }
    }
}

pub trait CoverageObserver: Send + Sync {
    fn coverage_updated(&self, statuses: &RegionStatusMap, summary: &CoverageSummary);
}

pub struct NoCoverageObserver;

impl CoverageObserver for NoCoverageObserver {
    fn coverage_updated(&self, _statuses: &RegionStatusMap, _summary: &CoverageSummary) {}
}

#[derive(Debug, Clone, Default)]
struct CoverageSnapshot {
    detected: Vec<String>,
    required: Vec<String>,
    statuses: RegionStatusMap,
    summary: CoverageSummary,
    missing_equipment: Vec<String>,
}

impl CoverageSnapshot {
    fn new(required: Vec<String>) -> Self {
        let mut snapshot = Self {
            required,
            ..Self::default()
        };
        snapshot.recompute();
        snapshot
    }

    fn recompute(&mut self) {
        self.statuses = compute_region_statuses(&self.detected, &self.required);
        self.summary = summarize(&self.statuses);
        self.missing_equipment = missing_equipment(&self.detected, &self.required);
    }
}

#[derive(Debug, Default)]
struct SynchronizerState {
    access_state: AccessState,
    identity: Option<IdentityEvent>,
    last_detection: Option<DetectionEvent>,
    connection: ConnectionStatus,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Synchronizer {
    surface: Arc<dyn RenderSurface>,
    sequencer: AnimationSequencer,
    coverage_observer: Arc<dyn CoverageObserver>,
    state: Mutex<SynchronizerState>,
    coverage: Arc<Mutex<CoverageSnapshot>>,
    rng: Mutex<StdRng>,
}

impl Synchronizer {
    pub fn new(surface: Arc<dyn RenderSurface>) -> Arc<Self> {
        Self::new_with_dependencies(surface, Vec::new(), Arc::new(NoCoverageObserver))
    }

    pub fn new_with_dependencies(
        surface: Arc<dyn RenderSurface>,
        required_classes: Vec<String>,
        coverage_observer: Arc<dyn CoverageObserver>,
    ) -> Arc<Self> {
        Arc::new(Self {
            sequencer: AnimationSequencer::new(Arc::clone(&surface)),
            surface,
            coverage_observer,
            state: Mutex::new(SynchronizerState::default()),
            coverage: Arc::new(Mutex::new(CoverageSnapshot::new(required_classes))),
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    pub fn initialize(&self) {
        let (state, connection) = {
            let guard = lock(&self.state);
            (guard.access_state, guard.connection)
        };
        self.enter_state(&AccessStatusEvent::new(state));
        self.render_connection(connection);
        self.render_coverage();
    }

    pub fn sequencer(&self) -> &AnimationSequencer {
        &self.sequencer
    }

    pub fn access_state(&self) -> AccessState {
        lock(&self.state).access_state
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        lock(&self.state).connection
    }

    pub fn last_detection(&self) -> Option<DetectionEvent> {
        lock(&self.state).last_detection.clone()
    }

    pub fn region_statuses(&self) -> RegionStatusMap {
        lock(&self.coverage).statuses.clone()
    }

    pub fn coverage_summary(&self) -> CoverageSummary {
        lock(&self.coverage).summary.clone()
    }

    pub fn required_classes(&self) -> Vec<String> {
        lock(&self.coverage).required.clone()
    }

    /// Routes one decoded inbound event. Events must be fed in arrival order.
    pub fn handle_server_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::DetectionUpdate(detection) => self.handle_detection(detection),
            ServerEvent::FaceIdentified(identity) => self.handle_identity(identity),
            ServerEvent::AccessStatusChange(status) => self.handle_access_status(status),
            ServerEvent::ConfigUpdate(config) => self.handle_config(config),
            ServerEvent::DetectionStarted { success } => {
                info!(success, "stream: backend detection started");
            }
            ServerEvent::DetectionStopped { success } => {
                info!(success, "stream: backend detection stopped");
            }
            ServerEvent::Connected { message } => {
                info!(greeting = message.as_deref().unwrap_or_default(), "stream: backend greeting");
            }
            ServerEvent::FaceRecognitionConfigUpdate { enabled } => {
                info!(enabled, "stream: face recognition toggled on backend");
            }
        }
    }

    pub fn handle_access_status(&self, event: AccessStatusEvent) {
        let previous = {
            let mut state = lock(&self.state);
            std::mem::replace(&mut state.access_state, event.state)
        };
        info!(
            from = %previous,
            to = %event.state,
            person = event.person_name.as_deref().unwrap_or_default(),
            "access: state transition"
        );

        // A newer state always supersedes whatever is still animating.
        self.sequencer.cancel_all();
        self.enter_state(&event);
    }

    pub fn handle_detection(&self, event: DetectionEvent) {
        {
            let mut coverage = lock(&self.coverage);
            coverage.detected = event.detected_classes.clone();
            coverage.recompute();
        }
        lock(&self.state).last_detection = Some(event);
        self.render_coverage();
    }

    pub fn handle_config(&self, event: ConfigEvent) {
        info!(required = ?event.required_classes, "coverage: required classes replaced");
        {
            let mut coverage = lock(&self.coverage);
            coverage.required = event.required_classes;
            coverage.recompute();
        }
        self.render_coverage();
    }

    pub fn handle_identity(&self, event: IdentityEvent) {
        debug!(
            matched = event.matched,
            name = event.name.as_deref().unwrap_or_default(),
            confidence = event.confidence.unwrap_or_default(),
            "access: identity update"
        );
        lock(&self.state).identity = Some(event);
    }

    pub fn set_connection_status(&self, status: ConnectionStatus) {
        let previous = std::mem::replace(&mut lock(&self.state).connection, status);
        if previous != status {
            info!(status = status.label(), "stream: connection status changed");
        }
        self.render_connection(status);
    }

    fn enter_state(&self, event: &AccessStatusEvent) {
        self.clear_status_styling();
        let message = event
            .message
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .unwrap_or(event.state.default_message());

        match event.state {
            AccessState::Idle => {
                self.set_status("idle", "Ready", message);
                self.set_visible(Slot::WelcomeMessage, false);
                self.set_visible(Slot::ProgressBar, false);
                self.set_visible(Slot::StatusUser, false);
            }
            AccessState::FaceDetecting => {
                self.set_status("scanning", "Looking for face", message);
                self.marker(Target::Element(Slot::StatusIcon), MarkerKind::Pulse, true);
                self.set_visible(Slot::WelcomeMessage, false);
                self.set_visible(Slot::ProgressBar, false);
            }
            AccessState::FaceRecognized => {
                self.set_status("user-check", "Identity verified", message);
                self.show_welcome(event.person_name.as_deref());
                self.sequencer.run_transient_effect(
                    Target::Element(Slot::WelcomeMessage),
                    MarkerKind::FadeIn,
                    FACE_RECOGNIZED_FADE_IN,
                );
                self.set_visible(Slot::ProgressBar, false);
            }
            AccessState::PpeChecking => {
                self.set_status("shield", "Checking equipment", message);
                self.marker(Target::StatusPanel, MarkerKind::Checking, true);
                self.set_visible(Slot::ProgressBar, false);
            }
            AccessState::AccessGranted => {
                self.set_status("check", "Access granted", message);
                self.marker(Target::StatusPanel, MarkerKind::Granted, true);
                self.show_welcome(event.person_name.as_deref());
                self.set_visible(Slot::ProgressBar, true);

                let progress = progress_duration(event.duration_seconds);
                let particles = sequences::particle_burst(&mut *lock(&self.rng));
                self.sequencer.play_sequence(sequences::access_granted(
                    &Region::ALL,
                    progress,
                    particles,
                ));
            }
            AccessState::AccessDenied => {
                self.set_status("x", "Access denied", message);
                self.marker(Target::StatusPanel, MarkerKind::Denied, true);
                match event
                    .person_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                {
                    Some(name) => {
                        self.set_text(Slot::StatusUser, name);
                        self.set_visible(Slot::StatusUser, true);
                    }
                    None => self.set_visible(Slot::StatusUser, false),
                }
                self.set_visible(Slot::WelcomeMessage, false);
                self.set_visible(Slot::ProgressBar, false);

                let coverage = Arc::clone(&self.coverage);
                self.sequencer
                    .play_sequence(sequences::access_denied(move || {
                        lock(&coverage).summary.missing_regions.clone()
                    }));
            }
        }
    }

    fn welcome_text(&self, person_name: Option<&str>) -> String {
        let named = person_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| {
                lock(&self.state)
                    .identity
                    .as_ref()
                    .filter(|identity| identity.matched)
                    .and_then(|identity| identity.name.clone())
                    .filter(|name| !name.trim().is_empty())
            });
        match named {
            Some(name) => format!("Welcome, {name}!"),
            None => "Welcome!".to_string(),
        }
    }

    fn show_welcome(&self, person_name: Option<&str>) {
        let text = self.welcome_text(person_name);
        self.set_text(Slot::WelcomeMessage, &text);
        self.set_visible(Slot::WelcomeMessage, true);
    }

    fn set_status(&self, icon: &str, headline: &str, message: &str) {
        self.set_text(Slot::StatusIcon, icon);
        self.set_text(Slot::StatusText, headline);
        self.set_text(Slot::StatusMessage, message);
    }

    fn clear_status_styling(&self) {
        for style in STATUS_STYLES {
            self.marker(Target::StatusPanel, style, false);
        }
        self.marker(Target::Element(Slot::StatusIcon), MarkerKind::Pulse, false);
    }

    fn render_coverage(&self) {
        let snapshot = lock(&self.coverage).clone();
        for (region, status) in &snapshot.statuses {
            skip_render_error(
                self.surface.set_region_style(*region, *status),
                "set_region_style",
            );
        }
        if snapshot.missing_equipment.is_empty() {
            self.set_visible(Slot::MissingEquipment, false);
        } else {
            self.set_text(
                Slot::MissingEquipment,
                &format!("Missing: {}", snapshot.missing_equipment.join(", ")),
            );
            self.set_visible(Slot::MissingEquipment, true);
        }
        debug!(
            required = snapshot.summary.required,
            detected = snapshot.summary.detected,
            missing = snapshot.summary.missing,
            "coverage: regions refreshed"
        );
        self.coverage_observer
            .coverage_updated(&snapshot.statuses, &snapshot.summary);
    }

    fn render_connection(&self, status: ConnectionStatus) {
        self.set_text(Slot::ConnectionStatus, status.label());
        self.marker(
            Target::Element(Slot::ConnectionStatus),
            MarkerKind::Connected,
            status == ConnectionStatus::Active,
        );
    }

    fn set_text(&self, slot: Slot, value: &str) {
        skip_render_error(self.surface.set_text(slot, value), "set_text");
    }

    fn set_visible(&self, slot: Slot, visible: bool) {
        skip_render_error(self.surface.set_visible(slot, visible), "set_visible");
    }

    fn marker(&self, target: Target, marker: MarkerKind, active: bool) {
        skip_render_error(
            self.surface.set_visual_marker(target, marker, active),
            "set_visual_marker",
        );
    }
}

fn progress_duration(seconds: Option<f32>) -> Duration {
    seconds
        .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
        .and_then(|seconds| Duration::try_from_secs_f32(seconds).ok())
        .unwrap_or(DEFAULT_PROGRESS_FILL)
}

#[cfg(test)]
#[path = "tests/synchronizer_tests.rs"]
mod tests;
