use std::{fmt, time::Duration};

use shared::domain::{Region, RegionStatus};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    StatusIcon,
    StatusText,
    StatusMessage,
    StatusUser,
    WelcomeMessage,
    ProgressBar,
    MissingEquipment,
    ConnectionStatus,
}

impl Slot {
    pub fn id(self) -> &'static str {
        match self {
            Self::StatusIcon => "status-icon",
            Self::StatusText => "status-text",
            Self::StatusMessage => "status-message",
            Self::StatusUser => "status-user",
            Self::WelcomeMessage => "welcome-message",
            Self::ProgressBar => "progress-bar",
            Self::MissingEquipment => "missing-equipment",
            Self::ConnectionStatus => "connection-status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Region(Region),
    StatusPanel,
    Element(Slot),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Region(region) => write!(f, "region:{region}"),
            Self::StatusPanel => f.write_str("status-panel"),
            Self::Element(slot) => f.write_str(slot.id()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    // persistent status styling
    Granted,
    Denied,
    Checking,
    Pulse,
    Connected,
    // transient effects
    Success,
    Attention,
    Shake,
    FadeOut,
    FadeIn,
    SlideIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub id: ParticleId,
    pub size_px: u32,
    pub color: &'static str,
    pub x_percent: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticleSpec {
    pub size_px: u32,
    pub color: &'static str,
    pub x_percent: f32,
}

impl ParticleSpec {
    pub fn with_id(self, id: ParticleId) -> Particle {
        Particle {
            id,
            size_px: self.size_px,
            color: self.color,
            x_percent: self.x_percent,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("render target {0} is not attached")]
    MissingTarget(String),
}

impl RenderError {
    pub fn missing(target: impl fmt::Display) -> Self {
        Self::MissingTarget(target.to_string())
    }
}

pub trait RenderSurface: Send + Sync {
    fn set_region_style(&self, region: Region, status: RegionStatus) -> Result<(), RenderError>;
    fn set_visual_marker(
        &self,
        target: Target,
        marker: MarkerKind,
        active: bool,
    ) -> Result<(), RenderError>;
    fn set_text(&self, slot: Slot, value: &str) -> Result<(), RenderError>;
    fn set_visible(&self, slot: Slot, visible: bool) -> Result<(), RenderError>;
    fn run_progress_fill(&self, duration: Duration) -> Result<(), RenderError>;
    fn spawn_particle(&self, particle: &Particle) -> Result<(), RenderError>;
    fn remove_particle(&self, id: ParticleId) -> Result<(), RenderError>;
}

pub(crate) fn skip_render_error(result: Result<(), RenderError>, operation: &'static str) {
    if let Err(err) = result {
        debug!(operation, error = %err, "render: skipped");
    }
}
