use std::time::Duration;

use kiosk_core::{
    CoverageObserver, CoverageSummary, MarkerKind, Particle, ParticleId, RegionStatusMap,
    RenderError, RenderSurface, Slot, Target,
};
use shared::domain::{Region, RegionStatus};
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct TracingSurface;

impl RenderSurface for TracingSurface {
    fn set_region_style(&self, region: Region, status: RegionStatus) -> Result<(), RenderError> {
        debug!(
            region = region.id(),
            status = ?status,
            color = status.color(),
            "render: region style"
        );
        Ok(())
    }

    fn set_visual_marker(
        &self,
        target: Target,
        marker: MarkerKind,
        active: bool,
    ) -> Result<(), RenderError> {
        debug!(%target, ?marker, active, "render: marker");
        Ok(())
    }

    fn set_text(&self, slot: Slot, value: &str) -> Result<(), RenderError> {
        info!(slot = slot.id(), value, "render: text");
        Ok(())
    }

    fn set_visible(&self, slot: Slot, visible: bool) -> Result<(), RenderError> {
        debug!(slot = slot.id(), visible, "render: visibility");
        Ok(())
    }

    fn run_progress_fill(&self, duration: Duration) -> Result<(), RenderError> {
        info!(duration_ms = duration.as_millis() as u64, "render: progress fill");
        Ok(())
    }

    fn spawn_particle(&self, particle: &Particle) -> Result<(), RenderError> {
        debug!(
            id = particle.id.0,
            size_px = particle.size_px,
            color = particle.color,
            x_percent = particle.x_percent,
            "render: particle"
        );
        Ok(())
    }

    fn remove_particle(&self, id: ParticleId) -> Result<(), RenderError> {
        debug!(id = id.0, "render: particle removed");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CoverageLog;

impl CoverageObserver for CoverageLog {
    fn coverage_updated(&self, _statuses: &RegionStatusMap, summary: &CoverageSummary) {
        let missing: Vec<&str> = summary
            .missing_regions
            .iter()
            .map(|region| region.display_name())
            .collect();
        info!(
            required = summary.required,
            detected = summary.detected,
            missing = ?missing,
            "coverage: updated"
        );
    }
}
