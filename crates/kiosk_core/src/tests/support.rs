use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use shared::domain::{Region, RegionStatus};
use tokio::time::Instant;

use crate::surface::{
    MarkerKind, Particle, ParticleId, RenderError, RenderSurface, Slot, Target,
};

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOp {
    RegionStyle(Region, RegionStatus),
    Marker(Target, MarkerKind, bool),
    Text(Slot, String),
    Visible(Slot, bool),
    ProgressFill(Duration),
    ParticleSpawned(ParticleId),
    ParticleRemoved(ParticleId),
}

#[derive(Default)]
struct Recorded {
    ops: Vec<(Duration, RenderOp)>,
    detached: HashSet<Target>,
    markers: HashSet<(Target, MarkerKind)>,
    texts: HashMap<Slot, String>,
    visible: HashMap<Slot, bool>,
    regions: HashMap<Region, RegionStatus>,
    particles: HashMap<ParticleId, Particle>,
}

pub struct RecordingSurface {
    origin: Instant,
    recorded: Mutex<Recorded>,
}

impl RecordingSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            origin: Instant::now(),
            recorded: Mutex::new(Recorded::default()),
        })
    }

    pub fn detach(&self, target: Target) {
        self.recorded.lock().unwrap().detached.insert(target);
    }

    pub fn ops(&self) -> Vec<(Duration, RenderOp)> {
        self.recorded.lock().unwrap().ops.clone()
    }

    /// Timestamps (ms since the surface was created) of every recorded `op`.
    pub fn times_of(&self, op: &RenderOp) -> Vec<u128> {
        self.ops()
            .into_iter()
            .filter(|(_, recorded)| recorded == op)
            .map(|(at, _)| at.as_millis())
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&RenderOp) -> bool) -> usize {
        self.ops().iter().filter(|(_, op)| matches(op)).count()
    }

    pub fn marker_active(&self, target: Target, marker: MarkerKind) -> bool {
        self.recorded
            .lock()
            .unwrap()
            .markers
            .contains(&(target, marker))
    }

    pub fn text(&self, slot: Slot) -> Option<String> {
        self.recorded.lock().unwrap().texts.get(&slot).cloned()
    }

    pub fn visible(&self, slot: Slot) -> Option<bool> {
        self.recorded.lock().unwrap().visible.get(&slot).copied()
    }

    pub fn region(&self, region: Region) -> Option<RegionStatus> {
        self.recorded.lock().unwrap().regions.get(&region).copied()
    }

    pub fn live_particles(&self) -> Vec<Particle> {
        self.recorded
            .lock()
            .unwrap()
            .particles
            .values()
            .cloned()
            .collect()
    }

    pub fn clear_ops(&self) {
        self.recorded.lock().unwrap().ops.clear();
    }

    fn record(&self, target: Option<Target>, op: RenderOp) -> Result<(), RenderError> {
        let mut recorded = self.recorded.lock().unwrap();
        if let Some(target) = target {
            if recorded.detached.contains(&target) {
                return Err(RenderError::missing(target));
            }
        }
        match &op {
            RenderOp::RegionStyle(region, status) => {
                recorded.regions.insert(*region, *status);
            }
            RenderOp::Marker(target, marker, true) => {
                recorded.markers.insert((*target, *marker));
            }
            RenderOp::Marker(target, marker, false) => {
                recorded.markers.remove(&(*target, *marker));
            }
            RenderOp::Text(slot, value) => {
                recorded.texts.insert(*slot, value.clone());
            }
            RenderOp::Visible(slot, visible) => {
                recorded.visible.insert(*slot, *visible);
            }
            RenderOp::ProgressFill(_) => {}
            RenderOp::ParticleSpawned(_) => {}
            RenderOp::ParticleRemoved(id) => {
                recorded.particles.remove(id);
            }
        }
        let at = self.origin.elapsed();
        recorded.ops.push((at, op));
        Ok(())
    }
}

impl RenderSurface for RecordingSurface {
    fn set_region_style(&self, region: Region, status: RegionStatus) -> Result<(), RenderError> {
        self.record(
            Some(Target::Region(region)),
            RenderOp::RegionStyle(region, status),
        )
    }

    fn set_visual_marker(
        &self,
        target: Target,
        marker: MarkerKind,
        active: bool,
    ) -> Result<(), RenderError> {
        self.record(Some(target), RenderOp::Marker(target, marker, active))
    }

    fn set_text(&self, slot: Slot, value: &str) -> Result<(), RenderError> {
        self.record(
            Some(Target::Element(slot)),
            RenderOp::Text(slot, value.to_string()),
        )
    }

    fn set_visible(&self, slot: Slot, visible: bool) -> Result<(), RenderError> {
        self.record(Some(Target::Element(slot)), RenderOp::Visible(slot, visible))
    }

    fn run_progress_fill(&self, duration: Duration) -> Result<(), RenderError> {
        self.record(
            Some(Target::Element(Slot::ProgressBar)),
            RenderOp::ProgressFill(duration),
        )
    }

    fn spawn_particle(&self, particle: &Particle) -> Result<(), RenderError> {
        self.record(None, RenderOp::ParticleSpawned(particle.id))?;
        self.recorded
            .lock()
            .unwrap()
            .particles
            .insert(particle.id, particle.clone());
        Ok(())
    }

    fn remove_particle(&self, id: ParticleId) -> Result<(), RenderError> {
        self.record(None, RenderOp::ParticleRemoved(id))
    }
}

pub fn assert_near(actual_ms: u128, expected_ms: u128) {
    assert!(
        actual_ms.abs_diff(expected_ms) <= 2,
        "expected ~{expected_ms}ms, got {actual_ms}ms"
    );
}
