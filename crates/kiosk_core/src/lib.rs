pub mod coverage;
pub mod event_stream;
pub mod sequencer;
pub mod sequences;
pub mod surface;
pub mod synchronizer;

pub use coverage::{
    compute_region_statuses, missing_equipment, summarize, CoverageSummary, RegionStatusMap,
};
pub use event_stream::{websocket_url, ClientEvent, EndpointError, EventStreamClient, Visibility};
pub use sequencer::{AnimationSequencer, SequenceHandle, SequenceStep};
pub use surface::{
    MarkerKind, Particle, ParticleId, ParticleSpec, RenderError, RenderSurface, Slot, Target,
};
pub use synchronizer::{ConnectionStatus, CoverageObserver, NoCoverageObserver, Synchronizer};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
