use gdslink_ground::GroundError;
use gdslink_transport::TransportError;

use crate::state::PipelineState;

/// Errors reported by the downlink and uplink pipelines.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The wire failed while the pipeline was running.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The ground channel failed while the pipeline was running.
    #[error("ground error: {0}")]
    Ground(#[from] GroundError),

    /// A lifecycle call was made from the wrong state.
    #[error("cannot {action} {pipeline} pipeline while {state}")]
    InvalidState {
        pipeline: &'static str,
        action: &'static str,
        state: PipelineState,
    },

    /// A stage thread could not be spawned.
    #[error("failed to spawn {stage} stage: {source}")]
    Spawn {
        stage: &'static str,
        source: std::io::Error,
    },

    /// A stage thread panicked.
    #[error("{0} stage panicked")]
    StagePanicked(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
