mod engine_state;
mod graph_manager;

pub use engine_state::EngineState;
pub use graph_manager::{GraphManager, LANE_CONTROL, LANE_REQUEST};

/// Shared server state: the two published cells and their managers.
///
/// One instance lives behind an `Arc`, shared between the cycle thread and
/// the control-plane threads.
pub struct ServerState {
    pub engine: EngineState,
    pub graph: GraphManager,
}

impl ServerState {
    pub fn new(sample_rate: u32, buffer_frames: u32) -> Self {
        Self {
            engine: EngineState::new(sample_rate, buffer_frames),
            graph: GraphManager::new(),
        }
    }
}
