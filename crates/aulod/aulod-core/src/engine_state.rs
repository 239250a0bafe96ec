//! Manager for the published engine control block.
//!
//! Wraps a two-slot state cell: the control plane reconfigures through write
//! regions, the cycle thread promotes at cycle entry. `note_xrun` runs as a
//! nested region so it can be called from inside a larger reconfiguration
//! without publishing twice.

use aulos_control::EngineControl;
use aulos_state::StatePair;

pub struct EngineState {
    state: StatePair<EngineControl>,
}

impl EngineState {
    pub fn new(sample_rate: u32, buffer_frames: u32) -> Self {
        Self {
            state: StatePair::new(EngineControl::with_rates(sample_rate, buffer_frames)),
        }
    }

    /// Control plane: stage a change to the control block.
    pub fn configure<F: FnOnce(&mut EngineControl)>(&self, f: F) {
        let mut ctl = self.state.write();
        f(&mut ctl);
        // Keep the derived period consistent with whatever the closure set.
        ctl.period_ns = EngineControl::period_ns_for(ctl.sample_rate, ctl.buffer_frames);
    }

    /// Control plane: record a missed deadline. Nests inside `configure`.
    pub fn note_xrun(&self) {
        let mut ctl = self.state.write();
        ctl.xrun_count += 1;
    }

    /// Cycle thread, once per cycle entry: promote any staged change and
    /// return the block governing this cycle.
    pub fn cycle_begin(&self) -> &EngineControl {
        self.state.try_switch()
    }

    /// Cycle thread, within a cycle: the block promoted at cycle entry.
    pub fn current(&self) -> &EngineControl {
        self.state.read_current()
    }

    /// Non-RT observers: coherent copy.
    pub fn snapshot(&self) -> EngineControl {
        self.state.read_coherent()
    }

    pub fn has_pending(&self) -> bool {
        self.state.has_pending()
    }
}
