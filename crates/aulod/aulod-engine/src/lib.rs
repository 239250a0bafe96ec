//! The cycle loop.
//!
//! Plays the role of the audio driver: once per cycle it promotes staged
//! state (`cycle_begin` on both managers), then works against the promoted
//! snapshot for the rest of the cycle so the whole cycle sees one coherent
//! graph and one coherent control block. There is no device I/O here; the
//! cycle is paced from the control block's period.

use aulod_core::ServerState;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// How often the run loop logs progress, in cycles.
const PROGRESS_EVERY: u64 = 1_000;

pub struct AulodEngine {
    server: Arc<ServerState>,
    cycles_run: u64,
    frames_processed: u64,
    /// Missed deadlines, counted cycle-side. The cycle thread is the reader
    /// of the control pair, so it must not stage writes; the control plane
    /// folds this into the published block via `note_xrun`.
    late_cycles: u64,
}

/// What one cycle saw; returned for callers that track engine activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub frames: u64,
    pub ports: usize,
    pub wires: usize,
}

impl AulodEngine {
    pub fn new(server: Arc<ServerState>) -> Self {
        Self {
            server,
            cycles_run: 0,
            frames_processed: 0,
            late_cycles: 0,
        }
    }

    /// Runs `cycles` cycles; 0 means run until the process is killed.
    pub fn run(&mut self, cycles: u64) {
        info!(cycles, "engine starting");
        let start = Instant::now();
        loop {
            let report = self.run_cycle();
            if self.cycles_run % PROGRESS_EVERY == 0 {
                debug!(
                    cycle = self.cycles_run,
                    ports = report.ports,
                    wires = report.wires,
                    "cycle progress"
                );
            }
            if cycles != 0 && self.cycles_run >= cycles {
                break;
            }
        }
        let elapsed = start.elapsed();
        info!(
            cycles = self.cycles_run,
            frames = self.frames_processed,
            ?elapsed,
            "engine stopped"
        );
    }

    /// One cycle: promote staged state, walk the graph, pace to the period.
    pub fn run_cycle(&mut self) -> CycleReport {
        let cycle_start = Instant::now();

        // Promote once on entry; every later access in this cycle goes
        // through `current()` and sees the same snapshot.
        let control = *self.server.engine.cycle_begin();
        let graph = self.server.graph.cycle_begin();

        let report = CycleReport {
            frames: control.buffer_frames as u64,
            ports: graph.port_count(),
            wires: graph.connection_count(),
        };

        self.cycles_run += 1;
        self.frames_processed += report.frames;

        let period = Duration::from_nanos(control.period_ns);
        let busy = cycle_start.elapsed();
        if busy < period {
            std::thread::sleep(period - busy);
        } else if control.period_ns != 0 {
            self.late_cycles += 1;
        }

        report
    }

    pub fn cycles_run(&self) -> u64 {
        self.cycles_run
    }

    pub fn late_cycles(&self) -> u64 {
        self.late_cycles
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}
