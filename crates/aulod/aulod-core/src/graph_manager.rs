//! Manager for the published connection graph.
//!
//! Wraps the three-slot state cell. Lane 1 carries control-plane graph
//! edits; lane 2 is the request lane for client-originated changes. Both
//! lanes stage concurrently; the cycle thread promotes each once per cycle
//! entry, and the most recently promoted lane defines the graph the cycle
//! processes.

use aulos_control::{ClientId, ConnectionGraph, PortId};
use aulos_state::{BankWriteGuard, StateBank};

/// Lane for server-side graph edits.
pub const LANE_CONTROL: usize = 1;

/// Lane for client-originated requests.
pub const LANE_REQUEST: usize = 2;

pub struct GraphManager {
    state: StateBank<ConnectionGraph>,
}

impl GraphManager {
    pub fn new() -> Self {
        Self {
            state: StateBank::new(ConnectionGraph::empty()),
        }
    }

    /// Opens a staging region on a lane. Edits accumulate across regions on
    /// the same lane until the cycle thread promotes them.
    pub fn stage(&self, lane: usize) -> BankWriteGuard<'_, ConnectionGraph> {
        self.state.write(lane)
    }

    /// Control plane: allocate a port.
    pub fn register_port(&self, client: ClientId, flags: u8, channel: u8) -> Option<PortId> {
        self.stage(LANE_CONTROL).register_port(client, flags, channel)
    }

    /// Control plane: release a port.
    pub fn unregister_port(&self, port: PortId) {
        self.stage(LANE_CONTROL).unregister_port(port);
    }

    /// Control plane: wire `src → dst`.
    pub fn connect(&self, src: PortId, dst: PortId) -> bool {
        self.stage(LANE_CONTROL).connect(src, dst)
    }

    /// Control plane: remove the wire `src → dst`.
    pub fn disconnect(&self, src: PortId, dst: PortId) -> bool {
        self.stage(LANE_CONTROL).disconnect(src, dst)
    }

    /// Cycle thread, once per cycle entry: promote staged edits from both
    /// lanes and return the graph governing this cycle. The request lane is
    /// promoted second, so a concurrent request wins over an older control
    /// edit, matching promotion order elsewhere in the server.
    pub fn cycle_begin(&self) -> &ConnectionGraph {
        self.state.try_switch(LANE_CONTROL);
        self.state.try_switch(LANE_REQUEST)
    }

    /// Cycle thread, within a cycle: the graph promoted at cycle entry.
    pub fn current(&self) -> &ConnectionGraph {
        self.state.read_current()
    }

    /// Non-RT observers: coherent copy.
    pub fn snapshot(&self) -> ConnectionGraph {
        self.state.read_coherent()
    }

    /// Switch ticket, advanced once per promoted lane.
    pub fn ticket(&self) -> u8 {
        self.state.ticket()
    }
}

impl Default for GraphManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aulos_control::{PORT_INPUT, PORT_OUTPUT};

    #[test]
    fn staged_edits_land_at_cycle_entry() {
        let mgr = GraphManager::new();

        let out = mgr.register_port(ClientId(0), PORT_OUTPUT, 0).unwrap();
        let inp = mgr.register_port(ClientId(1), PORT_INPUT, 0).unwrap();
        assert!(mgr.connect(out, inp));

        // Nothing promoted yet: the cycle graph is still empty.
        assert_eq!(mgr.current().port_count(), 0);

        let graph = mgr.cycle_begin();
        assert_eq!(graph.port_count(), 2);
        assert!(graph.is_connected(out, inp));
    }

    #[test]
    fn edits_accumulate_across_regions_on_one_lane() {
        let mgr = GraphManager::new();

        let out = mgr.register_port(ClientId(0), PORT_OUTPUT, 0).unwrap();
        let inp = mgr.register_port(ClientId(0), PORT_INPUT, 0).unwrap();
        mgr.connect(out, inp);
        mgr.cycle_begin();
        assert_eq!(mgr.current().connection_count(), 1);

        // Edits after a promotion start from the promoted graph.
        mgr.disconnect(out, inp);
        let graph = mgr.cycle_begin();
        assert_eq!(graph.connection_count(), 0);
        assert_eq!(graph.port_count(), 2);
    }

    #[test]
    fn request_lane_is_promoted_after_control() {
        let mgr = GraphManager::new();

        let t0 = mgr.ticket();
        mgr.register_port(ClientId(0), PORT_OUTPUT, 0).unwrap();
        {
            let mut g = mgr.stage(LANE_REQUEST);
            g.register_port(ClientId(1), PORT_INPUT, 0);
        }

        let graph = mgr.cycle_begin();
        // The request lane staged from the pre-control base and was
        // promoted last: only its own edit is visible.
        assert_eq!(graph.port_count(), 1);
        assert_eq!(mgr.ticket(), t0.wrapping_add(2), "both lanes promoted");
    }

    #[test]
    fn unregister_lands_like_any_other_edit() {
        let mgr = GraphManager::new();
        let out = mgr.register_port(ClientId(0), PORT_OUTPUT, 0).unwrap();
        let inp = mgr.register_port(ClientId(0), PORT_INPUT, 0).unwrap();
        mgr.connect(out, inp);
        mgr.cycle_begin();

        mgr.unregister_port(inp);
        let graph = mgr.cycle_begin();
        assert_eq!(graph.port_count(), 1);
        assert_eq!(graph.connection_count(), 0, "wires to the port went too");
    }

    #[test]
    fn snapshot_tracks_promotions() {
        let mgr = GraphManager::new();
        mgr.register_port(ClientId(0), PORT_INPUT, 0).unwrap();
        assert_eq!(mgr.snapshot().port_count(), 0);
        mgr.cycle_begin();
        assert_eq!(mgr.snapshot().port_count(), 1);
    }
}
