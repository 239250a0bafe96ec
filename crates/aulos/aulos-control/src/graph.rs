//! Port connection graph published to the cycle thread.
//!
//! The graph is sized at compile time and fully inline (a fixed port table,
//! an adjacency bitset, and an active-client table), so the whole structure
//! is trivially copyable and a staging-slot reseed is a single bytewise
//! copy. Lookup on the cycle path is direct indexing: a port id is its table
//! index, no hashing, no heap, no branching beyond bounds checks that the
//! fixed capacity makes trivial.

/// Maximum ports in the graph. Port ids are dense indices below this.
pub const MAX_PORTS: usize = 64;

/// Maximum clients. Client ids are dense indices below this.
pub const MAX_CLIENTS: usize = 16;

/// Port carries input (sink) flow.
pub const PORT_INPUT: u8 = 0b01;

/// Port carries output (source) flow.
pub const PORT_OUTPUT: u8 = 0b10;

const WIRE_ROW_BYTES: usize = MAX_PORTS / 8;

/// Dense port identifier, stable across threads and publications.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PortId(pub u16);

/// Dense client identifier.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ClientId(pub u16);

/// One entry in the port table.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PortSlot {
    /// Non-zero when the slot is allocated.
    pub in_use: u8,
    /// Owning client id.
    pub client: u8,
    /// `PORT_INPUT` / `PORT_OUTPUT` flags.
    pub flags: u8,
    /// Channel index within the owning client.
    pub channel: u8,
}

impl PortSlot {
    const EMPTY: Self = Self {
        in_use: 0,
        client: 0,
        flags: 0,
        channel: 0,
    };
}

/// The connection graph: ports, wires, active clients.
///
/// Mutators bump `version`, giving control-plane observers a cheap change
/// mark independent of the publication machinery.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ConnectionGraph {
    /// Bumped on every mutation.
    pub version: u64,
    ports: [PortSlot; MAX_PORTS],
    /// Adjacency bitset: bit `dst` of row `src` is set when `src → dst`.
    wires: [[u8; WIRE_ROW_BYTES]; MAX_PORTS],
    active_clients: [u8; MAX_CLIENTS],
}

impl ConnectionGraph {
    /// An empty graph: no ports, no wires, no active clients.
    pub fn empty() -> Self {
        Self {
            version: 0,
            ports: [PortSlot::EMPTY; MAX_PORTS],
            wires: [[0; WIRE_ROW_BYTES]; MAX_PORTS],
            active_clients: [0; MAX_CLIENTS],
        }
    }

    /// Allocates a port for `client`. Returns `None` when the table is full.
    pub fn register_port(&mut self, client: ClientId, flags: u8, channel: u8) -> Option<PortId> {
        debug_assert!((client.0 as usize) < MAX_CLIENTS);
        let idx = self.ports.iter().position(|p| p.in_use == 0)?;
        self.ports[idx] = PortSlot {
            in_use: 1,
            client: client.0 as u8,
            flags,
            channel,
        };
        self.active_clients[client.0 as usize] = 1;
        self.version += 1;
        Some(PortId(idx as u16))
    }

    /// Releases a port and removes every wire touching it.
    pub fn unregister_port(&mut self, port: PortId) {
        let idx = port.0 as usize;
        if idx >= MAX_PORTS || self.ports[idx].in_use == 0 {
            return;
        }
        self.ports[idx] = PortSlot::EMPTY;
        self.wires[idx] = [0; WIRE_ROW_BYTES];
        for row in &mut self.wires {
            row[idx / 8] &= !(1 << (idx % 8));
        }
        self.version += 1;
    }

    /// Wires `src → dst`. Returns `false` when either end is unallocated or
    /// the directions do not match (source must be an output, sink an
    /// input).
    pub fn connect(&mut self, src: PortId, dst: PortId) -> bool {
        if !self.port_live(src, PORT_OUTPUT) || !self.port_live(dst, PORT_INPUT) {
            return false;
        }
        self.wires[src.0 as usize][dst.0 as usize / 8] |= 1 << (dst.0 % 8);
        self.version += 1;
        true
    }

    /// Removes the wire `src → dst`, if present.
    pub fn disconnect(&mut self, src: PortId, dst: PortId) -> bool {
        if !self.is_connected(src, dst) {
            return false;
        }
        self.wires[src.0 as usize][dst.0 as usize / 8] &= !(1 << (dst.0 % 8));
        self.version += 1;
        true
    }

    pub fn is_connected(&self, src: PortId, dst: PortId) -> bool {
        if src.0 as usize >= MAX_PORTS || dst.0 as usize >= MAX_PORTS {
            return false;
        }
        self.wires[src.0 as usize][dst.0 as usize / 8] & (1 << (dst.0 % 8)) != 0
    }

    /// Number of sinks wired to `src`.
    pub fn fanout(&self, src: PortId) -> usize {
        if src.0 as usize >= MAX_PORTS {
            return 0;
        }
        self.wires[src.0 as usize]
            .iter()
            .map(|b| b.count_ones() as usize)
            .sum()
    }

    pub fn port(&self, port: PortId) -> Option<&PortSlot> {
        let idx = port.0 as usize;
        (idx < MAX_PORTS && self.ports[idx].in_use != 0).then(|| &self.ports[idx])
    }

    pub fn port_count(&self) -> usize {
        self.ports.iter().filter(|p| p.in_use != 0).count()
    }

    /// Total wires in the graph.
    pub fn connection_count(&self) -> usize {
        self.wires
            .iter()
            .flat_map(|row| row.iter())
            .map(|b| b.count_ones() as usize)
            .sum()
    }

    pub fn client_active(&self, client: ClientId) -> bool {
        (client.0 as usize) < MAX_CLIENTS && self.active_clients[client.0 as usize] != 0
    }

    fn port_live(&self, port: PortId, wanted_flag: u8) -> bool {
        let idx = port.0 as usize;
        idx < MAX_PORTS && self.ports[idx].in_use != 0 && self.ports[idx].flags & wanted_flag != 0
    }
}

impl Default for ConnectionGraph {
    fn default() -> Self {
        Self::empty()
    }
}
