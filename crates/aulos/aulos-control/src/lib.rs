pub mod control;
pub mod graph;

pub use control::EngineControl;
pub use graph::{
    ClientId, ConnectionGraph, MAX_CLIENTS, MAX_PORTS, PORT_INPUT, PORT_OUTPUT, PortId, PortSlot,
};
