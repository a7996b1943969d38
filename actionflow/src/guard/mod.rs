//! Single-flight admission per invoking entity.

mod single_flight;

pub use single_flight::{FlightPermit, HostId, SingleFlightGuard};
