//! ais-core: Pure decode + tracking library for AIS.
//!
//! No async, no network. Just algorithms. Capture lines go in, typed
//! messages and reconstructed vessel tracks come out. The `ais-track` CLI
//! is a thin shell around this crate.

pub mod armor;
pub mod config;
pub mod deadreckon;
pub mod decode;
pub mod nmea;
pub mod tracker;
pub mod types;

// Re-export commonly used types at crate root
pub use armor::Bitstream;
pub use decode::{decode, decode_payload, Dispatch};
pub use nmea::{parse_line, FragmentAssembler, RawLine};
pub use tracker::{reconstruct, TrackPoint, Tracker, TrackerConfig, VesselState};
pub use types::*;
