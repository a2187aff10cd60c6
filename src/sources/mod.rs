//! Package sources.
//!
//! Sources read artifacts from two places: a wheel file on disk (the input
//! of `build_sdist`) and a PEP 503 simple index (where `build_wheel` finds
//! the real wheel).

pub mod index;
pub mod wheel;

pub use index::{HttpClient, IndexFetcher, ReqwestClient, WheelLink};
pub use wheel::WheelArtifact;
