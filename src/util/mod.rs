//! Shared utilities

pub mod archive;
pub mod config;
pub mod diagnostic;
pub mod fs;
pub mod hash;
pub mod probe;
pub mod process;

pub use config::{BuildSettings, StubConfig};
pub use diagnostic::Diagnostic;
pub use probe::{EnvironmentProbe, SystemProbe};
