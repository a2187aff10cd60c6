//! Core data structures for wheel-stub.
//!
//! This module contains the foundational types used by both build hooks:
//! - Wheel filenames and name normalization
//! - Core metadata (`METADATA` / `PKG-INFO`)
//! - Compatibility tags and the target environment
//! - The error type surfaced to the build frontend

pub mod errors;
pub mod metadata;
pub mod tags;
pub mod wheel_name;

pub use errors::{StubError, StubResult};
pub use metadata::CoreMetadata;
pub use tags::{Tag, TargetEnvironment};
pub use wheel_name::{canonicalize_name, WheelDescriptor};
