//! wheel-stub - a PEP 517 build backend for stub packages.
//!
//! A stub is a source distribution published to the default package index
//! that stands in for a wheel hosted on a third-party index. `build_sdist`
//! turns that wheel into the stub; at install time `build_wheel` either
//! fetches the real wheel from the third-party index or fails with
//! instructions for installing it directly.

pub mod core;
pub mod ops;
pub mod sources;
pub mod util;

/// Test utilities and mocks for wheel-stub unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides wheel fixtures, a mock HTTP client and a
/// fixed environment probe.
#[cfg(test)]
pub mod test_support;

pub use core::{StubError, StubResult, WheelDescriptor};
pub use ops::{build_sdist, build_wheel, SdistOptions, WheelOptions};
