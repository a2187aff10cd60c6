//! High-level operations.
//!
//! This module contains the implementation of the two PEP 517 hooks.

pub mod build_sdist;
pub mod build_wheel;
pub mod report;

pub use build_sdist::{build_sdist, SdistOptions, StubSourceDistribution};
pub use build_wheel::{build_wheel, RedirectPlan, StubSource, WheelOptions};
pub use report::InstallReport;
