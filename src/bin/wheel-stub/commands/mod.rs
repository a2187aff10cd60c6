//! Command implementations

pub mod build_sdist;
pub mod build_wheel;
pub mod completions;
pub mod cuda_info;
pub mod inspect;
