//! `wheel-stub inspect` command
//!
//! Reads a wheel the same way `build-sdist` does and prints what the stub
//! would be built from, without writing anything.

use anyhow::Result;

use crate::cli::InspectArgs;
use wheel_stub::sources::wheel::WheelArtifact;
use wheel_stub::util::hash::sha256_file;

pub fn execute(args: InspectArgs) -> Result<()> {
    let wheel = WheelArtifact::open(&args.wheel)?;
    let descriptor = &wheel.descriptor;

    println!("Distribution: {}", descriptor.distribution_name);
    println!("Canonical name: {}", descriptor.canonical_name());
    println!("Version: {}", descriptor.version);
    println!("SHA256: {}", sha256_file(&args.wheel)?);
    if let Some(ref build) = descriptor.build_tag {
        println!("Build tag: {}", build);
    }

    println!("Tags:");
    for tag in descriptor.tags() {
        println!("  {}", tag);
    }

    println!("Requirement: {}", descriptor.requirement());
    println!("Stub sdist: {}", descriptor.sdist_filename());

    let direct_refs = wheel.metadata.direct_references();
    if !direct_refs.is_empty() {
        println!("Direct references (stub will be stub-only):");
        for req in direct_refs {
            println!("  {}", req);
        }
    }

    Ok(())
}
