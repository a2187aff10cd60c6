//! `wheel-stub cuda-info` command

use anyhow::Result;

use wheel_stub::util::probe::{EnvironmentProbe, SystemProbe};

pub fn execute() -> Result<()> {
    match SystemProbe::default().cuda() {
        Some(info) => print!("{}", info),
        None => println!("CUDA not detected (nvidia-smi not found or reported no versions)"),
    }
    Ok(())
}
