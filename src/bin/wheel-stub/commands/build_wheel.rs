//! `wheel-stub build-wheel` command

use anyhow::Result;

use crate::cli::BuildWheelArgs;
use wheel_stub::ops::build_wheel::{build_wheel, WheelOptions};
use wheel_stub::sources::index::ReqwestClient;
use wheel_stub::util::probe::SystemProbe;

pub fn execute(args: BuildWheelArgs) -> Result<()> {
    if !args.config_settings.is_empty() {
        tracing::debug!("Ignoring config settings: {:?}", args.config_settings);
    }

    let opts = WheelOptions {
        source_dir: args.source_dir,
        wheel_dir: args.wheel_dir,
        index_url_override: args.index_url,
    };
    let client = ReqwestClient::new()?;
    let probe = SystemProbe::new(args.python);

    let path = build_wheel(&opts, &client, &probe)?;

    if let Some(name) = path.file_name() {
        println!("{}", name.to_string_lossy());
    }
    Ok(())
}
