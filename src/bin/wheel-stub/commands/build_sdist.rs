//! `wheel-stub build-sdist` command

use anyhow::Result;

use crate::cli::BuildSdistArgs;
use wheel_stub::ops::build_sdist::{build_sdist, SdistOptions};
use wheel_stub::util::config::BuildSettings;

pub fn execute(args: BuildSdistArgs) -> Result<()> {
    let opts = SdistOptions {
        project_dir: args.project_dir,
        sdist_dir: args.sdist_dir,
        settings: BuildSettings::from_pairs(&args.config_settings)?,
        source_date_epoch: args.source_date_epoch,
    };

    let path = build_sdist(&opts)?;

    // PEP 517 hooks return the basename of the created file.
    if let Some(name) = path.file_name() {
        println!("{}", name.to_string_lossy());
    }
    Ok(())
}
