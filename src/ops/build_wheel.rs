//! Implementation of the `build_wheel` hook.
//!
//! A stub sdist never builds anything. Its "wheel build" either fails with
//! install instructions (stub-only packages) or fetches the real wheel from
//! the configured index into the wheel directory.

use std::fs;
use std::path::{Path, PathBuf};

use url::Url;

use crate::core::errors::{StubError, StubResult};
use crate::core::metadata::CoreMetadata;
use crate::core::wheel_name::canonicalize_name;
use crate::ops::report::InstallReport;
use crate::sources::index::{HttpClient, IndexFetcher};
use crate::util::config::{ConfigKey, StubConfig};
use crate::util::probe::{EnvironmentProbe, InterpreterInfo};

/// Metadata file at the root of an unpacked sdist.
pub const PKG_INFO: &str = "PKG-INFO";

/// What build_wheel will do for a given stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectPlan {
    /// Fetch `requirement` from `index_url`.
    Resolve {
        distribution: String,
        version: String,
        requirement: String,
        index_url: Url,
    },
    /// Fail with remediation instructions, without touching the network.
    Blocked,
}

/// Options for the wheel hook.
#[derive(Debug, Clone, Default)]
pub struct WheelOptions {
    /// Unpacked stub sdist (holds PKG-INFO and pyproject.toml)
    pub source_dir: PathBuf,

    /// Directory the fetched wheel is written to
    pub wheel_dir: PathBuf,

    /// Index replacing the configured one (`WHEEL_STUB_PIP_INDEX_URL`)
    pub index_url_override: Option<String>,
}

/// An unpacked stub sdist.
#[derive(Debug, Clone)]
pub struct StubSource {
    pub metadata: CoreMetadata,
    pub config: StubConfig,
    /// Canonical distribution name from PKG-INFO
    pub distribution: String,
    pub version: String,
}

impl StubSource {
    /// Read PKG-INFO and `[tool.wheel_stub]` from `source_dir`.
    pub fn load(source_dir: &Path, index_url_override: Option<&str>) -> StubResult<Self> {
        let config = StubConfig::load(source_dir)?.with_index_override(index_url_override)?;

        let pkg_info_path = source_dir.join(PKG_INFO);
        let text =
            fs::read_to_string(&pkg_info_path).map_err(|e| StubError::io(&pkg_info_path, e))?;
        let metadata = CoreMetadata::parse(&text)
            .map_err(|e| StubError::config(format!("invalid {}: {}", PKG_INFO, e)))?;

        let name = metadata
            .name()
            .ok_or_else(|| StubError::config(format!("{} has no Name field", PKG_INFO)))?;
        let version = metadata
            .version()
            .ok_or_else(|| StubError::config(format!("{} has no Version field", PKG_INFO)))?
            .to_string();

        Ok(StubSource {
            distribution: canonicalize_name(name),
            version,
            metadata,
            config,
        })
    }

    /// The requirement to install: the embedded one, or `name==version`.
    ///
    /// When both exist they must name the same distribution and version.
    pub fn requirement(&self) -> StubResult<String> {
        let fallback = format!("{}=={}", self.distribution, self.version);
        let Some(embedded) = self.config.requirement.as_deref() else {
            tracing::debug!("No embedded requirement, using {}", fallback);
            return Ok(fallback);
        };

        let (name, version) = embedded.split_once("==").ok_or_else(|| {
            StubError::config(format!(
                "{} `{}` must have the form name==version",
                ConfigKey::Requirement,
                embedded
            ))
        })?;

        if canonicalize_name(name.trim()) != self.distribution || version.trim() != self.version {
            return Err(StubError::config(format!(
                "{} `{}` does not match {} ({})",
                ConfigKey::Requirement,
                embedded,
                PKG_INFO,
                fallback
            )));
        }
        Ok(embedded.to_string())
    }

    /// Decide what build_wheel does. No I/O.
    pub fn plan(&self) -> StubResult<RedirectPlan> {
        if self.config.is_stub_only() {
            return Ok(RedirectPlan::Blocked);
        }
        Ok(RedirectPlan::Resolve {
            distribution: self.distribution.clone(),
            version: self.version.clone(),
            requirement: self.requirement()?,
            index_url: self.config.index_url.clone(),
        })
    }

    fn report(&self, interpreter: Option<&InterpreterInfo>, probe: &dyn EnvironmentProbe) -> String {
        InstallReport::collect(&self.distribution, &self.version, &self.config, interpreter, probe)
            .render()
    }
}

/// Run the wheel hook and return the path of the fetched wheel.
pub fn build_wheel(
    opts: &WheelOptions,
    client: &dyn HttpClient,
    probe: &dyn EnvironmentProbe,
) -> StubResult<PathBuf> {
    let source = StubSource::load(&opts.source_dir, opts.index_url_override.as_deref())?;

    match source.plan()? {
        RedirectPlan::Blocked => {
            tracing::debug!("{} is stub-only, not fetching", source.distribution);
            let interpreter = probe.interpreter();
            Err(StubError::InstallBlocked {
                report: source.report(interpreter.as_ref(), probe),
            })
        }
        RedirectPlan::Resolve {
            distribution,
            version,
            requirement,
            index_url,
        } => {
            tracing::info!("Resolving {} from {}", requirement, index_url);
            let interpreter = probe.interpreter();

            fetch_wheel(
                client,
                index_url,
                &distribution,
                &version,
                interpreter.as_ref(),
                &opts.wheel_dir,
            )
            .map_err(|cause| StubError::InstallFailed {
                report: source.report(interpreter.as_ref(), probe),
                cause: cause.to_string(),
            })
        }
    }
}

fn fetch_wheel(
    client: &dyn HttpClient,
    index_url: Url,
    distribution: &str,
    version: &str,
    interpreter: Option<&InterpreterInfo>,
    wheel_dir: &Path,
) -> StubResult<PathBuf> {
    let interpreter = interpreter.ok_or_else(|| {
        StubError::index("could not determine the target interpreter; set WHEEL_STUB_PYTHON")
    })?;
    let env = interpreter.target_environment();

    let fetcher = IndexFetcher::new(client, index_url);
    let link = fetcher.find_wheel(distribution, version, &env)?;

    fs::create_dir_all(wheel_dir).map_err(|e| StubError::io(wheel_dir, e))?;
    fetcher.download(&link, wheel_dir)
}
