//! Build configuration for the stub backend.
//!
//! Configuration comes from three places:
//! - `pyproject.toml`, table `[tool.wheel_stub]` (the project's own settings)
//! - hook settings passed by the frontend (`--config-setting KEY=VALUE`)
//! - environment overrides read by the CLI (`WHEEL_STUB_PIP_INDEX_URL`,
//!   `SOURCE_DATE_EPOCH`)
//!
//! ## Example pyproject.toml
//!
//! ```toml
//! [build-system]
//! requires = ["wheel-stub"]
//! build-backend = "wheel_stub.buildapi"
//!
//! [tool.wheel_stub]
//! index_url = "https://pypi.example.com/simple/"
//! include_cuda_debuginfo = true
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::core::errors::{StubError, StubResult};
use crate::util::archive::DEFAULT_SOURCE_DATE;

/// Name of the project configuration file.
pub const PYPROJECT: &str = "pyproject.toml";

/// Table under `[tool]` holding the stub settings.
pub const TOOL_TABLE: &str = "wheel_stub";

/// Hook setting naming the wheel to build a stub from.
pub const SOURCE_WHEEL_SETTING: &str = "source_wheel";

/// Keys recognized in `[tool.wheel_stub]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    /// Third-party index hosting the real wheel (string URL, required)
    IndexUrl,
    /// Fail installs with instructions instead of redirecting (bool, default false)
    StubOnly,
    /// Add CUDA driver/runtime versions to install failure reports (bool, default false)
    IncludeCudaDebuginfo,
    /// Pinned requirement written into generated sdists (string)
    Requirement,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 4] = [
        ConfigKey::IndexUrl,
        ConfigKey::StubOnly,
        ConfigKey::IncludeCudaDebuginfo,
        ConfigKey::Requirement,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConfigKey::IndexUrl => "index_url",
            ConfigKey::StubOnly => "stub_only",
            ConfigKey::IncludeCudaDebuginfo => "include_cuda_debuginfo",
            ConfigKey::Requirement => "requirement",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }

    fn expected_type(self) -> &'static str {
        match self {
            ConfigKey::IndexUrl | ConfigKey::Requirement => "a string",
            ConfigKey::StubOnly | ConfigKey::IncludeCudaDebuginfo => "a boolean",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[tool.{}].{}", TOOL_TABLE, self.name())
    }
}

/// Validated `[tool.wheel_stub]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubConfig {
    /// Index base URL, always ending in `/`
    pub index_url: Url,

    /// `None` when the key is absent; the builder distinguishes "unset" from
    /// an explicit `false`.
    pub stub_only: Option<bool>,

    pub include_cuda_debuginfo: bool,

    /// Pinned requirement embedded by a previous sdist build
    pub requirement: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PyProject {
    #[serde(default)]
    tool: Option<ToolSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ToolSection {
    #[serde(default)]
    wheel_stub: Option<toml::Table>,
}

impl StubConfig {
    /// Load from `pyproject.toml` in `project_dir`.
    pub fn load(project_dir: &Path) -> StubResult<Self> {
        let path = project_dir.join(PYPROJECT);
        let content = std::fs::read_to_string(&path).map_err(|e| StubError::io(&path, e))?;
        Self::parse(&content)
    }

    /// Parse and validate `pyproject.toml` content.
    pub fn parse(content: &str) -> StubResult<Self> {
        let pyproject: PyProject = toml::from_str(content)
            .map_err(|e| StubError::config(format!("failed to parse {}: {}", PYPROJECT, e)))?;

        let table = pyproject
            .tool
            .and_then(|tool| tool.wheel_stub)
            .ok_or_else(|| {
                StubError::config(format!(
                    "missing [tool.{}] section in {}",
                    TOOL_TABLE, PYPROJECT
                ))
            })?;

        Self::from_table(&table)
    }

    /// Validate a raw `[tool.wheel_stub]` table against the key schema.
    pub fn from_table(table: &toml::Table) -> StubResult<Self> {
        for key in table.keys() {
            if ConfigKey::from_name(key).is_none() {
                tracing::warn!("Ignoring unknown key `{}` in [tool.{}]", key, TOOL_TABLE);
            }
        }

        let index_url = match table.get(ConfigKey::IndexUrl.name()) {
            Some(toml::Value::String(raw)) => parse_index_url(raw)?,
            Some(_) => return Err(type_error(ConfigKey::IndexUrl)),
            None => {
                return Err(StubError::config(format!(
                    "{} is required",
                    ConfigKey::IndexUrl
                )))
            }
        };

        let stub_only = get_bool(table, ConfigKey::StubOnly)?;
        let include_cuda_debuginfo = get_bool(table, ConfigKey::IncludeCudaDebuginfo)?.unwrap_or(false);

        let requirement = match table.get(ConfigKey::Requirement.name()) {
            Some(toml::Value::String(req)) => Some(req.clone()),
            Some(_) => return Err(type_error(ConfigKey::Requirement)),
            None => None,
        };

        Ok(StubConfig {
            index_url,
            stub_only,
            include_cuda_debuginfo,
            requirement,
        })
    }

    /// Whether installs are blocked rather than redirected.
    pub fn is_stub_only(&self) -> bool {
        self.stub_only.unwrap_or(false)
    }

    /// Replace the index with an environment-supplied one, if any.
    pub fn with_index_override(mut self, index_url: Option<&str>) -> StubResult<Self> {
        if let Some(raw) = index_url.filter(|s| !s.is_empty()) {
            let url = parse_index_url(raw)?;
            tracing::debug!("Overriding index {} with {}", self.index_url, url);
            self.index_url = url;
        }
        Ok(self)
    }
}

fn get_bool(table: &toml::Table, key: ConfigKey) -> StubResult<Option<bool>> {
    match table.get(key.name()) {
        Some(toml::Value::Boolean(b)) => Ok(Some(*b)),
        Some(_) => Err(type_error(key)),
        None => Ok(None),
    }
}

fn type_error(key: ConfigKey) -> StubError {
    StubError::config(format!("{} must be {}", key, key.expected_type()))
}

/// Validate an index URL and make sure it ends in `/`, so that joining a
/// project name appends rather than replaces the last path segment.
pub fn parse_index_url(raw: &str) -> StubResult<Url> {
    let mut url = Url::parse(raw.trim()).map_err(|e| {
        StubError::config(format!(
            "{} `{}` is not a valid URL: {}",
            ConfigKey::IndexUrl,
            raw,
            e
        ))
    })?;

    let missing_host = url.host_str().map_or(true, str::is_empty) && url.scheme() != "file";
    if url.cannot_be_a_base() || missing_host {
        return Err(StubError::config(format!(
            "{} `{}` is not an absolute URL with a host",
            ConfigKey::IndexUrl,
            raw
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Hook settings passed by the build frontend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSettings {
    values: BTreeMap<String, String>,
}

impl BuildSettings {
    /// Parse `KEY=VALUE` pairs. Later pairs win.
    pub fn from_pairs<I, S>(pairs: I) -> StubResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values = BTreeMap::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                StubError::config(format!("config setting `{}` must have the form KEY=VALUE", pair))
            })?;
            values.insert(key.trim().to_string(), value.to_string());
        }
        Ok(BuildSettings { values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The wheel to build a stub from, resolved against `project_dir`.
    pub fn source_wheel(&self, project_dir: &Path) -> StubResult<PathBuf> {
        let raw = self.get(SOURCE_WHEEL_SETTING).ok_or_else(|| {
            StubError::config(format!(
                "must pass --config-setting {}=./path/to/wheel_file.whl when building an sdist",
                SOURCE_WHEEL_SETTING
            ))
        })?;
        Ok(project_dir.join(raw))
    }
}

/// Resolve the archive timestamp from a `SOURCE_DATE_EPOCH` value.
pub fn source_date_epoch(raw: Option<&str>) -> StubResult<u64> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => value.parse::<u64>().map_err(|_| {
            StubError::config(format!(
                "SOURCE_DATE_EPOCH must be a non-negative integer, got `{}`",
                value
            ))
        }),
        None => Ok(DEFAULT_SOURCE_DATE),
    }
}
