//! Implementation of the `build_sdist` hook.
//!
//! Turns a prebuilt wheel into a stub source distribution holding only
//! `PKG-INFO` (the wheel's metadata) and `pyproject.toml` (the project
//! file with the pinned requirement written into `[tool.wheel_stub]`).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use toml_edit::DocumentMut;

use crate::core::errors::{StubError, StubResult};
use crate::core::metadata::CoreMetadata;
use crate::core::wheel_name::WheelDescriptor;
use crate::sources::wheel::WheelArtifact;
use crate::util::archive::TarGzWriter;
use crate::util::fs::output_tempfile;
use crate::util::config::{
    source_date_epoch, BuildSettings, ConfigKey, StubConfig, PYPROJECT, TOOL_TABLE,
};

/// Metadata fields that tie a distribution to one platform.
const PLATFORM_FIELDS: [&str; 2] = ["Platform", "Supported-Platform"];

/// Options for building a stub sdist.
#[derive(Debug, Clone, Default)]
pub struct SdistOptions {
    /// Directory containing the project's pyproject.toml
    pub project_dir: PathBuf,

    /// Directory the sdist is written to (created if missing)
    pub sdist_dir: PathBuf,

    /// Hook settings from the frontend; must name `source_wheel`
    pub settings: BuildSettings,

    /// Raw `SOURCE_DATE_EPOCH`, if set
    pub source_date_epoch: Option<String>,
}

/// Build a stub sdist and return its path.
///
/// Configuration is validated before the wheel is opened, and the wheel is
/// never modified.
pub fn build_sdist(opts: &SdistOptions) -> StubResult<PathBuf> {
    let config = StubConfig::load(&opts.project_dir)?;
    let wheel_path = opts.settings.source_wheel(&opts.project_dir)?;
    let mtime = source_date_epoch(opts.source_date_epoch.as_deref())?;

    tracing::debug!("Building stub sdist from {}", wheel_path.display());
    let wheel = WheelArtifact::open(&wheel_path)?;

    let pyproject_path = opts.project_dir.join(PYPROJECT);
    let pyproject =
        fs::read_to_string(&pyproject_path).map_err(|e| StubError::io(&pyproject_path, e))?;

    let mut sdist = StubSourceDistribution::new(&wheel.descriptor, &wheel.metadata, &config, &pyproject)?;
    sdist.pyproject_executable = is_executable(&pyproject_path);

    fs::create_dir_all(&opts.sdist_dir).map_err(|e| StubError::io(&opts.sdist_dir, e))?;
    let path = sdist.write(&opts.sdist_dir, mtime)?;

    tracing::info!(
        "Created {} (requirement {}, stub_only = {})",
        sdist.filename,
        sdist.requirement,
        sdist.stub_only
    );
    Ok(path)
}

/// Contents of a stub source distribution, ready to archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubSourceDistribution {
    /// `{base_dir}.tar.gz`
    pub filename: String,

    /// Top-level directory inside the archive
    pub base_dir: String,

    pub pkg_info: String,
    pub pyproject: String,
    pub pyproject_executable: bool,

    /// Pinned runtime requirement, `name==version`
    pub requirement: String,

    /// Whether installs from this sdist are blocked
    pub stub_only: bool,
}

impl StubSourceDistribution {
    pub fn new(
        descriptor: &WheelDescriptor,
        metadata: &CoreMetadata,
        config: &StubConfig,
        pyproject: &str,
    ) -> StubResult<Self> {
        let mut metadata = metadata.clone();

        let direct_refs: Vec<String> = metadata
            .direct_references()
            .into_iter()
            .map(str::to_string)
            .collect();
        let forced_stub_only = !direct_refs.is_empty();

        if forced_stub_only {
            if config.stub_only == Some(false) {
                return Err(StubError::config(format!(
                    "cannot set {} to false: package depends on a direct URL reference ({})",
                    ConfigKey::StubOnly,
                    direct_refs.join(", ")
                )));
            }
            // The default index rejects uploads whose dependencies are URLs.
            let removed = metadata.remove_all("Requires-Dist");
            tracing::info!(
                "Dropped {} Requires-Dist entries because of direct references: {}",
                removed,
                direct_refs.join(", ")
            );
        }

        for field in PLATFORM_FIELDS {
            metadata.remove_all(field);
        }

        let requirement = descriptor.requirement();
        let pyproject = embed_stub_settings(pyproject, &requirement, forced_stub_only)?;
        let base_dir = descriptor.sdist_base();

        Ok(StubSourceDistribution {
            filename: format!("{}.tar.gz", base_dir),
            base_dir,
            pkg_info: metadata.to_text(),
            pyproject,
            pyproject_executable: false,
            requirement,
            stub_only: forced_stub_only || config.is_stub_only(),
        })
    }

    /// Encode the archive.
    pub fn to_bytes(&self, mtime: u64) -> StubResult<Vec<u8>> {
        let io_err = |e| StubError::io(&self.filename, e);

        let mut archive = TarGzWriter::new(Vec::new(), mtime);
        archive.append_dir(&self.base_dir).map_err(io_err)?;
        archive
            .append_file(
                &format!("{}/PKG-INFO", self.base_dir),
                self.pkg_info.as_bytes(),
                false,
            )
            .map_err(io_err)?;
        archive
            .append_file(
                &format!("{}/{}", self.base_dir, PYPROJECT),
                self.pyproject.as_bytes(),
                self.pyproject_executable,
            )
            .map_err(io_err)?;
        archive.finish().map_err(io_err)
    }

    /// Write the archive into `dir`, replacing any previous file atomically.
    pub fn write(&self, dir: &Path, mtime: u64) -> StubResult<PathBuf> {
        let bytes = self.to_bytes(mtime)?;
        let dest = dir.join(&self.filename);

        let mut tmp = output_tempfile(dir).map_err(|e| StubError::io(dir, e))?;
        tmp.write_all(&bytes).map_err(|e| StubError::io(tmp.path(), e))?;
        tmp.persist(&dest).map_err(|e| StubError::io(&dest, e.error))?;

        Ok(dest)
    }
}

/// Record the pinned requirement (and a forced `stub_only`) in
/// `[tool.wheel_stub]`, keeping the rest of the file as written.
fn embed_stub_settings(pyproject: &str, requirement: &str, force_stub_only: bool) -> StubResult<String> {
    let mut doc = pyproject
        .parse::<DocumentMut>()
        .map_err(|e| StubError::config(format!("failed to parse {}: {}", PYPROJECT, e)))?;

    let table = doc
        .get_mut("tool")
        .and_then(|tool| tool.get_mut(TOOL_TABLE))
        .and_then(|item| item.as_table_like_mut())
        .ok_or_else(|| {
            StubError::config(format!("missing [tool.{}] section in {}", TOOL_TABLE, PYPROJECT))
        })?;

    table.insert(ConfigKey::Requirement.name(), toml_edit::value(requirement));
    if force_stub_only {
        table.insert(ConfigKey::StubOnly.name(), toml_edit::value(true));
    }

    Ok(doc.to_string())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o100 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}
