//! Wheel filename parsing.
//!
//! A wheel filename has the shape
//!
//! ```text
//! {name}-{version}(-{build_tag})?-{python_tag}-{abi_tag}-{platform_tag}.whl
//! ```
//!
//! Each of the three tag fields may be a compressed tag set, e.g.
//! `manylinux1_x86_64.manylinux_2_5_x86_64`.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::errors::{StubError, StubResult};
use crate::core::tags::Tag;

/// Valid distribution name segment inside a wheel filename (no `-`).
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9._]*[A-Za-z0-9])?$").unwrap());

/// PEP 440 version, public part plus optional local label.
static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)^
        v?
        (?:[0-9]+!)?
        [0-9]+(?:\.[0-9]+)*
        (?:[._]?(?:a|b|c|rc|alpha|beta|pre|preview)[._]?[0-9]*)?
        (?:[._]?(?:post|rev|r)[._]?[0-9]*)?
        (?:[._]?dev[._]?[0-9]*)?
        (?:\+[a-z0-9]+(?:[._][a-z0-9]+)*)?
        $",
    )
    .unwrap()
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)*$").unwrap());

static SEPARATOR_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-_.]+").unwrap());

/// Normalize a distribution name: lowercase, with runs of `-`, `_` and `.`
/// collapsed to a single `-`.
pub fn canonicalize_name(name: &str) -> String {
    SEPARATOR_RUN_RE
        .replace_all(&name.to_ascii_lowercase(), "-")
        .into_owned()
}

/// Check a version string against the PEP 440 grammar.
pub fn is_valid_version(version: &str) -> bool {
    VERSION_RE.is_match(version)
}

/// The fields of a parsed wheel filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WheelDescriptor {
    pub distribution_name: String,
    pub version: String,
    pub build_tag: Option<String>,
    pub python_tag: String,
    pub abi_tag: String,
    pub platform_tag: String,
}

impl WheelDescriptor {
    /// Parse a bare wheel filename (no directory components).
    pub fn parse(filename: &str) -> StubResult<Self> {
        let stem = filename
            .strip_suffix(".whl")
            .ok_or_else(|| StubError::malformed(filename, "filename must end in `.whl`"))?;

        let parts: Vec<&str> = stem.split('-').collect();
        let (name, version, build_tag, python_tag, abi_tag, platform_tag) = match parts[..] {
            [name, version, python, abi, platform] => (name, version, None, python, abi, platform),
            [name, version, build, python, abi, platform] => {
                (name, version, Some(build), python, abi, platform)
            }
            _ => {
                return Err(StubError::malformed(
                    filename,
                    format!(
                        "expected 5 or 6 dash-separated fields before `.whl`, found {}",
                        parts.len()
                    ),
                ))
            }
        };

        if !NAME_RE.is_match(name) {
            return Err(StubError::malformed(
                filename,
                format!("invalid distribution name `{}`", name),
            ));
        }

        if !is_valid_version(version) {
            return Err(StubError::malformed(
                filename,
                format!("invalid version `{}`", version),
            ));
        }

        if let Some(build) = build_tag {
            if !build.starts_with(|c: char| c.is_ascii_digit()) {
                return Err(StubError::malformed(
                    filename,
                    format!("build tag `{}` must start with a digit", build),
                ));
            }
        }

        for (label, tag) in [("python", python_tag), ("abi", abi_tag), ("platform", platform_tag)] {
            if !TAG_RE.is_match(tag) {
                return Err(StubError::malformed(
                    filename,
                    format!("invalid {} tag `{}`", label, tag),
                ));
            }
        }

        Ok(WheelDescriptor {
            distribution_name: name.to_string(),
            version: version.to_string(),
            build_tag: build_tag.map(str::to_string),
            python_tag: python_tag.to_string(),
            abi_tag: abi_tag.to_string(),
            platform_tag: platform_tag.to_string(),
        })
    }

    /// Parse the filename component of a path.
    pub fn from_path(path: &Path) -> StubResult<Self> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StubError::malformed(path.display().to_string(), "not a file name"))?;
        Self::parse(filename)
    }

    /// The normalized distribution name (e.g. `nvidia-cuda-runtime-cu12`).
    pub fn canonical_name(&self) -> String {
        canonicalize_name(&self.distribution_name)
    }

    /// Prefix shared by the sdist archive and its top-level directory.
    pub fn sdist_base(&self) -> String {
        format!("{}-{}", self.canonical_name().replace('-', "_"), self.version)
    }

    /// Filename of the source distribution generated from this wheel.
    pub fn sdist_filename(&self) -> String {
        format!("{}.tar.gz", self.sdist_base())
    }

    /// Path of the core metadata file inside the wheel archive.
    pub fn metadata_path(&self) -> String {
        format!("{}-{}.dist-info/METADATA", self.distribution_name, self.version)
    }

    /// The pinned requirement resolving back to this exact wheel.
    pub fn requirement(&self) -> String {
        format!("{}=={}", self.distribution_name, self.version)
    }

    /// Expand the (possibly compressed) tag fields into individual tags.
    pub fn tags(&self) -> Vec<Tag> {
        Tag::expand(&self.python_tag, &self.abi_tag, &self.platform_tag)
    }
}

impl fmt::Display for WheelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.distribution_name, self.version)?;
        if let Some(ref build) = self.build_tag {
            write!(f, "-{}", build)?;
        }
        write!(
            f,
            "-{}-{}-{}.whl",
            self.python_tag, self.abi_tag, self.platform_tag
        )
    }
}

impl FromStr for WheelDescriptor {
    type Err = StubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
