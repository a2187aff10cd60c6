//! Environment probes: the target interpreter, its platform tags, and the
//! CUDA driver.
//!
//! Every probe is best-effort. A missing interpreter or `nvidia-smi` yields
//! `None` and a debug log line, never an error.

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::core::tags::TargetEnvironment;
use crate::util::process::{find_executable, find_python, ProcessBuilder};

/// Printed by the interpreter as a single JSON object.
const INTERPRETER_SCRIPT: &str = r#"
import json, platform, sys, sysconfig
libc, libc_version = platform.libc_ver()
print(json.dumps({
    "implementation": sys.implementation.name,
    "version": list(sys.version_info[:3]),
    "platform": sysconfig.get_platform(),
    "libc": libc,
    "libc_version": libc_version,
    "mac_ver": platform.mac_ver()[0],
    "system": platform.system(),
    "release": platform.release(),
    "machine": platform.machine(),
}))
"#;

static DRIVER_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Driver Version: (\d+\.\d+)").unwrap());

static CUDA_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CUDA Version: (\d+\.\d+)").unwrap());

/// Facts about the Python interpreter a wheel will be installed into.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InterpreterInfo {
    /// `sys.implementation.name`, e.g. `cpython`
    pub implementation: String,
    /// `(major, minor, micro)`
    pub version: (u32, u32, u32),
    /// `sysconfig.get_platform()`, e.g. `linux-x86_64`
    pub platform: String,
    #[serde(default)]
    pub libc: String,
    #[serde(default)]
    pub libc_version: String,
    #[serde(default)]
    pub mac_ver: String,
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub machine: String,
}

impl InterpreterInfo {
    /// Parse the JSON printed by the probe script.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json.trim())
    }

    /// Interpreter tag such as `cp311` or `pp310`.
    pub fn interpreter_tag(&self) -> String {
        let short = match self.implementation.as_str() {
            "cpython" => "cp",
            "pypy" => "pp",
            "ironpython" => "ip",
            "jython" => "jy",
            other => other,
        };
        format!("{}{}{}", short, self.version.0, self.version.1)
    }

    /// glibc `(major, minor)`, if the interpreter is linked against glibc.
    pub fn glibc_version(&self) -> Option<(u32, u32)> {
        if self.libc != "glibc" {
            return None;
        }
        let mut parts = self.libc_version.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        Some((major, minor))
    }

    /// Human-readable name and version, e.g. `CPython 3.11.4`.
    pub fn display_name(&self) -> String {
        let name = match self.implementation.as_str() {
            "cpython" => "CPython",
            "pypy" => "PyPy",
            "ironpython" => "IronPython",
            "jython" => "Jython",
            other => other,
        };
        format!(
            "{} {}.{}.{}",
            name, self.version.0, self.version.1, self.version.2
        )
    }

    /// Platform tags supported by this interpreter, most specific first.
    pub fn platform_tags(&self) -> Vec<String> {
        platform_tags(&self.platform, self.glibc_version(), &self.mac_ver)
    }

    /// The environment used to check wheel tag compatibility.
    pub fn target_environment(&self) -> TargetEnvironment {
        TargetEnvironment::new(
            self.interpreter_tag(),
            (self.version.0, self.version.1),
            self.platform_tags(),
        )
    }
}

/// Compute supported platform tags from a `sysconfig` platform string.
///
/// `any` is always the last entry.
pub fn platform_tags(platform: &str, glibc: Option<(u32, u32)>, mac_ver: &str) -> Vec<String> {
    let mut tags = if let Some(arch) = platform.strip_prefix("linux-") {
        linux_tags(&normalize(arch), glibc)
    } else if let Some(rest) = platform.strip_prefix("macosx-") {
        let arch = rest.rsplit('-').next().unwrap_or(rest);
        mac_tags(parse_mac_version(mac_ver), arch)
    } else {
        vec![normalize(platform)]
    };

    tags.push("any".to_string());
    tags
}

fn normalize(s: &str) -> String {
    s.replace(['-', '.', ' '], "_")
}

fn linux_tags(arch: &str, glibc: Option<(u32, u32)>) -> Vec<String> {
    let mut tags = Vec::new();

    if let Some((2, current)) = glibc {
        let floor = if matches!(arch, "x86_64" | "i686") { 5 } else { 17 };
        for minor in (floor..=current).rev() {
            tags.push(format!("manylinux_2_{}_{}", minor, arch));
            if let Some(legacy) = legacy_manylinux(minor, arch) {
                tags.push(format!("{}_{}", legacy, arch));
            }
        }
    }

    tags.push(format!("linux_{}", arch));
    tags
}

fn legacy_manylinux(glibc_minor: u32, arch: &str) -> Option<&'static str> {
    match glibc_minor {
        17 if matches!(
            arch,
            "x86_64" | "i686" | "aarch64" | "armv7l" | "ppc64" | "ppc64le" | "s390x"
        ) =>
        {
            Some("manylinux2014")
        }
        12 if matches!(arch, "x86_64" | "i686") => Some("manylinux2010"),
        5 if matches!(arch, "x86_64" | "i686") => Some("manylinux1"),
        _ => None,
    }
}

fn parse_mac_version(mac_ver: &str) -> Option<(u32, u32)> {
    let mut parts = mac_ver.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().and_then(|m| m.parse().ok()).unwrap_or(0);
    Some((major, minor))
}

fn mac_binary_formats(arch: &str) -> Vec<&str> {
    match arch {
        "arm64" => vec!["arm64", "universal2"],
        "x86_64" => vec!["x86_64", "intel", "universal2"],
        other => vec![other],
    }
}

fn mac_tags(version: Option<(u32, u32)>, arch: &str) -> Vec<String> {
    let Some((major, minor)) = version else {
        return vec![format!("macosx_{}", normalize(arch))];
    };
    let formats = mac_binary_formats(arch);
    let mut tags = Vec::new();

    if major >= 11 {
        for major in (11..=major).rev() {
            for format in &formats {
                tags.push(format!("macosx_{}_0_{}", major, format));
            }
        }
    }

    // Apple silicon never ran 10.x releases.
    if arch != "arm64" {
        let newest_minor = if major == 10 { minor } else { 16 };
        for minor in (4..=newest_minor).rev() {
            for format in &formats {
                tags.push(format!("macosx_10_{}_{}", minor, format));
            }
        }
    }

    tags
}

/// Driver and runtime versions reported by `nvidia-smi`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CudaInfo {
    pub driver_version: Option<String>,
    pub cuda_version: Option<String>,
}

impl CudaInfo {
    /// Extract versions from `nvidia-smi` output. `None` if neither is present.
    pub fn parse_nvidia_smi(output: &str) -> Option<Self> {
        let capture = |re: &Regex| re.captures(output).map(|c| c[1].to_string());
        let info = CudaInfo {
            driver_version: capture(&DRIVER_VERSION_RE),
            cuda_version: capture(&CUDA_VERSION_RE),
        };

        if info.driver_version.is_none() && info.cuda_version.is_none() {
            return None;
        }
        Some(info)
    }
}

impl fmt::Display for CudaInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.driver_version {
            Some(v) => writeln!(f, "Driver Version: {}", v)?,
            None => writeln!(f, "Driver version not found in nvidia-smi output.")?,
        }
        match &self.cuda_version {
            Some(v) => writeln!(f, "CUDA Version: {}", v),
            None => writeln!(f, "CUDA version not found in nvidia-smi output."),
        }
    }
}

/// Source of environment facts for build_wheel.
pub trait EnvironmentProbe {
    /// The target interpreter, if one can be found and run.
    fn interpreter(&self) -> Option<InterpreterInfo>;

    /// CUDA driver information, if `nvidia-smi` is available.
    fn cuda(&self) -> Option<CudaInfo>;
}

/// Probes the real machine by running subprocesses.
#[derive(Debug, Clone, Default)]
pub struct SystemProbe {
    /// Interpreter to probe instead of `python3`/`python` on PATH
    pub python: Option<String>,
}

impl SystemProbe {
    pub fn new(python: Option<String>) -> Self {
        SystemProbe { python }
    }

    fn python_path(&self) -> Option<PathBuf> {
        find_python(self.python.as_deref())
    }
}

impl EnvironmentProbe for SystemProbe {
    fn interpreter(&self) -> Option<InterpreterInfo> {
        let Some(python) = self.python_path() else {
            tracing::debug!("No Python interpreter found on PATH");
            return None;
        };

        let stdout = match ProcessBuilder::new(&python)
            .args(["-c", INTERPRETER_SCRIPT])
            .exec_stdout()
        {
            Ok(stdout) => stdout,
            Err(e) => {
                tracing::debug!("Interpreter probe failed: {:#}", e);
                return None;
            }
        };

        match InterpreterInfo::from_json(&stdout) {
            Ok(info) => {
                tracing::debug!(
                    "Probed {} at {} ({})",
                    info.display_name(),
                    python.display(),
                    info.platform
                );
                Some(info)
            }
            Err(e) => {
                tracing::debug!("Unexpected interpreter probe output: {}", e);
                None
            }
        }
    }

    fn cuda(&self) -> Option<CudaInfo> {
        let Some(nvidia_smi) = find_executable("nvidia-smi") else {
            tracing::debug!("nvidia-smi not found. Ensure NVIDIA drivers are installed.");
            return None;
        };

        match ProcessBuilder::new(nvidia_smi).exec_stdout() {
            Ok(stdout) => CudaInfo::parse_nvidia_smi(&stdout),
            Err(e) => {
                tracing::debug!("Error in running nvidia-smi: {:#}", e);
                None
            }
        }
    }
}
