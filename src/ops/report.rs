//! Remediation reports for blocked or failed installs.
//!
//! When a stub cannot (or must not) fetch the real wheel, the user gets a
//! fixed block of instructions naming the index to install from, followed by
//! whatever the environment probes could find out about the machine.

use std::fmt::Write;

use url::Url;

use crate::util::config::StubConfig;
use crate::util::probe::{EnvironmentProbe, InterpreterInfo};

const RULE: &str =
    "###########################################################################################";

/// Instructions shown whenever a stub does not install the real package.
pub const REMEDIATION_TEMPLATE: &str = "\
The installation of {distribution}=={version} failed.

This is a special placeholder package which downloads a real wheel package
from {index_url}. If {index_url} is not reachable, we
cannot download the real wheel file to install.

You might try installing this package via
```
$ pip install --extra-index-url {index_url} {distribution}=={version}
```

Here is some debug information about your platform to include in any bug
report:
";

const CUDA_UNAVAILABLE: &str =
    "nvidia-smi command not found or failed. Ensure NVIDIA drivers are installed.";

/// Everything rendered into a remediation report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub distribution: String,
    pub version: String,
    pub index_url: Url,
    /// e.g. `CPython 3.11.4`
    pub python_info: String,
    /// e.g. `Linux 6.1.0`
    pub os_info: String,
    pub cpu_arch: String,
    /// Present only when `include_cuda_debuginfo` is set
    pub cuda_info: Option<String>,
}

impl InstallReport {
    /// Gather platform details for a report.
    ///
    /// `interpreter` is passed in when the caller already probed it. Missing
    /// probe results only reduce detail.
    pub fn collect(
        distribution: &str,
        version: &str,
        config: &StubConfig,
        interpreter: Option<&InterpreterInfo>,
        probe: &dyn EnvironmentProbe,
    ) -> Self {
        let python_info = interpreter
            .map(InterpreterInfo::display_name)
            .unwrap_or_else(|| "unknown (no Python interpreter found)".to_string());

        let os_info = interpreter
            .filter(|i| !i.system.is_empty())
            .map(|i| format!("{} {}", i.system, i.release).trim_end().to_string())
            .unwrap_or_else(|| std::env::consts::OS.to_string());

        let cpu_arch = interpreter
            .map(|i| i.machine.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| std::env::consts::ARCH.to_string());

        let cuda_info = config.include_cuda_debuginfo.then(|| {
            probe
                .cuda()
                .map(|cuda| cuda.to_string().trim_end().to_string())
                .unwrap_or_else(|| CUDA_UNAVAILABLE.to_string())
        });

        InstallReport {
            distribution: distribution.to_string(),
            version: version.to_string(),
            index_url: config.index_url.clone(),
            python_info,
            os_info,
            cpu_arch,
            cuda_info,
        }
    }

    /// Render the report text.
    pub fn render(&self) -> String {
        let body = REMEDIATION_TEMPLATE
            .replace("{distribution}", &self.distribution)
            .replace("{version}", &self.version)
            .replace("{index_url}", self.index_url.as_str());

        let mut output = String::new();
        writeln!(output, "{}", RULE).unwrap();
        writeln!(output, "{}", body).unwrap();
        writeln!(output, "Python Version: {}", self.python_info).unwrap();
        writeln!(output, "Operating System: {}", self.os_info).unwrap();
        writeln!(output, "CPU Architecture: {}", self.cpu_arch).unwrap();
        if let Some(cuda) = &self.cuda_info {
            writeln!(output, "{}", cuda).unwrap();
        }
        write!(output, "{}", RULE).unwrap();
        output
    }
}
