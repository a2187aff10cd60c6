//! Test utilities and mocks for wheel-stub unit tests.
//!
//! Provides wheel and project fixtures written to temporary directories,
//! an archive reader for checking generated sdists, and mock
//! implementations of the HTTP client and environment probe so build_wheel
//! can be tested without network access or a Python interpreter.
//!
//! # Example
//!
//! ```rust,ignore
//! use wheel_stub::test_support::{MockHttpClient, MockHttpResponse, FixedProbe};
//!
//! #[test]
//! fn test_example() {
//!     let mut client = MockHttpClient::new();
//!     client.mock_url("https://example.org/simple/foo/", MockHttpResponse::ok("<html></html>"));
//!
//!     let probe = FixedProbe::cpython_linux();
//!     // Pass &client and &probe to build_wheel...
//! }
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use flate2::read::GzDecoder;
use url::Url;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::core::wheel_name::WheelDescriptor;
use crate::sources::index::HttpClient;
use crate::util::probe::{CudaInfo, EnvironmentProbe, InterpreterInfo};

/// Minimal valid core metadata for `name==version`.
pub fn sample_metadata(name: &str, version: &str) -> String {
    format!(
        "Metadata-Version: 2.1\n\
         Name: {}\n\
         Version: {}\n\
         Summary: A test package\n\
         License: Apache-2.0\n",
        name, version
    )
}

/// Write a wheel containing only `METADATA` at its canonical location.
pub fn write_wheel(dir: &Path, filename: &str, metadata: &str) -> PathBuf {
    let descriptor = WheelDescriptor::parse(filename).expect("fixture wheel name must be valid");
    write_wheel_entries(
        dir,
        filename,
        &[(descriptor.metadata_path().as_str(), metadata.as_bytes())],
    )
}

/// Write a zip archive named `filename` with the given entries.
pub fn write_wheel_entries(dir: &Path, filename: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(filename);
    let file = File::create(&path).expect("failed to create wheel");
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, contents) in entries {
        zip.start_file(*name, options).expect("failed to start zip entry");
        zip.write_all(contents).expect("failed to write zip entry");
    }
    zip.finish().expect("failed to finish wheel");
    path
}

/// A pyproject.toml with `[tool.wheel_stub]` holding `index_url` and `extra` lines.
pub fn pyproject(index_url: &str, extra: &str) -> String {
    format!(
        "[build-system]\n\
         requires = [\"wheel-stub\"]\n\
         build-backend = \"wheel_stub.buildapi\"\n\
         \n\
         [tool.wheel_stub]\n\
         index_url = \"{}\"\n\
         {}",
        index_url, extra
    )
}

/// Write `pyproject.toml` into `dir`.
pub fn write_pyproject(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("pyproject.toml");
    fs::write(&path, content).expect("failed to write pyproject.toml");
    path
}

/// A tar entry as read back from a generated archive.
#[derive(Debug, Clone)]
pub struct TarEntry {
    pub path: String,
    pub is_dir: bool,
    pub mode: u32,
    pub mtime: u64,
    pub uid: u64,
    pub gid: u64,
    pub username: String,
    pub contents: Vec<u8>,
}

/// Decode a `.tar.gz` into its entries, in archive order.
pub fn read_tar_gz(bytes: &[u8]) -> Vec<TarEntry> {
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    let mut result = Vec::new();

    for entry in archive.entries().expect("invalid tar stream") {
        let mut entry = entry.expect("invalid tar entry");
        let header = entry.header().clone();
        let path = String::from_utf8_lossy(&entry.path_bytes()).into_owned();

        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).expect("failed to read entry");

        result.push(TarEntry {
            path,
            is_dir: header.entry_type().is_dir(),
            mode: header.mode().expect("invalid mode"),
            mtime: header.mtime().expect("invalid mtime"),
            uid: header.uid().expect("invalid uid"),
            gid: header.gid().expect("invalid gid"),
            username: header
                .username()
                .ok()
                .flatten()
                .unwrap_or_default()
                .to_string(),
            contents,
        });
    }

    result
}

/// Mock HTTP response for testing downloads.
#[derive(Debug, Clone)]
pub struct MockHttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl MockHttpResponse {
    /// Create a successful response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        MockHttpResponse {
            status: 200,
            body: body.into(),
        }
    }

    /// Create a not found response.
    pub fn not_found() -> Self {
        MockHttpResponse {
            status: 404,
            body: b"Not Found".to_vec(),
        }
    }

    /// Check if this is a successful response.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Mock HTTP client for index pages and wheel downloads.
///
/// Unmatched URLs fail like a transport error would.
#[derive(Debug, Default)]
pub struct MockHttpClient {
    responses: HashMap<String, MockHttpResponse>,
    requests: RefCell<Vec<String>>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        MockHttpClient::default()
    }

    /// Add a response for a URL.
    pub fn mock_url(&mut self, url: &str, response: MockHttpResponse) -> &mut Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    /// Get all requested URLs.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl HttpClient for MockHttpClient {
    fn get(&self, url: &Url) -> Result<Box<dyn Read>> {
        self.requests.borrow_mut().push(url.to_string());

        let Some(response) = self.responses.get(url.as_str()) else {
            bail!("no mock response for URL: {}", url);
        };
        if !response.is_success() {
            bail!("HTTP {} from {}", response.status, url);
        }
        Ok(Box::new(std::io::Cursor::new(response.body.clone())))
    }
}

/// Environment probe returning fixed answers.
#[derive(Debug, Clone, Default)]
pub struct FixedProbe {
    pub interpreter: Option<InterpreterInfo>,
    pub cuda: Option<CudaInfo>,
}

impl FixedProbe {
    /// Neither an interpreter nor a CUDA driver can be found.
    pub fn none() -> Self {
        FixedProbe::default()
    }

    /// CPython 3.11 on glibc 2.28 x86_64 Linux.
    pub fn cpython_linux() -> Self {
        FixedProbe {
            interpreter: Some(InterpreterInfo {
                implementation: "cpython".to_string(),
                version: (3, 11, 4),
                platform: "linux-x86_64".to_string(),
                libc: "glibc".to_string(),
                libc_version: "2.28".to_string(),
                mac_ver: String::new(),
                system: "Linux".to_string(),
                release: "6.1.0".to_string(),
                machine: "x86_64".to_string(),
            }),
            cuda: None,
        }
    }

    pub fn with_cuda(mut self, driver: &str, cuda: &str) -> Self {
        self.cuda = Some(CudaInfo {
            driver_version: Some(driver.to_string()),
            cuda_version: Some(cuda.to_string()),
        });
        self
    }
}

impl EnvironmentProbe for FixedProbe {
    fn interpreter(&self) -> Option<InterpreterInfo> {
        self.interpreter.clone()
    }

    fn cuda(&self) -> Option<CudaInfo> {
        self.cuda.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mock_http_client() {
        let mut client = MockHttpClient::new();
        client.mock_url("https://example.org/a", MockHttpResponse::ok("body"));
        client.mock_url("https://example.org/b", MockHttpResponse::not_found());

        let mut body = String::new();
        client
            .get(&Url::parse("https://example.org/a").unwrap())
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, "body");

        assert!(client.get(&Url::parse("https://example.org/b").unwrap()).is_err());
        assert!(client.get(&Url::parse("https://example.org/c").unwrap()).is_err());
        assert_eq!(client.requests().len(), 3);
    }

    #[test]
    fn test_write_wheel_fixture() {
        let tmp = TempDir::new().unwrap();
        let path = write_wheel(tmp.path(), "foo-1.0-py3-none-any.whl", "Name: foo\n");

        let mut archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let mut metadata = String::new();
        archive
            .by_name("foo-1.0.dist-info/METADATA")
            .unwrap()
            .read_to_string(&mut metadata)
            .unwrap();
        assert_eq!(metadata, "Name: foo\n");
    }
}
