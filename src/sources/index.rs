//! PEP 503 simple index source.
//!
//! Fetches a project page, picks the first wheel that matches the requested
//! version and the target environment, and downloads it with optional hash
//! verification.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use regex::Regex;
use reqwest::blocking::Client;
use url::Url;

use crate::core::errors::{StubError, StubResult};
use crate::core::tags::TargetEnvironment;
use crate::core::wheel_name::{canonicalize_name, WheelDescriptor};
use crate::util::fs::output_tempfile;
use crate::util::hash::{HashAlgorithm, HashingWriter};

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum attempts for transport failures
const MAX_ATTEMPTS: i32 = 4;

/// Base of the exponential backoff, in seconds
const BACKOFF_BASE: f64 = 1.2;

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s(?:[^>]*?\s)?href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap()
});

/// Minimal blocking HTTP interface used by the index source.
pub trait HttpClient {
    /// GET `url` and return the response body. Non-success statuses are errors.
    fn get(&self, url: &Url) -> Result<Box<dyn Read>>;
}

/// `reqwest` client with retry on transport errors.
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("wheel-stub/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to create HTTP client")?;
        Ok(ReqwestClient { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &Url) -> Result<Box<dyn Read>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url.clone()).send() {
                Ok(response) => {
                    // Statuses are answers, not transport failures; never retried.
                    if !response.status().is_success() {
                        bail!("HTTP {} from {}", response.status(), url);
                    }
                    return Ok(Box::new(response));
                }
                Err(e) => {
                    if attempt >= MAX_ATTEMPTS {
                        bail!("failed to fetch {} after {} attempts: {}", url, attempt, e);
                    }
                    let delay = Duration::from_secs_f64(BACKOFF_BASE.powi(attempt));
                    tracing::warn!(
                        "Request to {} failed (attempt {}/{}), retrying in {:.1}s: {}",
                        url,
                        attempt,
                        MAX_ATTEMPTS,
                        delay.as_secs_f64(),
                        e
                    );
                    thread::sleep(delay);
                }
            }
        }
    }
}

/// Expected digest taken from a link fragment such as `#sha256=abcd`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkHash {
    pub algorithm: String,
    pub digest: String,
}

/// A wheel listed on a project page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelLink {
    /// Absolute download URL, without fragment
    pub url: Url,
    pub filename: String,
    pub hash: Option<LinkHash>,
}

/// URL of a project's page on a simple index.
pub fn project_url(index_url: &Url, distribution: &str) -> StubResult<Url> {
    let path = format!("{}/", canonicalize_name(distribution));
    index_url
        .join(&path)
        .map_err(|e| StubError::index(format!("cannot build project URL for `{}`: {}", distribution, e)))
}

/// Collect the wheel links on a PEP 503 project page.
///
/// Relative links are resolved against `page_url`; anything whose path does
/// not end in `.whl` is ignored.
pub fn parse_project_page(html: &str, page_url: &Url) -> Vec<WheelLink> {
    let mut links = Vec::new();

    for caps in ANCHOR_RE.captures_iter(html) {
        let Some(raw) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) else {
            continue;
        };
        let href = decode_entities(raw.as_str());

        let mut url = match page_url.join(&href) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Skipping unparseable link `{}`: {}", href, e);
                continue;
            }
        };
        if !url.path().ends_with(".whl") {
            continue;
        }

        let hash = url.fragment().and_then(parse_hash_fragment);
        url.set_fragment(None);

        // Indexes escape the `+` of local versions as `%2B`.
        let Some(filename) = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .and_then(|segment| urlencoding::decode(segment).ok())
            .map(|decoded| decoded.into_owned())
        else {
            continue;
        };

        tracing::debug!("Found wheel: {}", filename);
        links.push(WheelLink { url, filename, hash });
    }

    links
}

fn parse_hash_fragment(fragment: &str) -> Option<LinkHash> {
    if !(fragment.starts_with("sha") || fragment.starts_with("md5")) {
        return None;
    }
    let (algorithm, digest) = fragment.split_once('=')?;
    Some(LinkHash {
        algorithm: algorithm.to_string(),
        digest: digest.to_ascii_lowercase(),
    })
}

fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Pick the first link whose version matches and which has a compatible tag.
pub fn select_compatible_wheel<'a>(
    links: &'a [WheelLink],
    version: &str,
    env: &TargetEnvironment,
) -> Option<&'a WheelLink> {
    links.iter().find(|link| {
        let descriptor = match WheelDescriptor::parse(&link.filename) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                tracing::debug!("Skipping {}: {}", link.filename, e);
                return false;
            }
        };
        if descriptor.version != version {
            return false;
        }
        // Compressed tag sets, e.g. manylinux2014_x86_64.manylinux_2_28_x86_64
        env.accepts_any(&descriptor.tags())
    })
}

/// Fetches wheels from one simple index.
pub struct IndexFetcher<'a> {
    client: &'a dyn HttpClient,
    index_url: Url,
}

impl<'a> IndexFetcher<'a> {
    pub fn new(client: &'a dyn HttpClient, index_url: Url) -> Self {
        IndexFetcher { client, index_url }
    }

    /// All wheel links on the project page for `distribution`.
    pub fn wheel_links(&self, distribution: &str) -> StubResult<Vec<WheelLink>> {
        let url = project_url(&self.index_url, distribution)?;
        tracing::debug!("Querying project url: {}", url);

        let mut body = self
            .client
            .get(&url)
            .map_err(|e| StubError::index(format!("failed to open project URL {}: {:#}", url, e)))?;

        let mut html = String::new();
        body.read_to_string(&mut html)
            .map_err(|e| StubError::index(format!("failed to read project page {}: {}", url, e)))?;

        Ok(parse_project_page(&html, &url))
    }

    /// Find the wheel to install for `distribution==version`.
    pub fn find_wheel(
        &self,
        distribution: &str,
        version: &str,
        env: &TargetEnvironment,
    ) -> StubResult<WheelLink> {
        let links = self.wheel_links(distribution)?;
        select_compatible_wheel(&links, version, env)
            .cloned()
            .ok_or_else(|| {
                StubError::index(format!(
                    "didn't find a compatible wheel for {} {} ({} wheels listed)",
                    distribution,
                    version,
                    links.len()
                ))
            })
    }

    /// Download `link` into `dest_dir`, verifying its hash when the index gave one.
    ///
    /// Nothing is left in `dest_dir` unless the download completes and verifies.
    pub fn download(&self, link: &WheelLink, dest_dir: &Path) -> StubResult<PathBuf> {
        let algorithm = link
            .hash
            .as_ref()
            .map(|h| {
                h.algorithm
                    .parse::<HashAlgorithm>()
                    .map_err(|e| StubError::index(format!("{} for {}", e, link.filename)))
            })
            .transpose()?;

        tracing::info!("Downloading wheel {}", link.filename);
        let mut body = self
            .client
            .get(&link.url)
            .map_err(|e| StubError::index(format!("failed to open wheel URL {}: {:#}", link.url, e)))?;

        let tmp = output_tempfile(dest_dir).map_err(|e| StubError::io(dest_dir, e))?;
        let mut writer = HashingWriter::new(tmp, algorithm);
        io::copy(&mut body, &mut writer)
            .map_err(|e| StubError::index(format!("failed to download {}: {}", link.url, e)))?;
        let (tmp, actual) = writer.finish();

        if let (Some(expected), Some(actual)) = (&link.hash, actual) {
            if expected.digest != actual {
                return Err(StubError::HashMismatch {
                    filename: link.filename.clone(),
                    algorithm: expected.algorithm.clone(),
                    expected: expected.digest.clone(),
                    actual,
                });
            }
            tracing::debug!("Verified {} {}", expected.algorithm, link.filename);
        }

        let dest = dest_dir.join(&link.filename);
        tmp.persist(&dest).map_err(|e| StubError::io(&dest, e.error))?;
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use crate::test_support::{MockHttpClient, MockHttpResponse};
    use crate::util::hash::sha256_bytes;
    use tempfile::TempDir;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
  <body>
    <a href="/packages/foo-1.0-py3-none-any.whl#sha256=AABB">foo-1.0-py3-none-any.whl</a><br>
    <a href='foo-1.1-cp311-cp311-manylinux_2_17_x86_64.manylinux2014_x86_64.whl'>foo-1.1</a><br>
    <a href="https://files.example.org/foo-1.1.tar.gz#sha256=ccdd">foo-1.1.tar.gz</a><br>
    <a data-requires-python="&gt;=3.8" href="https://files.example.org/foo-1.1-py3-none-any.whl?x=1&amp;y=2#md5=eeff">foo</a>
  </body>
</html>"#;

    fn page_url() -> Url {
        Url::parse("https://example.org/simple/foo/").unwrap()
    }

    fn cp311_linux() -> TargetEnvironment {
        TargetEnvironment::new(
            "cp311",
            (3, 11),
            vec!["manylinux2014_x86_64".to_string(), "linux_x86_64".to_string()],
        )
    }

    fn link(filename: &str) -> WheelLink {
        WheelLink {
            url: page_url().join(filename).unwrap(),
            filename: filename.to_string(),
            hash: None,
        }
    }

    #[test]
    fn test_parse_project_page() {
        let links = parse_project_page(PAGE, &page_url());
        assert_eq!(links.len(), 3);

        assert_eq!(
            links[0].url.as_str(),
            "https://example.org/packages/foo-1.0-py3-none-any.whl"
        );
        assert_eq!(
            links[0].hash,
            Some(LinkHash {
                algorithm: "sha256".to_string(),
                digest: "aabb".to_string()
            })
        );

        assert_eq!(
            links[1].url.as_str(),
            "https://example.org/simple/foo/foo-1.1-cp311-cp311-manylinux_2_17_x86_64.manylinux2014_x86_64.whl"
        );
        assert_eq!(links[1].hash, None);

        assert_eq!(links[2].filename, "foo-1.1-py3-none-any.whl");
        assert_eq!(
            links[2].url.as_str(),
            "https://files.example.org/foo-1.1-py3-none-any.whl?x=1&y=2"
        );
        assert_eq!(links[2].hash.as_ref().unwrap().algorithm, "md5");
    }

    #[test]
    fn test_parse_decodes_local_version_filename() {
        let html = r#"<a href="/whl/torch-2.1.0%2Bcu121-cp311-cp311-linux_x86_64.whl#sha256=00ff">torch</a>"#;
        let links = parse_project_page(html, &Url::parse("https://example.org/simple/torch/").unwrap());

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].filename, "torch-2.1.0+cu121-cp311-cp311-linux_x86_64.whl");
        assert_eq!(
            links[0].url.as_str(),
            "https://example.org/whl/torch-2.1.0%2Bcu121-cp311-cp311-linux_x86_64.whl"
        );

        let chosen = select_compatible_wheel(&links, "2.1.0+cu121", &cp311_linux()).unwrap();
        assert_eq!(chosen.filename, links[0].filename);
    }

    #[test]
    fn test_parse_ignores_prefixed_href_attributes() {
        let html = r#"<a data-href="/decoy-1.0-py3-none-any.whl" href="/foo-1.0-py3-none-any.whl">foo</a>
<a data-href="/only-1.0-py3-none-any.whl">no link</a>"#;
        let links = parse_project_page(html, &page_url());

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].filename, "foo-1.0-py3-none-any.whl");
    }

    #[test]
    fn test_project_url_is_canonical() {
        let index = Url::parse("https://example.org/simple/").unwrap();
        assert_eq!(
            project_url(&index, "Foo_Bar").unwrap().as_str(),
            "https://example.org/simple/foo-bar/"
        );
    }

    #[test]
    fn test_select_skips_wrong_version_and_tags() {
        let links = vec![
            link("foo-1.0-cp311-cp311-manylinux2014_x86_64.whl"),
            link("foo-1.1-cp310-cp310-manylinux2014_x86_64.whl"),
            link("foo-1.1-cp311-cp311-win_amd64.whl"),
            link("not a wheel.whl"),
            link("foo-1.1-cp38-abi3-manylinux2014_x86_64.whl"),
            link("foo-1.1-py3-none-any.whl"),
        ];

        let chosen = select_compatible_wheel(&links, "1.1", &cp311_linux()).unwrap();
        assert_eq!(chosen.filename, "foo-1.1-cp38-abi3-manylinux2014_x86_64.whl");

        assert!(select_compatible_wheel(&links, "2.0", &cp311_linux()).is_none());
    }

    #[test]
    fn test_find_wheel_not_found() {
        let mut client = MockHttpClient::new();
        client.mock_url(
            "https://example.org/simple/foo/",
            MockHttpResponse::ok(PAGE),
        );
        let fetcher = IndexFetcher::new(&client, Url::parse("https://example.org/simple/").unwrap());

        let err = fetcher.find_wheel("foo", "9.9", &cp311_linux()).unwrap_err();
        assert!(matches!(err, StubError::Index { .. }));
        assert!(err.to_string().contains("foo 9.9"));
    }

    #[test]
    fn test_project_page_http_error() {
        let mut client = MockHttpClient::new();
        client.mock_url("https://example.org/simple/foo/", MockHttpResponse::not_found());
        let fetcher = IndexFetcher::new(&client, Url::parse("https://example.org/simple/").unwrap());

        let err = fetcher.wheel_links("foo").unwrap_err();
        assert!(err.to_string().contains("HTTP 404"));
        assert_eq!(client.requests(), vec!["https://example.org/simple/foo/"]);
    }

    #[test]
    fn test_download_verifies_hash() {
        let tmp = TempDir::new().unwrap();
        let body = b"wheel bytes".to_vec();
        let mut client = MockHttpClient::new();
        client.mock_url(
            "https://example.org/foo-1.0-py3-none-any.whl",
            MockHttpResponse::ok(body.clone()),
        );
        let fetcher = IndexFetcher::new(&client, Url::parse("https://example.org/simple/").unwrap());

        let good = WheelLink {
            url: Url::parse("https://example.org/foo-1.0-py3-none-any.whl").unwrap(),
            filename: "foo-1.0-py3-none-any.whl".to_string(),
            hash: Some(LinkHash {
                algorithm: "sha256".to_string(),
                digest: sha256_bytes(&body),
            }),
        };
        let path = fetcher.download(&good, tmp.path()).unwrap();
        assert_eq!(fs::read(&path).unwrap(), body);
    }

    #[test]
    #[cfg(unix)]
    fn test_downloaded_wheel_is_readable_by_others() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let mut client = MockHttpClient::new();
        client.mock_url(
            "https://example.org/foo-1.0-py3-none-any.whl",
            MockHttpResponse::ok("wheel bytes"),
        );
        let fetcher = IndexFetcher::new(&client, Url::parse("https://example.org/simple/").unwrap());

        let path = fetcher.download(&link("foo-1.0-py3-none-any.whl"), tmp.path()).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o044, 0o044, "wheel mode is {:o}", mode & 0o777);
    }

    #[test]
    fn test_download_hash_mismatch_leaves_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut client = MockHttpClient::new();
        client.mock_url(
            "https://example.org/foo-1.0-py3-none-any.whl",
            MockHttpResponse::ok("tampered"),
        );
        let fetcher = IndexFetcher::new(&client, Url::parse("https://example.org/simple/").unwrap());

        let bad = WheelLink {
            url: Url::parse("https://example.org/foo-1.0-py3-none-any.whl").unwrap(),
            filename: "foo-1.0-py3-none-any.whl".to_string(),
            hash: Some(LinkHash {
                algorithm: "sha256".to_string(),
                digest: "00".repeat(32),
            }),
        };
        let err = fetcher.download(&bad, tmp.path()).unwrap_err();
        assert!(matches!(err, StubError::HashMismatch { .. }));
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_download_unsupported_algorithm() {
        let tmp = TempDir::new().unwrap();
        let client = MockHttpClient::new();
        let fetcher = IndexFetcher::new(&client, Url::parse("https://example.org/simple/").unwrap());

        let link = WheelLink {
            url: Url::parse("https://example.org/foo-1.0-py3-none-any.whl").unwrap(),
            filename: "foo-1.0-py3-none-any.whl".to_string(),
            hash: Some(LinkHash {
                algorithm: "sha3_256".to_string(),
                digest: "00".to_string(),
            }),
        };
        let err = fetcher.download(&link, tmp.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported hash algorithm"));
        assert!(client.requests().is_empty());
    }
}
