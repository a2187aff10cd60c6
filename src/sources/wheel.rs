//! Wheel source - reads the core metadata embedded in a wheel archive.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::core::errors::{StubError, StubResult};
use crate::core::metadata::CoreMetadata;
use crate::core::wheel_name::{canonicalize_name, WheelDescriptor};

/// A wheel file whose name and metadata have been read and validated.
#[derive(Debug, Clone)]
pub struct WheelArtifact {
    /// Path the wheel was read from
    pub path: PathBuf,

    /// Fields parsed from the filename
    pub descriptor: WheelDescriptor,

    /// Parsed `*.dist-info/METADATA`
    pub metadata: CoreMetadata,
}

impl WheelArtifact {
    /// Open a wheel and read its metadata.
    ///
    /// The input file is never modified.
    pub fn open(path: &Path) -> StubResult<Self> {
        let descriptor = classify_artifact(path)?;
        let filename = descriptor.to_string();

        let file = File::open(path).map_err(|e| StubError::io(path, e))?;
        let mut archive = ZipArchive::new(file)
            .map_err(|e| StubError::malformed(&filename, format!("not a zip archive: {}", e)))?;

        let entry_name = find_metadata_entry(&archive, &descriptor).ok_or_else(|| {
            StubError::malformed(
                &filename,
                format!("archive has no `{}` entry", descriptor.metadata_path()),
            )
        })?;
        tracing::debug!("Reading {} from {}", entry_name, filename);

        let mut raw = Vec::new();
        archive
            .by_name(&entry_name)
            .map_err(|e| StubError::malformed(&filename, format!("cannot read `{}`: {}", entry_name, e)))?
            .read_to_end(&mut raw)
            .map_err(|e| StubError::io(path, e))?;

        let text = String::from_utf8(raw)
            .map_err(|_| StubError::malformed(&filename, "METADATA is not valid UTF-8"))?;

        let metadata = CoreMetadata::parse(&text)
            .map_err(|e| StubError::malformed(&filename, format!("invalid METADATA: {}", e)))?;

        if let Err(e) = metadata.validate() {
            tracing::debug!("Rejected METADATA:\n{}", text);
            return Err(StubError::malformed(
                &filename,
                format!("invalid METADATA: {}", e),
            ));
        }

        check_identity(&descriptor, &metadata)
            .map_err(|reason| StubError::malformed(&filename, reason))?;

        Ok(WheelArtifact {
            path: path.to_path_buf(),
            descriptor,
            metadata,
        })
    }
}

/// Parse a source artifact path, accepting only wheels.
///
/// Source distributions are recognized but cannot be turned into a stub.
pub fn classify_artifact(path: &Path) -> StubResult<WheelDescriptor> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    if filename.ends_with(".whl") {
        WheelDescriptor::from_path(path)
    } else if filename.ends_with(".tar.gz") {
        Err(StubError::UnsupportedArtifact {
            filename,
            reason: "source distributions cannot be used as the source of a stub".to_string(),
        })
    } else {
        Err(StubError::UnsupportedArtifact {
            filename,
            reason: "unknown package type".to_string(),
        })
    }
}

/// Locate the METADATA entry, tolerating dist-info directories whose name
/// differs from the filename only by normalization.
fn find_metadata_entry<R: Read + std::io::Seek>(
    archive: &ZipArchive<R>,
    descriptor: &WheelDescriptor,
) -> Option<String> {
    let names: Vec<&str> = archive.file_names().collect();

    let exact = descriptor.metadata_path();
    if names.contains(&exact.as_str()) {
        return Some(exact);
    }

    let canonical = descriptor.canonical_name();
    names
        .into_iter()
        .filter_map(|name| {
            let dir = name.strip_suffix(".dist-info/METADATA")?;
            if dir.contains('/') {
                return None;
            }
            let (dist, version) = dir.rsplit_once('-')?;
            (canonicalize_name(dist) == canonical && version == descriptor.version)
                .then(|| name.to_string())
        })
        .min()
}

fn check_identity(descriptor: &WheelDescriptor, metadata: &CoreMetadata) -> Result<(), String> {
    // validate() has already guaranteed both fields exist.
    let name = metadata.name().unwrap_or_default();
    let version = metadata.version().unwrap_or_default();

    if canonicalize_name(name) != descriptor.canonical_name() {
        return Err(format!(
            "METADATA name `{}` does not match filename name `{}`",
            name, descriptor.distribution_name
        ));
    }
    if version != descriptor.version {
        return Err(format!(
            "METADATA version `{}` does not match filename version `{}`",
            version, descriptor.version
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_metadata, write_wheel, write_wheel_entries};
    use tempfile::TempDir;

    #[test]
    fn test_open_reads_metadata() {
        let tmp = TempDir::new().unwrap();
        let path = write_wheel(
            tmp.path(),
            "foo-1.2.3-py3-none-any.whl",
            &sample_metadata("foo", "1.2.3"),
        );

        let wheel = WheelArtifact::open(&path).unwrap();
        assert_eq!(wheel.descriptor.distribution_name, "foo");
        assert_eq!(wheel.metadata.name(), Some("foo"));
        assert_eq!(wheel.metadata.version(), Some("1.2.3"));
    }

    #[test]
    fn test_open_does_not_modify_input() {
        let tmp = TempDir::new().unwrap();
        let path = write_wheel(
            tmp.path(),
            "foo-1.2.3-py3-none-any.whl",
            &sample_metadata("foo", "1.2.3"),
        );
        let before = std::fs::read(&path).unwrap();

        WheelArtifact::open(&path).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_open_normalized_dist_info() {
        let tmp = TempDir::new().unwrap();
        let path = write_wheel_entries(
            tmp.path(),
            "Foo_Bar-1.0-py3-none-any.whl",
            &[(
                "foo_bar-1.0.dist-info/METADATA",
                sample_metadata("Foo-Bar", "1.0").as_bytes(),
            )],
        );

        let wheel = WheelArtifact::open(&path).unwrap();
        assert_eq!(wheel.metadata.name(), Some("Foo-Bar"));
    }

    #[test]
    fn test_missing_metadata_entry() {
        let tmp = TempDir::new().unwrap();
        let path = write_wheel_entries(
            tmp.path(),
            "foo-1.0-py3-none-any.whl",
            &[("foo/__init__.py", &b""[..])],
        );

        let err = WheelArtifact::open(&path).unwrap_err();
        assert!(matches!(err, StubError::MalformedWheel { .. }));
        assert!(err.to_string().contains("foo-1.0.dist-info/METADATA"));
    }

    #[test]
    fn test_missing_license_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_wheel(
            tmp.path(),
            "foo-1.0-py3-none-any.whl",
            "Metadata-Version: 2.1\nName: foo\nVersion: 1.0\n",
        );

        let err = WheelArtifact::open(&path).unwrap_err();
        assert!(err.to_string().contains("License"));
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_wheel_entries(
            tmp.path(),
            "foo-1.0-py3-none-any.whl",
            &[(
                "foo-1.0.dist-info/METADATA",
                sample_metadata("foo", "2.0").as_bytes(),
            )],
        );

        let err = WheelArtifact::open(&path).unwrap_err();
        assert!(err.to_string().contains("does not match filename version"));
    }

    #[test]
    fn test_version_case_mismatch_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_wheel_entries(
            tmp.path(),
            "foo-1.0RC1-py3-none-any.whl",
            &[(
                "foo-1.0RC1.dist-info/METADATA",
                sample_metadata("foo", "1.0rc1").as_bytes(),
            )],
        );

        let err = WheelArtifact::open(&path).unwrap_err();
        assert!(matches!(err, StubError::MalformedWheel { .. }));
        assert!(err.to_string().contains("METADATA version `1.0rc1`"));
    }

    #[test]
    fn test_not_a_zip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("foo-1.0-py3-none-any.whl");
        std::fs::write(&path, b"definitely not a zip").unwrap();

        let err = WheelArtifact::open(&path).unwrap_err();
        assert!(matches!(err, StubError::MalformedWheel { .. }));
    }

    #[test]
    fn test_classify_artifact() {
        assert!(classify_artifact(Path::new("dist/foo-1.0-py3-none-any.whl")).is_ok());
        assert!(matches!(
            classify_artifact(Path::new("foo-1.0.tar.gz")),
            Err(StubError::UnsupportedArtifact { .. })
        ));
        assert!(matches!(
            classify_artifact(Path::new("foo-1.0.zip")),
            Err(StubError::UnsupportedArtifact { .. })
        ));
        assert!(matches!(
            classify_artifact(Path::new("this-wheel-invalid.whl")),
            Err(StubError::MalformedWheel { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = WheelArtifact::open(&tmp.path().join("foo-1.0-py3-none-any.whl")).unwrap_err();
        assert!(matches!(err, StubError::Io { .. }));
    }
}
