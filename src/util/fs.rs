//! Filesystem utilities.

use std::io;
use std::path::Path;

use tempfile::{Builder, NamedTempFile};

/// Mode of files handed back to the build frontend.
#[cfg(unix)]
const OUTPUT_MODE: u32 = 0o644;

/// Create a temp file in `dir` that is world-readable once persisted.
///
/// `NamedTempFile::new_in` creates files as 0600, which would leave the
/// published artifact unreadable by other users.
pub fn output_tempfile(dir: &Path) -> io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    builder.prefix(".wheel-stub");

    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(Permissions::from_mode(OUTPUT_MODE));
    }

    builder.tempfile_in(dir)
}
