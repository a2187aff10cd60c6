//! Reproducible `.tar.gz` writing for source distributions.
//!
//! Entries are normalized so the output depends only on their names,
//! contents and the chosen mtime: owner ids are zero, owner names are empty,
//! and modes are collapsed to 0o775 (directories), 0o755 (executables) or
//! 0o644 (everything else). The gzip header carries the same mtime and no
//! filename.

use std::io::{self, Write};

use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};
use tar::{Builder, EntryType, Header};

/// Archive timestamp used when `SOURCE_DATE_EPOCH` is not set (April 5, 1993).
pub const DEFAULT_SOURCE_DATE: u64 = 733_993_200;

/// A gzip-compressed tar archive with normalized entries.
pub struct TarGzWriter<W: Write> {
    builder: Builder<GzEncoder<W>>,
    mtime: u64,
}

impl<W: Write> TarGzWriter<W> {
    /// Start an archive; `mtime` is applied to the gzip header and every entry.
    pub fn new(writer: W, mtime: u64) -> Self {
        // The gzip header only has room for 32 bits of timestamp.
        let gz_mtime = u32::try_from(mtime).unwrap_or(u32::MAX);
        let encoder = GzBuilder::new()
            .mtime(gz_mtime)
            .write(writer, Compression::default());

        TarGzWriter {
            builder: Builder::new(encoder),
            mtime,
        }
    }

    /// Add a directory entry.
    pub fn append_dir(&mut self, path: &str) -> io::Result<()> {
        let mut header = self.header(EntryType::Directory, 0o775, 0)?;
        let path = format!("{}/", path.trim_end_matches('/'));
        self.builder.append_data(&mut header, path, io::empty())
    }

    /// Add a regular file entry.
    pub fn append_file(&mut self, path: &str, contents: &[u8], executable: bool) -> io::Result<()> {
        let mode = if executable { 0o755 } else { 0o644 };
        let mut header = self.header(EntryType::Regular, mode, contents.len() as u64)?;
        self.builder.append_data(&mut header, path, contents)
    }

    /// Write the tar trailer and gzip footer, returning the inner writer.
    pub fn finish(self) -> io::Result<W> {
        let encoder = self.builder.into_inner()?;
        encoder.finish()
    }

    fn header(&self, entry_type: EntryType, mode: u32, size: u64) -> io::Result<Header> {
        let mut header = Header::new_ustar();
        header.set_entry_type(entry_type);
        header.set_mode(mode);
        header.set_size(size);
        header.set_mtime(self.mtime);
        header.set_uid(0);
        header.set_gid(0);
        header.set_username("")?;
        header.set_groupname("")?;
        Ok(header)
    }
}
