//! Library extraction.
//!
//! Copies a variant's embedded bytes into a freshly created, uniquely named
//! file so the platform's dynamic loader can open it. The file name keeps the
//! variant's resource stem as a prefix and its library extension as a suffix
//! (some loaders refuse files without the expected extension).
//!
//! Extracted files are never deleted by this crate. A loaded library may
//! still be mapped from its file, so removal is left to the embedding
//! application.

use crate::catalog::Variant;
use crate::error::{NatriumError, Result};
use crate::resources::{EmbeddedResources, ResourceSource};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Size of the intermediate copy buffer
pub const COPY_BUFFER_SIZE: usize = 4096;

/// An extracted library file together with the variant it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLibrary {
    path: PathBuf,
    variant: &'static Variant,
    size: u64,
}

impl ExtractedLibrary {
    /// Location of the extracted file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Variant the file was extracted from
    #[must_use]
    pub fn variant(&self) -> &'static Variant {
        self.variant
    }

    /// Number of bytes written
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Extracts variants from a resource source into a target directory
pub struct Extractor<'a> {
    source: &'a dyn ResourceSource,
    target_dir: Option<PathBuf>,
}

impl<'a> Extractor<'a> {
    /// Extract from `source` into the OS temp directory
    pub fn new(source: &'a dyn ResourceSource) -> Self {
        Self {
            source,
            target_dir: None,
        }
    }

    /// Extract into `dir` instead of the OS temp directory
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.target_dir = Some(dir.into());
        self
    }

    /// Directory new files are created in
    #[must_use]
    pub fn target_dir(&self) -> PathBuf {
        self.target_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Copy `variant`'s bytes into a new uniquely named file.
    ///
    /// A partially written file is removed if the copy fails; a completed
    /// one is kept for the life of the process and beyond.
    ///
    /// # Errors
    ///
    /// Returns `NatriumError::ResourceNotFound` if the source has no bytes
    /// for the variant, `NatriumError::Io` on any read, write or file
    /// creation failure.
    pub fn extract(&self, variant: &'static Variant) -> Result<ExtractedLibrary> {
        let mut source = self
            .source
            .open(variant.resource_id)?
            .ok_or_else(|| NatriumError::ResourceNotFound(variant.resource_id.to_string()))?;

        let dir = self.target_dir();
        let prefix = format!("{}-", variant.resource_stem());
        let mut temp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(variant.file_suffix())
            .tempfile_in(&dir)?;

        let size = copy_stream(&mut source, temp.as_file_mut())?;
        temp.as_file().sync_all()?;
        drop(source);

        let (file, path) = temp.keep().map_err(|e| NatriumError::from(e.error))?;
        drop(file);

        tracing::info!(
            "Extracted {} ({} bytes) to {:?}",
            variant.resource_id,
            size,
            path
        );

        Ok(ExtractedLibrary {
            path,
            variant,
            size,
        })
    }
}

/// Extract `variant` from the embedded resources into the OS temp directory.
///
/// # Errors
///
/// See [`Extractor::extract`].
pub fn extract(variant: &'static Variant) -> Result<ExtractedLibrary> {
    Extractor::new(&EmbeddedResources).extract(variant)
}

/// Stream `reader` into `writer` through a fixed-size buffer until end-of-stream
fn copy_stream<R: Read + ?Sized, W: Write + ?Sized>(reader: &mut R, writer: &mut W) -> io::Result<u64> {
    let mut buf = [0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }

    writer.flush()?;
    Ok(total)
}
