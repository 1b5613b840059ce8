//! Embedded resource lookup.
//!
//! The extractor reads variant bytes through a [`ResourceSource`]. The
//! default source is [`EmbeddedResources`], populated at build time from the
//! crate's `native/` directory. [`DirectoryResources`] serves files from a
//! directory at runtime and [`MemoryResources`] serves in-memory buffers.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

mod embedded {
    include!(concat!(env!("OUT_DIR"), "/embedded_resources.rs"));
}

/// Readable stream over a resource's bytes
pub type ResourceStream<'a> = Box<dyn Read + Send + 'a>;

/// A provider of embedded library bytes
pub trait ResourceSource: Send + Sync {
    /// Open the resource named `resource_id`.
    ///
    /// Returns `Ok(None)` when the resource does not exist.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the resource exists but cannot be opened.
    fn open(&self, resource_id: &str) -> io::Result<Option<ResourceStream<'_>>>;
}

/// Resource identifiers may be written with a leading slash
fn normalize(resource_id: &str) -> &str {
    resource_id.trim_start_matches('/')
}

/// Libraries compiled into this crate by its build script
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedResources;

impl EmbeddedResources {
    /// Names of all embedded resources
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        embedded::EMBEDDED.iter().map(|(name, _)| *name).collect()
    }

    /// Raw bytes of an embedded resource
    #[must_use]
    pub fn get(&self, resource_id: &str) -> Option<&'static [u8]> {
        let id = normalize(resource_id);
        embedded::EMBEDDED
            .iter()
            .find(|(name, _)| *name == id)
            .map(|(_, bytes)| *bytes)
    }
}

impl ResourceSource for EmbeddedResources {
    fn open(&self, resource_id: &str) -> io::Result<Option<ResourceStream<'_>>> {
        Ok(self
            .get(resource_id)
            .map(|bytes| Box::new(bytes) as ResourceStream<'_>))
    }
}

/// Resources read from `<root>/<resource_id>` at runtime
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    /// Serve resources from `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory resources are served from
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceSource for DirectoryResources {
    fn open(&self, resource_id: &str) -> io::Result<Option<ResourceStream<'_>>> {
        let id = normalize(resource_id);
        if id.is_empty() || id.split(['/', '\\']).any(|part| part == "..") {
            return Ok(None);
        }

        match File::open(self.root.join(id)) {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Resources held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryResources {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryResources {
    /// Create an empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a resource
    pub fn insert(&mut self, resource_id: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(resource_id.into(), bytes.into());
    }

    /// Builder form of [`insert`](Self::insert)
    #[must_use]
    pub fn with(mut self, resource_id: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(resource_id, bytes);
        self
    }
}

impl ResourceSource for MemoryResources {
    fn open(&self, resource_id: &str) -> io::Result<Option<ResourceStream<'_>>> {
        Ok(self
            .entries
            .get(normalize(resource_id))
            .map(|bytes| Box::new(bytes.as_slice()) as ResourceStream<'_>))
    }
}
