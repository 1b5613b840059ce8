//! Host platform detection.
//!
//! Maps the raw OS and CPU architecture identifiers of the running process
//! onto the closed [`Os`] and [`Arch`] enumerations used by the catalog.
//! Detection never guesses: an identifier that matches no rule yields `None`
//! and the resolver turns that into [`NatriumError::UnsupportedPlatform`].

use crate::error::{NatriumError, Result};
use std::fmt;

/// Operating systems the catalog ships binaries for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Os {
    /// Linux (glibc)
    Linux,
    /// macOS
    Mac,
    /// Windows
    Windows,
}

/// CPU architectures the catalog ships binaries for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arch {
    /// 32-bit x86
    X32,
    /// 64-bit x86
    X64,
}

impl Os {
    /// Match a raw OS identifier against the rule table.
    ///
    /// Case-insensitive. `linux` matches Linux, `mac os x` or anything
    /// containing `mac` matches Mac, anything containing `windows` matches
    /// Windows.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if name == "linux" || name.contains("linux") {
            Some(Os::Linux)
        } else if name == "mac os x" || name.contains("mac") {
            Some(Os::Mac)
        } else if name.contains("windows") {
            Some(Os::Windows)
        } else {
            None
        }
    }

    /// Short lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Mac => "mac",
            Os::Windows => "windows",
        }
    }
}

impl Arch {
    /// Match a raw architecture identifier against the rule table.
    ///
    /// `x86` is 32-bit; `x86_64` and `amd64` are 64-bit. Nothing else matches.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "x86" => Some(Arch::X32),
            "x86_64" | "amd64" => Some(Arch::X64),
            _ => None,
        }
    }

    /// Short lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Arch::X32 => "x32",
            Arch::X64 => "x64",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the host operating system
#[must_use]
pub fn detect_os() -> Option<Os> {
    Os::from_name(std::env::consts::OS)
}

/// Detect the host CPU architecture
#[must_use]
pub fn detect_arch() -> Option<Arch> {
    Arch::from_name(std::env::consts::ARCH)
}

/// An (OS, architecture) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    /// Operating system
    pub os: Os,
    /// CPU architecture
    pub arch: Arch,
}

impl Platform {
    /// Create a platform from its parts
    #[must_use]
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Detect the host platform, or `None` if either half is unknown
    #[must_use]
    pub fn detect() -> Option<Self> {
        Some(Self::new(detect_os()?, detect_arch()?))
    }

    /// Detect the host platform.
    ///
    /// # Errors
    ///
    /// Returns `NatriumError::UnsupportedPlatform` carrying the raw host
    /// identifiers if either the OS or the architecture is unknown.
    pub fn current() -> Result<Self> {
        Self::detect().ok_or_else(|| NatriumError::UnsupportedPlatform {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
