//! Static catalog of prebuilt libsodium variants.
//!
//! Each [`Variant`] describes one platform-specific build: its logical
//! version, target OS and architecture, free-form runtime tags and the
//! identifier of the embedded resource holding its bytes. The catalog is
//! immutable and ordered; resolution ties are broken by catalog order.
//!
//! ## Builtin Variants
//!
//! | Version | OS | Arch | Tags |
//! |---------|----|------|------|
//! | 1.0.12 | linux | x64 | - |
//! | 1.0.12 | mac | x64 | - |
//! | 1.0.18 | linux | x64, x32 | - |
//! | 1.0.18 | mac | x64 | - |
//! | 1.0.18 | windows | x64, x32 | runtime=msvc, runtime-version=142 |
//! | 1.0.18 | windows | x64 | runtime=mingw, runtime-version=8 |

use crate::platform::{Arch, Os, Platform};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet};

/// Tag naming the toolchain runtime a Windows build links against
pub const TAG_RUNTIME: &str = "runtime";

/// Tag naming the runtime's major version
pub const TAG_RUNTIME_VERSION: &str = "runtime-version";

/// Version resolved when no version is configured
pub const DEFAULT_VERSION: &str = "1.0.18";

/// Requested tag set, as passed to the resolver
pub type Tags = BTreeMap<String, String>;

/// One platform-specific build of the native library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variant {
    /// Logical library version
    pub version: &'static str,
    /// Target operating system
    pub os: Os,
    /// Target CPU architecture
    pub arch: Arch,
    /// Free-form runtime qualifiers
    pub tags: &'static [(&'static str, &'static str)],
    /// Identifier of the embedded resource holding the library bytes
    pub resource_id: &'static str,
}

impl Variant {
    /// Create an untagged variant
    #[must_use]
    pub const fn new(version: &'static str, os: Os, arch: Arch, resource_id: &'static str) -> Self {
        Self {
            version,
            os,
            arch,
            tags: &[],
            resource_id,
        }
    }

    /// Attach runtime tags
    #[must_use]
    pub const fn with_tags(mut self, tags: &'static [(&'static str, &'static str)]) -> Self {
        self.tags = tags;
        self
    }

    /// Platform this variant targets
    #[must_use]
    pub const fn platform(&self) -> Platform {
        Platform::new(self.os, self.arch)
    }

    /// Look up a tag value
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&'static str> {
        self.tags.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    /// Returns true if every requested tag is present with an equal value.
    ///
    /// Tags carried by the variant but not requested are ignored.
    #[must_use]
    pub fn matches_tags(&self, required: &Tags) -> bool {
        required
            .iter()
            .all(|(key, value)| self.tag(key) == Some(value.as_str()))
    }

    /// File extension the platform's dynamic loader expects, including the dot
    #[must_use]
    pub fn file_suffix(&self) -> &'static str {
        match self.resource_id.rfind('.') {
            Some(idx) => &self.resource_id[idx..],
            None => "",
        }
    }

    /// Resource name without its extension
    #[must_use]
    pub fn resource_stem(&self) -> &'static str {
        let name = match self.resource_id.rfind('/') {
            Some(idx) => &self.resource_id[idx + 1..],
            None => self.resource_id,
        };
        match name.rfind('.') {
            Some(idx) => &name[..idx],
            None => name,
        }
    }

    /// Variant tags as an owned map
    #[must_use]
    pub fn tag_map(&self) -> Tags {
        self.tags
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }
}

const MSVC_142: &[(&str, &str)] = &[(TAG_RUNTIME, "msvc"), (TAG_RUNTIME_VERSION, "142")];
const MINGW_8: &[(&str, &str)] = &[(TAG_RUNTIME, "mingw"), (TAG_RUNTIME_VERSION, "8")];

static BUILTIN: [Variant; 8] = [
    Variant::new("1.0.12", Os::Linux, Arch::X64, "libsodium-1.0.12.x64.linux.so"),
    Variant::new("1.0.12", Os::Mac, Arch::X64, "libsodium-1.0.12.x64.osx.dylib"),
    Variant::new("1.0.18", Os::Linux, Arch::X64, "libsodium-1.0.18.x64.linux.so"),
    Variant::new("1.0.18", Os::Linux, Arch::X32, "libsodium-1.0.18.x32.linux.so"),
    Variant::new("1.0.18", Os::Mac, Arch::X64, "libsodium-1.0.18.x64.osx.dylib"),
    Variant::new(
        "1.0.18",
        Os::Windows,
        Arch::X64,
        "libsodium-1.0.18.x64.windows.msvc142.dll",
    )
    .with_tags(MSVC_142),
    Variant::new(
        "1.0.18",
        Os::Windows,
        Arch::X32,
        "libsodium-1.0.18.x32.windows.msvc142.dll",
    )
    .with_tags(MSVC_142),
    Variant::new(
        "1.0.18",
        Os::Windows,
        Arch::X64,
        "libsodium-1.0.18.x64.windows.mingw8.dll",
    )
    .with_tags(MINGW_8),
];

/// Distinct versions present in the builtin catalog
pub static AVAILABLE_VERSIONS: Lazy<BTreeSet<&'static str>> =
    Lazy::new(|| Catalog::builtin().available_versions());

/// Ordered, immutable list of variants
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    variants: &'static [Variant],
}

impl Catalog {
    /// Create a catalog over a static variant list
    #[must_use]
    pub const fn new(variants: &'static [Variant]) -> Self {
        Self { variants }
    }

    /// The catalog of variants this crate knows how to package
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(&BUILTIN)
    }

    /// All variants in registration order
    #[must_use]
    pub fn variants(&self) -> &'static [Variant] {
        self.variants
    }

    /// Iterate variants in registration order
    pub fn iter(&self) -> impl Iterator<Item = &'static Variant> {
        self.variants.iter()
    }

    /// Distinct versions in this catalog
    #[must_use]
    pub fn available_versions(&self) -> BTreeSet<&'static str> {
        self.variants.iter().map(|v| v.version).collect()
    }

    /// Find a variant by resource identifier
    #[must_use]
    pub fn by_resource_id(&self, resource_id: &str) -> Option<&'static Variant> {
        self.variants.iter().find(|v| v.resource_id == resource_id)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
