//! Process-wide native library.
//!
//! The first cryptographic call in a process runs the full pipeline exactly
//! once: detect the platform, resolve a variant, extract it, load it and run
//! its one-time initialization. Concurrent first callers block until that
//! sequence completes and then all observe the same outcome. A failure is
//! cached like a success; there is no retry and no re-resolution.
//!
//! The pipeline reads its [`LoaderConfig`] from the environment unless
//! [`configure`] was called first. The first of the two wins; a malformed
//! environment is cached like any other failure.

use crate::aead::{AeadKey, Nonce};
use crate::catalog::Catalog;
use crate::config::LoaderConfig;
use crate::error::{NatriumError, Result};
use crate::extractor::Extractor;
use crate::loader::LoadedLibrary;
use crate::platform::Platform;
use crate::resolver::resolve_for;
use once_cell::sync::OnceCell;

/// A value constructed at most once, caching failure as well as success
pub struct LazyLibrary<T> {
    cell: OnceCell<Result<T>>,
}

impl<T> LazyLibrary<T> {
    /// Create an empty cell
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Return the value, running `load` if no caller has yet.
    ///
    /// Exactly one concurrent caller runs `load`; the others block and then
    /// see its result.
    ///
    /// # Errors
    ///
    /// Returns a clone of the error `load` produced, on this and every later
    /// call.
    pub fn get_or_load<F>(&self, load: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T>,
    {
        match self.cell.get_or_init(load) {
            Ok(value) => Ok(value),
            Err(e) => Err(e.clone()),
        }
    }

    /// The value, if it was loaded successfully
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.cell.get().and_then(|r| r.as_ref().ok())
    }

    /// Returns true once a load has completed, successfully or not
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Default for LazyLibrary<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Holds the environment read too, so a failed read still closes the slot
static CONFIG: OnceCell<Result<LoaderConfig>> = OnceCell::new();
static SODIUM: LazyLibrary<LoadedLibrary> = LazyLibrary::new();

/// Install the configuration the process-wide loader will use.
///
/// # Errors
///
/// Returns `NatriumError::InvalidConfig` if the configuration is invalid or
/// a configuration was already installed, or if [`sodium`] already read the
/// environment, whether that read succeeded or not.
pub fn configure(config: LoaderConfig) -> Result<()> {
    config.validate()?;
    CONFIG
        .set(Ok(config))
        .map_err(|_| NatriumError::invalid_config("global loader is already configured"))
}

/// The process-wide native library, loading it on first use.
///
/// # Errors
///
/// Returns whatever the one-time pipeline failed with; see [`bootstrap`].
pub fn sodium() -> Result<&'static LoadedLibrary> {
    SODIUM.get_or_load(|| {
        let config = CONFIG
            .get_or_init(LoaderConfig::from_env)
            .as_ref()
            .map_err(Clone::clone)?;
        bootstrap(config)
    })
}

/// Run resolve, extract and load for the host platform.
///
/// Every call extracts and loads a fresh copy; use [`sodium`] for the
/// process-wide instance.
///
/// # Errors
///
/// Returns `NatriumError::UnsupportedPlatform`, `NoMatchingVariant`,
/// `AmbiguousVariant`, `ResourceNotFound`, `Io`, `LibraryOpen`,
/// `MissingSymbol` or `InitializationFailed` from the failing stage.
pub fn bootstrap(config: &LoaderConfig) -> Result<LoadedLibrary> {
    config.validate()?;

    let platform = Platform::current()?;
    let variant = resolve_for(
        &Catalog::builtin(),
        platform,
        &config.version,
        &config.tags,
        config.policy(),
    )?;
    tracing::info!(
        "Selected {} for libsodium {} on {}",
        variant.resource_id,
        config.version,
        platform
    );

    let source = config.resource_source();
    let mut extractor = Extractor::new(source.as_ref());
    if let Some(dir) = &config.extract_dir {
        extractor = extractor.in_dir(dir);
    }

    let extracted = extractor.extract(variant)?;
    LoadedLibrary::load_extracted(&extracted)
}

/// Encrypt with the process-wide library.
///
/// # Errors
///
/// Returns the loader's error on first use, or
/// `NatriumError::EncryptionFailed`.
pub fn encrypt(message: &[u8], additional_data: &[u8], nonce: &Nonce, key: &AeadKey) -> Result<Vec<u8>> {
    sodium()?
        .xchacha20poly1305()
        .encrypt(message, additional_data, nonce, key)
}

/// Decrypt with the process-wide library.
///
/// `Ok(None)` means authentication failed.
///
/// # Errors
///
/// Returns the loader's error on first use.
pub fn decrypt(
    ciphertext: &[u8],
    additional_data: &[u8],
    nonce: &Nonce,
    key: &AeadKey,
) -> Result<Option<Vec<u8>>> {
    Ok(sodium()?
        .xchacha20poly1305()
        .decrypt(ciphertext, additional_data, nonce, key))
}
