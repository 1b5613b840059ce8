//! Native binding loader.
//!
//! Opens an extracted libsodium with the platform's dynamic loader, binds
//! the three foreign functions the AEAD wrapper needs and runs the library's
//! one-time initialization.
//!
//! ## Foreign Function Surface
//!
//! | Symbol | Returns |
//! |--------|---------|
//! | `sodium_init` | 0 initialized, 1 already initialized, -1 failure |
//! | `crypto_aead_xchacha20poly1305_ietf_encrypt` | 0 on success |
//! | `crypto_aead_xchacha20poly1305_ietf_decrypt` | 0 on success, nonzero on authentication failure |
//!
//! The library is treated as trusted: its load-time initializers run with
//! the privileges of this process.

use crate::catalog::Variant;
use crate::error::{NatriumError, Result};
use crate::extractor::ExtractedLibrary;
use libloading::Library;
use std::fmt;
use std::os::raw::{c_int, c_uchar, c_ulonglong};
use std::path::{Path, PathBuf};

/// `int sodium_init(void)`
pub type InitFn = unsafe extern "C" fn() -> c_int;

/// `crypto_aead_xchacha20poly1305_ietf_encrypt(c, clen_p, m, mlen, ad, adlen, nsec, npub, k)`
pub type EncryptFn = unsafe extern "C" fn(
    c: *mut c_uchar,
    clen_p: *mut c_ulonglong,
    m: *const c_uchar,
    mlen: c_ulonglong,
    ad: *const c_uchar,
    adlen: c_ulonglong,
    nsec: *const c_uchar,
    npub: *const c_uchar,
    k: *const c_uchar,
) -> c_int;

/// `crypto_aead_xchacha20poly1305_ietf_decrypt(m, mlen_p, nsec, c, clen, ad, adlen, npub, k)`
pub type DecryptFn = unsafe extern "C" fn(
    m: *mut c_uchar,
    mlen_p: *mut c_ulonglong,
    nsec: *mut c_uchar,
    c: *const c_uchar,
    clen: c_ulonglong,
    ad: *const c_uchar,
    adlen: c_ulonglong,
    npub: *const c_uchar,
    k: *const c_uchar,
) -> c_int;

const SYM_INIT: &str = "sodium_init";
const SYM_ENCRYPT: &str = "crypto_aead_xchacha20poly1305_ietf_encrypt";
const SYM_DECRYPT: &str = "crypto_aead_xchacha20poly1305_ietf_decrypt";

/// Bound foreign function table
#[derive(Clone, Copy)]
pub struct SodiumApi {
    pub(crate) init: InitFn,
    pub(crate) encrypt: EncryptFn,
    pub(crate) decrypt: DecryptFn,
}

impl SodiumApi {
    /// Build a table from function pointers that are already linked.
    ///
    /// # Safety
    ///
    /// Each pointer must implement the libsodium function of the same role,
    /// including its buffer-size and status contracts, and must remain
    /// callable for as long as the table is used.
    #[must_use]
    pub unsafe fn from_raw(init: InitFn, encrypt: EncryptFn, decrypt: DecryptFn) -> Self {
        Self {
            init,
            encrypt,
            decrypt,
        }
    }

    /// Resolve the table from an opened library.
    ///
    /// # Safety
    ///
    /// The returned pointers are only valid while `library` stays loaded.
    unsafe fn bind(library: &Library) -> Result<Self> {
        // SAFETY: the type aliases match libsodium's published prototypes
        unsafe {
            Ok(Self {
                init: *symbol::<InitFn>(library, SYM_INIT)?,
                encrypt: *symbol::<EncryptFn>(library, SYM_ENCRYPT)?,
                decrypt: *symbol::<DecryptFn>(library, SYM_DECRYPT)?,
            })
        }
    }
}

impl fmt::Debug for SodiumApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SodiumApi").finish_non_exhaustive()
    }
}

/// Look up `name` in `library`.
///
/// # Safety
///
/// `T` must be the correct function pointer type for the symbol.
unsafe fn symbol<'lib, T>(library: &'lib Library, name: &'static str) -> Result<libloading::Symbol<'lib, T>> {
    let mut cname = Vec::with_capacity(name.len() + 1);
    cname.extend_from_slice(name.as_bytes());
    cname.push(0);

    // SAFETY: upheld by the caller
    unsafe { library.get::<T>(&cname) }.map_err(|e| NatriumError::MissingSymbol {
        symbol: name,
        reason: e.to_string(),
    })
}

/// Outcome of the native one-time initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    /// The library initialized itself on this call
    Initialized,
    /// The library had already been initialized in this process
    AlreadyInitialized,
}

impl InitStatus {
    /// Interpret a `sodium_init` return value.
    ///
    /// # Errors
    ///
    /// Returns `NatriumError::InitializationFailed` for any status other
    /// than 0 or 1.
    pub fn from_status(status: c_int) -> Result<Self> {
        match status {
            0 => Ok(InitStatus::Initialized),
            1 => Ok(InitStatus::AlreadyInitialized),
            other => Err(NatriumError::InitializationFailed(other)),
        }
    }
}

/// An opened, initialized native library
///
/// The library handle is never closed before the value is dropped, and the
/// process-wide instance in [`crate::global`] is never dropped.
pub struct LoadedLibrary {
    api: SodiumApi,
    status: InitStatus,
    path: Option<PathBuf>,
    variant: Option<&'static Variant>,
    // Must outlive every pointer in `api`
    _library: Option<Library>,
}

impl LoadedLibrary {
    /// Open the library at `path`, bind its functions and initialize it.
    ///
    /// # Errors
    ///
    /// Returns `NatriumError::LibraryOpen` if the dynamic loader rejects the
    /// file, `NatriumError::MissingSymbol` if a required function is not
    /// exported, `NatriumError::InitializationFailed` if `sodium_init`
    /// reports failure.
    pub fn load_and_init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // SAFETY: catalog libraries are trusted; running their initializers
        // is the point of loading them
        let library = unsafe { Library::new(path) }.map_err(|e| NatriumError::LibraryOpen {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // SAFETY: `library` is stored next to the table and dropped after it
        let api = unsafe { SodiumApi::bind(&library)? };

        let mut loaded = Self::initialize(api, Some(library))?;
        loaded.path = Some(path.to_path_buf());
        tracing::info!("Loaded native library {:?} ({:?})", path, loaded.status);
        Ok(loaded)
    }

    /// Load a file produced by the extractor, remembering its variant.
    ///
    /// # Errors
    ///
    /// See [`load_and_init`](Self::load_and_init).
    pub fn load_extracted(extracted: &ExtractedLibrary) -> Result<Self> {
        let mut loaded = Self::load_and_init(extracted.path())?;
        loaded.variant = Some(extracted.variant());
        Ok(loaded)
    }

    /// Initialize a library whose functions are already linked into the process.
    ///
    /// # Errors
    ///
    /// Returns `NatriumError::InitializationFailed` if the init function
    /// reports failure.
    pub fn from_api(api: SodiumApi) -> Result<Self> {
        Self::initialize(api, None)
    }

    fn initialize(api: SodiumApi, library: Option<Library>) -> Result<Self> {
        // SAFETY: `api` is valid for as long as `library` (or the process) lives
        let status = unsafe { (api.init)() };
        let status = InitStatus::from_status(status)?;

        Ok(Self {
            api,
            status,
            path: None,
            variant: None,
            _library: library,
        })
    }

    /// Bound function table
    #[must_use]
    pub fn api(&self) -> &SodiumApi {
        &self.api
    }

    /// What `sodium_init` reported
    #[must_use]
    pub fn init_status(&self) -> InitStatus {
        self.status
    }

    /// File the library was loaded from, if it was loaded from disk
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Catalog variant the library was extracted from, if known
    #[must_use]
    pub fn variant(&self) -> Option<&'static Variant> {
        self.variant
    }
}

impl fmt::Debug for LoadedLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedLibrary")
            .field("status", &self.status)
            .field("path", &self.path)
            .field("variant", &self.variant.map(|v| v.resource_id))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn test_init_status() {
        assert_eq!(InitStatus::from_status(0), Ok(InitStatus::Initialized));
        assert_eq!(InitStatus::from_status(1), Ok(InitStatus::AlreadyInitialized));
        assert_eq!(
            InitStatus::from_status(-1),
            Err(NatriumError::InitializationFailed(-1))
        );
        assert_eq!(
            InitStatus::from_status(7),
            Err(NatriumError::InitializationFailed(7))
        );
    }

    #[test]
    fn test_from_api_runs_init() {
        let before = testing::init_calls();
        let loaded = LoadedLibrary::from_api(testing::reference_api()).unwrap();
        assert!(testing::init_calls() > before);
        assert_eq!(loaded.init_status(), InitStatus::Initialized);
        assert!(loaded.path().is_none());
        assert!(loaded.variant().is_none());
    }

    #[test]
    fn test_from_api_init_failure() {
        let err = LoadedLibrary::from_api(testing::failing_init_api()).unwrap_err();
        assert_eq!(err, NatriumError::InitializationFailed(-1));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libsodium-missing.so");
        let err = LoadedLibrary::load_and_init(&path).unwrap_err();
        match err {
            NatriumError::LibraryOpen { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected LibraryOpen, got {other:?}"),
        }
    }

    #[test]
    fn test_load_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libsodium-garbage.so");
        std::fs::write(&path, b"this is not a shared object").unwrap();
        assert!(matches!(
            LoadedLibrary::load_and_init(&path),
            Err(NatriumError::LibraryOpen { .. })
        ));
    }

    #[test]
    fn test_debug_hides_pointers() {
        let loaded = LoadedLibrary::from_api(testing::reference_api()).unwrap();
        let rendered = format!("{loaded:?}");
        assert!(rendered.contains("Initialized"));
        assert_eq!(format!("{:?}", loaded.api()), "SodiumApi { .. }");
    }
}
