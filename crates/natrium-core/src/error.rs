//! Error types for variant resolution, extraction and native loading.
//!
//! Errors fall into the categories below. None of them is retried internally;
//! the caller decides whether to resolve again with different tags, fall back
//! to another version, or abort.
//!
//! # Error Categories
//!
//! - **Environment**: unknown OS or architecture, no matching variant,
//!   missing embedded resource
//! - **Io**: temp-file creation, stream copy, dynamic library open
//! - **Initialization**: the native library rejected its one-time init
//! - **Crypto**: encryption failure or malformed key/nonce material
//! - **Config**: invalid loader configuration
//!
//! Decryption authentication failure is deliberately absent from this enum.
//! It is an expected outcome and is reported as `None` by
//! [`XChaCha20Poly1305::decrypt`](crate::aead::XChaCha20Poly1305::decrypt).

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the natrium loading pipeline and AEAD wrapper
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NatriumError {
    // ============ Environment Errors ============
    /// Host OS or CPU architecture is not in the detector's rule table
    #[error("Unsupported platform: os={os}, arch={arch}")]
    UnsupportedPlatform {
        /// Raw OS identifier reported by the host
        os: String,
        /// Raw architecture identifier reported by the host
        arch: String,
    },

    /// No catalog variant passed all resolver filters
    #[error("No variant of version {version} for {platform} matching tags {tags:?}")]
    NoMatchingVariant {
        /// Requested version
        version: String,
        /// Platform the catalog was filtered for
        platform: String,
        /// Requested tags
        tags: BTreeMap<String, String>,
    },

    /// More than one variant matched and the resolver runs in strict mode
    #[error("Ambiguous variant for version {version}: {}", .candidates.join(", "))]
    AmbiguousVariant {
        /// Requested version
        version: String,
        /// Resource identifiers of all matching variants, in catalog order
        candidates: Vec<String>,
    },

    /// The selected variant's embedded bytes are not packaged
    #[error("Embedded resource not found: {0}")]
    ResourceNotFound(String),

    // ============ I/O Errors ============
    /// Temp-file creation or stream copy failed
    #[error("I/O error: {0}")]
    Io(Cow<'static, str>),

    /// The dynamic loader refused the extracted file
    #[error("Failed to open native library {path:?}: {reason}")]
    LibraryOpen {
        /// Path handed to the dynamic loader
        path: PathBuf,
        /// Loader diagnostic
        reason: String,
    },

    /// A required foreign function is not exported by the library
    #[error("Native library does not export {symbol}: {reason}")]
    MissingSymbol {
        /// Symbol name
        symbol: &'static str,
        /// Loader diagnostic
        reason: String,
    },

    // ============ Initialization Errors ============
    /// The library's one-time init entry point reported failure
    #[error("Native library initialization failed with status {0}")]
    InitializationFailed(i32),

    // ============ Cryptographic Errors ============
    /// The native encryption primitive returned a nonzero status
    #[error("Encryption failed")]
    EncryptionFailed,

    /// Key material has the wrong length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Nonce has the wrong length
    #[error("Invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    // ============ Configuration Errors ============
    /// Loader configuration is malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(Cow<'static, str>),
}

/// Coarse classification of a [`NatriumError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Host or packaging does not provide what was asked for
    Environment,
    /// Filesystem or dynamic loader failure
    Io,
    /// Native one-time initialization failed
    Initialization,
    /// Cryptographic operation or key material failure
    Crypto,
    /// Invalid configuration
    Config,
}

impl NatriumError {
    /// Classify this error
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            NatriumError::UnsupportedPlatform { .. }
            | NatriumError::NoMatchingVariant { .. }
            | NatriumError::AmbiguousVariant { .. }
            | NatriumError::ResourceNotFound(_) => ErrorCategory::Environment,
            NatriumError::Io(_)
            | NatriumError::LibraryOpen { .. }
            | NatriumError::MissingSymbol { .. } => ErrorCategory::Io,
            NatriumError::InitializationFailed(_) => ErrorCategory::Initialization,
            NatriumError::EncryptionFailed
            | NatriumError::InvalidKeyLength { .. }
            | NatriumError::InvalidNonceLength { .. } => ErrorCategory::Crypto,
            NatriumError::InvalidConfig(_) => ErrorCategory::Config,
        }
    }

    /// Returns true if the host or packaging cannot satisfy the request
    ///
    /// These never succeed on retry with the same inputs.
    #[must_use]
    pub fn is_environment(&self) -> bool {
        self.category() == ErrorCategory::Environment
    }

    /// Returns true for filesystem and dynamic loader failures
    ///
    /// A higher layer may retry these.
    #[must_use]
    pub fn is_io(&self) -> bool {
        self.category() == ErrorCategory::Io
    }

    /// Create an invalid configuration error with static context (zero allocation)
    #[must_use]
    pub const fn invalid_config(context: &'static str) -> Self {
        NatriumError::InvalidConfig(Cow::Borrowed(context))
    }
}

impl From<std::io::Error> for NatriumError {
    fn from(err: std::io::Error) -> Self {
        NatriumError::Io(Cow::Owned(err.to_string()))
    }
}

/// Result type for natrium operations
pub type Result<T> = std::result::Result<T, NatriumError>;
