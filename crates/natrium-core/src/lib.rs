//! # Natrium Core
//!
//! Loads the right prebuilt libsodium for the host and wraps its
//! XChaCha20-Poly1305 AEAD.
//!
//! This crate provides:
//! - Platform detection into a closed OS/architecture enumeration
//! - A static catalog of native builds and a deterministic resolver
//! - Extraction of the selected build to a loadable file
//! - Dynamic loading, symbol binding and one-time native initialization
//! - A process-wide lazily constructed library
//! - A fixed-size AEAD wrapper over the bound functions
//!
//! ## Pipeline
//!
//! | Stage | Module | Failure |
//! |-------|--------|---------|
//! | Detect | [`platform`] | `UnsupportedPlatform` |
//! | Resolve | [`resolver`] | `NoMatchingVariant`, `AmbiguousVariant` |
//! | Extract | [`extractor`] | `ResourceNotFound`, `Io` |
//! | Load | [`loader`] | `LibraryOpen`, `MissingSymbol`, `InitializationFailed` |
//! | Encrypt / Decrypt | [`aead`] | `EncryptionFailed` / `None` |
//!
//! ## Example
//!
//! ```no_run
//! use natrium_core::{AeadKey, Nonce};
//! use rand_core::OsRng;
//!
//! let key = AeadKey::generate(&mut OsRng);
//! let nonce = Nonce::generate(&mut OsRng);
//!
//! let ciphertext = natrium_core::encrypt(b"hello", b"header", &nonce, &key)?;
//! let plaintext = natrium_core::decrypt(&ciphertext, b"header", &nonce, &key)?;
//! assert_eq!(plaintext.as_deref(), Some(&b"hello"[..]));
//! # Ok::<(), natrium_core::NatriumError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod aead;
pub mod catalog;
pub mod config;
pub mod error;
pub mod extractor;
pub mod global;
pub mod loader;
pub mod platform;
pub mod resolver;
pub mod resources;

#[cfg(test)]
mod testing;

pub use aead::{AeadKey, KEY_BYTES, NONCE_BYTES, Nonce, TAG_BYTES, XChaCha20Poly1305};
pub use catalog::{AVAILABLE_VERSIONS, Catalog, Tags, Variant};
pub use config::LoaderConfig;
pub use error::{ErrorCategory, NatriumError, Result};
pub use extractor::{ExtractedLibrary, Extractor, extract};
pub use global::{bootstrap, decrypt, encrypt, sodium};
pub use loader::{InitStatus, LoadedLibrary, SodiumApi};
pub use platform::{Arch, Os, Platform};
pub use resolver::{ResolvePolicy, resolve, resolve_for};
