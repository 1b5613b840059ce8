//! `XChaCha20-Poly1305` AEAD over the native library.
//!
//! Provides authenticated encryption with associated data using libsodium's
//! `crypto_aead_xchacha20poly1305_ietf_*` functions:
//! - 256-bit keys
//! - 192-bit nonces
//! - 128-bit authentication tags appended to the ciphertext
//!
//! ## Failure Semantics
//!
//! Encryption with well-formed inputs cannot fail; a nonzero native status is
//! reported as `NatriumError::EncryptionFailed`. Decryption failure is an
//! expected outcome and is returned as `None`, with no partial plaintext and
//! no indication of which check failed.
//!
//! ## Usage
//!
//! ```ignore
//! use natrium_core::aead::{AeadKey, Nonce};
//!
//! let sodium = natrium_core::global::sodium()?;
//! let aead = sodium.xchacha20poly1305();
//! let key = AeadKey::generate(&mut OsRng);
//! let nonce = Nonce::generate(&mut OsRng);
//!
//! let ciphertext = aead.encrypt(b"secret", b"header", &nonce, &key)?;
//! let plaintext = aead.decrypt(&ciphertext, b"header", &nonce, &key);
//! ```

use crate::error::{NatriumError, Result};
use crate::loader::{LoadedLibrary, SodiumApi};
use rand_core::{CryptoRng, RngCore};
use std::os::raw::c_ulonglong;
use std::ptr;
use zeroize::{ZeroizeOnDrop, Zeroizing};

/// Nonce size (24 bytes / 192 bits).
pub const NONCE_BYTES: usize = 24;

/// Key size (32 bytes / 256 bits).
pub const KEY_BYTES: usize = 32;

/// Authentication tag size (16 bytes / 128 bits).
pub const TAG_BYTES: usize = 16;

/// XChaCha20-Poly1305 nonce (24 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_BYTES]);

impl Nonce {
    /// Create a nonce from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; NONCE_BYTES]) -> Self {
        Self(bytes)
    }

    /// Create a nonce from a slice.
    ///
    /// # Errors
    ///
    /// Returns `NatriumError::InvalidNonceLength` if the slice is not 24 bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; NONCE_BYTES] =
            slice
                .try_into()
                .map_err(|_| NatriumError::InvalidNonceLength {
                    expected: NONCE_BYTES,
                    actual: slice.len(),
                })?;
        Ok(Self(bytes))
    }

    /// Generate a random nonce.
    #[must_use]
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; NONCE_BYTES];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; NONCE_BYTES] {
        &self.0
    }
}

impl From<[u8; NONCE_BYTES]> for Nonce {
    fn from(bytes: [u8; NONCE_BYTES]) -> Self {
        Self(bytes)
    }
}

/// AEAD key (32 bytes), zeroized on drop.
#[derive(Clone, ZeroizeOnDrop)]
pub struct AeadKey([u8; KEY_BYTES]);

impl AeadKey {
    /// Create a key from raw bytes.
    #[must_use]
    pub fn new(bytes: [u8; KEY_BYTES]) -> Self {
        Self(bytes)
    }

    /// Create from slice.
    ///
    /// # Errors
    ///
    /// Returns `NatriumError::InvalidKeyLength` if the slice is not 32 bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_BYTES] =
            slice
                .try_into()
                .map_err(|_| NatriumError::InvalidKeyLength {
                    expected: KEY_BYTES,
                    actual: slice.len(),
                })?;
        Ok(Self(bytes))
    }

    /// Generate a random key.
    #[must_use]
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; KEY_BYTES];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get raw key bytes.
    ///
    /// # Security
    ///
    /// Handle with extreme care - this exposes the raw key material.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_BYTES] {
        &self.0
    }
}

impl From<[u8; KEY_BYTES]> for AeadKey {
    fn from(bytes: [u8; KEY_BYTES]) -> Self {
        Self(bytes)
    }
}

/// XChaCha20-Poly1305 bound to a loaded native library.
///
/// Holds no state besides the function table; concurrent use from several
/// threads with distinct buffers needs no locking.
#[derive(Clone, Copy, Debug)]
pub struct XChaCha20Poly1305<'a> {
    api: &'a SodiumApi,
}

impl LoadedLibrary {
    /// AEAD handle over this library
    #[must_use]
    pub fn xchacha20poly1305(&self) -> XChaCha20Poly1305<'_> {
        XChaCha20Poly1305::new(self.api())
    }
}

impl<'a> XChaCha20Poly1305<'a> {
    /// Wrap a bound function table
    #[must_use]
    pub fn new(api: &'a SodiumApi) -> Self {
        Self { api }
    }

    /// Encrypt `message`, authenticating `additional_data`.
    ///
    /// Returns ciphertext with appended authentication tag
    /// (`message.len()` + 16 bytes).
    ///
    /// # Errors
    ///
    /// Returns `NatriumError::EncryptionFailed` if the native call reports a
    /// nonzero status.
    pub fn encrypt(
        &self,
        message: &[u8],
        additional_data: &[u8],
        nonce: &Nonce,
        key: &AeadKey,
    ) -> Result<Vec<u8>> {
        let mut ciphertext = vec![0u8; message.len() + TAG_BYTES];
        let mut ciphertext_len: c_ulonglong = 0;

        // SAFETY: `ciphertext` has room for message + tag, every input
        // pointer is valid for its stated length, nonce and key are
        // fixed-size arrays of the required length
        let status = unsafe {
            (self.api.encrypt)(
                ciphertext.as_mut_ptr(),
                &mut ciphertext_len,
                message.as_ptr(),
                message.len() as c_ulonglong,
                additional_data.as_ptr(),
                additional_data.len() as c_ulonglong,
                ptr::null(),
                nonce.as_bytes().as_ptr(),
                key.as_bytes().as_ptr(),
            )
        };

        if status != 0 {
            return Err(NatriumError::EncryptionFailed);
        }

        ciphertext.truncate(ciphertext_len as usize);
        Ok(ciphertext)
    }

    /// Decrypt `ciphertext` and verify it together with `additional_data`.
    ///
    /// Returns `None` if authentication fails or the input is shorter than
    /// a tag. The plaintext buffer is wiped before it is discarded.
    #[must_use]
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        additional_data: &[u8],
        nonce: &Nonce,
        key: &AeadKey,
    ) -> Option<Vec<u8>> {
        if ciphertext.len() < TAG_BYTES {
            return None;
        }

        let mut plaintext = Zeroizing::new(vec![0u8; ciphertext.len() - TAG_BYTES]);
        let mut plaintext_len: c_ulonglong = 0;

        // SAFETY: `plaintext` has room for ciphertext minus tag, every input
        // pointer is valid for its stated length
        let status = unsafe {
            (self.api.decrypt)(
                plaintext.as_mut_ptr(),
                &mut plaintext_len,
                ptr::null_mut(),
                ciphertext.as_ptr(),
                ciphertext.len() as c_ulonglong,
                additional_data.as_ptr(),
                additional_data.len() as c_ulonglong,
                nonce.as_bytes().as_ptr(),
                key.as_bytes().as_ptr(),
            )
        };

        if status != 0 {
            return None;
        }

        plaintext.truncate(plaintext_len as usize);
        Some(std::mem::take(&mut *plaintext))
    }
}
