//! In-process stand-ins for the native function table.
//!
//! The reference table implements libsodium's three entry points over the
//! RustCrypto `chacha20poly1305` crate with the same pointer, length and
//! status contracts, so the wrapper can be tested without a shared library.

use crate::aead::{KEY_BYTES, NONCE_BYTES, TAG_BYTES};
use crate::loader::SodiumApi;
use chacha20poly1305::aead::{AeadInPlace, KeyInit};
use chacha20poly1305::{Key, Tag, XChaCha20Poly1305, XNonce};
use std::os::raw::{c_int, c_uchar, c_ulonglong};
use std::sync::atomic::{AtomicUsize, Ordering};

static INIT_CALLS: AtomicUsize = AtomicUsize::new(0);

/// Number of times any reference `sodium_init` ran in this test process
pub(crate) fn init_calls() -> usize {
    INIT_CALLS.load(Ordering::SeqCst)
}

unsafe fn input<'a>(ptr: *const c_uchar, len: c_ulonglong) -> &'a [u8] {
    if len == 0 {
        &[]
    } else {
        // SAFETY: caller passes a pointer valid for `len` bytes
        unsafe { std::slice::from_raw_parts(ptr, len as usize) }
    }
}

unsafe fn output<'a>(ptr: *mut c_uchar, len: usize) -> &'a mut [u8] {
    if len == 0 {
        &mut []
    } else {
        // SAFETY: caller passes a pointer valid for `len` bytes
        unsafe { std::slice::from_raw_parts_mut(ptr, len) }
    }
}

unsafe extern "C" fn ref_init() -> c_int {
    INIT_CALLS.fetch_add(1, Ordering::SeqCst);
    0
}

unsafe extern "C" fn ref_encrypt(
    c: *mut c_uchar,
    clen_p: *mut c_ulonglong,
    m: *const c_uchar,
    mlen: c_ulonglong,
    ad: *const c_uchar,
    adlen: c_ulonglong,
    _nsec: *const c_uchar,
    npub: *const c_uchar,
    k: *const c_uchar,
) -> c_int {
    // SAFETY: libsodium's contract; the wrapper upholds it
    unsafe {
        let message = input(m, mlen);
        let ad = input(ad, adlen);
        let nonce = input(npub, NONCE_BYTES as c_ulonglong);
        let key = input(k, KEY_BYTES as c_ulonglong);

        let mut buffer = message.to_vec();
        let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
        let Ok(tag) = cipher.encrypt_in_place_detached(XNonce::from_slice(nonce), ad, &mut buffer)
        else {
            return -1;
        };

        let out = output(c, buffer.len() + TAG_BYTES);
        out[..buffer.len()].copy_from_slice(&buffer);
        out[buffer.len()..].copy_from_slice(&tag);
        if !clen_p.is_null() {
            *clen_p = out.len() as c_ulonglong;
        }
    }
    0
}

unsafe extern "C" fn ref_decrypt(
    m: *mut c_uchar,
    mlen_p: *mut c_ulonglong,
    _nsec: *mut c_uchar,
    c: *const c_uchar,
    clen: c_ulonglong,
    ad: *const c_uchar,
    adlen: c_ulonglong,
    npub: *const c_uchar,
    k: *const c_uchar,
) -> c_int {
    if (clen as usize) < TAG_BYTES {
        return -1;
    }

    // SAFETY: libsodium's contract; the wrapper upholds it
    unsafe {
        let ciphertext = input(c, clen);
        let ad = input(ad, adlen);
        let nonce = input(npub, NONCE_BYTES as c_ulonglong);
        let key = input(k, KEY_BYTES as c_ulonglong);

        let (body, tag) = ciphertext.split_at(ciphertext.len() - TAG_BYTES);
        let mut buffer = body.to_vec();
        let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
        if cipher
            .decrypt_in_place_detached(XNonce::from_slice(nonce), ad, &mut buffer, Tag::from_slice(tag))
            .is_err()
        {
            return -1;
        }

        output(m, buffer.len()).copy_from_slice(&buffer);
        if !mlen_p.is_null() {
            *mlen_p = buffer.len() as c_ulonglong;
        }
    }
    0
}

static COUNTED_INIT_CALLS: AtomicUsize = AtomicUsize::new(0);

/// Number of times the counted `sodium_init` ran; only one test uses it
pub(crate) fn counted_init_calls() -> usize {
    COUNTED_INIT_CALLS.load(Ordering::SeqCst)
}

unsafe extern "C" fn counted_init() -> c_int {
    COUNTED_INIT_CALLS.fetch_add(1, Ordering::SeqCst);
    0
}

unsafe extern "C" fn failing_init() -> c_int {
    -1
}

unsafe extern "C" fn failing_encrypt(
    _c: *mut c_uchar,
    _clen_p: *mut c_ulonglong,
    _m: *const c_uchar,
    _mlen: c_ulonglong,
    _ad: *const c_uchar,
    _adlen: c_ulonglong,
    _nsec: *const c_uchar,
    _npub: *const c_uchar,
    _k: *const c_uchar,
) -> c_int {
    -1
}

unsafe extern "C" fn short_encrypt(
    c: *mut c_uchar,
    clen_p: *mut c_ulonglong,
    m: *const c_uchar,
    mlen: c_ulonglong,
    ad: *const c_uchar,
    adlen: c_ulonglong,
    nsec: *const c_uchar,
    npub: *const c_uchar,
    k: *const c_uchar,
) -> c_int {
    // SAFETY: forwarded unchanged
    let status = unsafe { ref_encrypt(c, clen_p, m, mlen, ad, adlen, nsec, npub, k) };
    // SAFETY: `clen_p` was just written by ref_encrypt
    unsafe { *clen_p -= 1 };
    status
}

unsafe extern "C" fn short_decrypt(
    _m: *mut c_uchar,
    mlen_p: *mut c_ulonglong,
    _nsec: *mut c_uchar,
    _c: *const c_uchar,
    clen: c_ulonglong,
    _ad: *const c_uchar,
    _adlen: c_ulonglong,
    _npub: *const c_uchar,
    _k: *const c_uchar,
) -> c_int {
    // SAFETY: the wrapper always passes a valid length pointer
    unsafe { *mlen_p = clen - TAG_BYTES as c_ulonglong - 1 };
    0
}

/// Table backed by the RustCrypto reference implementation
pub(crate) fn reference_api() -> SodiumApi {
    // SAFETY: the reference functions honour libsodium's contracts
    unsafe { SodiumApi::from_raw(ref_init, ref_encrypt, ref_decrypt) }
}

/// Reference table whose `sodium_init` has its own call counter
pub(crate) fn counted_api() -> SodiumApi {
    // SAFETY: as above
    unsafe { SodiumApi::from_raw(counted_init, ref_encrypt, ref_decrypt) }
}

/// Table whose `sodium_init` reports failure
pub(crate) fn failing_init_api() -> SodiumApi {
    // SAFETY: as above
    unsafe { SodiumApi::from_raw(failing_init, ref_encrypt, ref_decrypt) }
}

/// Table whose encrypt always reports a nonzero status
pub(crate) fn failing_encrypt_api() -> SodiumApi {
    // SAFETY: as above
    unsafe { SodiumApi::from_raw(ref_init, failing_encrypt, ref_decrypt) }
}

/// Table that reports one byte less than it produced
pub(crate) fn short_length_api() -> SodiumApi {
    // SAFETY: as above
    unsafe { SodiumApi::from_raw(ref_init, short_encrypt, short_decrypt) }
}
