//! End-to-end tests for the resolve, extract and load pipeline.
//!
//! Tests that need a real libsodium shared object run only when
//! `NATRIUM_TEST_LIBSODIUM` names one, e.g.
//! `NATRIUM_TEST_LIBSODIUM=/usr/lib/x86_64-linux-gnu/libsodium.so.23`.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use natrium_core::resources::MemoryResources;
use natrium_core::{
    AeadKey, Arch, Catalog, Extractor, InitStatus, LoadedLibrary, LoaderConfig, NatriumError,
    Nonce, Os, Platform, ResolvePolicy, Tags, TAG_BYTES, bootstrap, resolve_for,
};
use std::path::PathBuf;

fn libsodium_path() -> Option<PathBuf> {
    std::env::var_os("NATRIUM_TEST_LIBSODIUM").map(PathBuf::from)
}

fn pseudo_library(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

// ============================================================================
// Extraction
// ============================================================================

#[test]
fn test_extraction_integrity_for_every_variant() {
    let catalog = Catalog::builtin();
    let dir = tempfile::tempdir().unwrap();

    let mut source = MemoryResources::new();
    for (i, variant) in catalog.iter().enumerate() {
        source.insert(variant.resource_id, pseudo_library(1000 + i * 4096));
    }
    let extractor = Extractor::new(&source).in_dir(dir.path());

    for (i, variant) in catalog.iter().enumerate() {
        let extracted = extractor.extract(variant).unwrap();
        let written = std::fs::read(extracted.path()).unwrap();
        let expected = pseudo_library(1000 + i * 4096);

        assert_eq!(written.len(), expected.len());
        assert_eq!(written, expected);
        assert_eq!(extracted.size(), expected.len() as u64);
        assert!(std::ptr::eq(extracted.variant(), variant));

        let name = extracted.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(variant.resource_stem()), "{name}");
        assert!(name.ends_with(variant.file_suffix()), "{name}");
    }

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), catalog.variants().len());
}

#[test]
fn test_resolved_variant_extracts() {
    let platform = Platform::new(Os::Windows, Arch::X64);
    let tags: Tags = [("runtime".to_string(), "mingw".to_string())].into();
    let variant = resolve_for(
        &Catalog::builtin(),
        platform,
        "1.0.18",
        &tags,
        ResolvePolicy::RejectAmbiguous,
    )
    .unwrap();

    let source = MemoryResources::new().with(variant.resource_id, b"MZ mingw build".to_vec());
    let dir = tempfile::tempdir().unwrap();
    let extracted = Extractor::new(&source).in_dir(dir.path()).extract(variant).unwrap();

    assert_eq!(std::fs::read(extracted.path()).unwrap(), b"MZ mingw build");
    assert!(extracted.path().to_string_lossy().ends_with(".dll"));
}

#[test]
fn test_missing_resource_creates_no_file() {
    let variant = Catalog::builtin().iter().next().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let err = Extractor::new(&MemoryResources::new())
        .in_dir(dir.path())
        .extract(variant)
        .unwrap_err();

    assert!(matches!(err, NatriumError::ResourceNotFound(ref id) if id == variant.resource_id));
    assert!(err.is_environment());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_extract_into_missing_directory() {
    let variant = Catalog::builtin().iter().next().unwrap();
    let source = MemoryResources::new().with(variant.resource_id, vec![1, 2, 3]);
    let dir = tempfile::tempdir().unwrap();

    let err = Extractor::new(&source)
        .in_dir(dir.path().join("absent"))
        .extract(variant)
        .unwrap_err();
    assert!(err.is_io(), "{err}");
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_extracted_garbage_fails_to_open() {
    let variant = Catalog::builtin().iter().next().unwrap();
    let source = MemoryResources::new().with(variant.resource_id, b"\x7fELF but not really".to_vec());
    let dir = tempfile::tempdir().unwrap();

    let extracted = Extractor::new(&source).in_dir(dir.path()).extract(variant).unwrap();
    let err = LoadedLibrary::load_extracted(&extracted).unwrap_err();

    match err {
        NatriumError::LibraryOpen { path, .. } => assert_eq!(path, extracted.path()),
        other => panic!("expected LibraryOpen, got {other:?}"),
    }
}

#[test]
fn test_bootstrap_with_unknown_tags() {
    let mut config = LoaderConfig::default();
    config.tags.insert("runtime".into(), "gcc".into());
    config.tags.insert("runtime-version".into(), "13".into());

    let err = bootstrap(&config).unwrap_err();
    assert!(err.is_environment(), "{err}");
}

// ============================================================================
// Real libsodium
// ============================================================================

#[test]
fn test_real_library_roundtrip() {
    let Some(path) = libsodium_path() else {
        return;
    };

    let lib = LoadedLibrary::load_and_init(&path).unwrap();
    assert_eq!(lib.path(), Some(path.as_path()));
    assert!(lib.variant().is_none());

    let aead = lib.xchacha20poly1305();
    let key = AeadKey::new([0x42; 32]);
    let nonce = Nonce::from_bytes([0x24; 24]);
    let message = b"attack at dawn";

    let ciphertext = aead.encrypt(message, b"header", &nonce, &key).unwrap();
    assert_eq!(ciphertext.len(), message.len() + TAG_BYTES);
    assert_eq!(
        aead.decrypt(&ciphertext, b"header", &nonce, &key).as_deref(),
        Some(&message[..])
    );
    assert!(aead.decrypt(&ciphertext, b"other", &nonce, &key).is_none());

    // Second load in the same process sees the library already initialized
    let again = LoadedLibrary::load_and_init(&path).unwrap();
    assert_eq!(again.init_status(), InitStatus::AlreadyInitialized);
}

#[test]
fn test_real_library_matches_rustcrypto() {
    let Some(path) = libsodium_path() else {
        return;
    };

    let lib = LoadedLibrary::load_and_init(&path).unwrap();
    let key = AeadKey::new([7; 32]);
    let nonce = Nonce::from_bytes([9; 24]);

    let cipher = chacha20poly1305::XChaCha20Poly1305::new(key.as_bytes().into());
    for len in [0usize, 1, 15, 16, 17, 64, 4096] {
        let message = pseudo_library(len);
        let ours = lib
            .xchacha20poly1305()
            .encrypt(&message, b"aad", &nonce, &key)
            .unwrap();
        let theirs = cipher
            .encrypt(
                nonce.as_bytes().into(),
                Payload {
                    msg: &message,
                    aad: b"aad",
                },
            )
            .unwrap();
        assert_eq!(ours, theirs, "length {len}");
    }
}

#[test]
fn test_real_library_through_bootstrap() {
    let Some(path) = libsodium_path() else {
        return;
    };
    let Some(platform) = Platform::detect() else {
        return;
    };
    let config = LoaderConfig::default();
    let Ok(variant) = resolve_for(
        &Catalog::builtin(),
        platform,
        &config.version,
        &config.tags,
        config.policy(),
    ) else {
        return;
    };

    let native = tempfile::tempdir().unwrap();
    let extract = tempfile::tempdir().unwrap();
    std::fs::copy(&path, native.path().join(variant.resource_id)).unwrap();

    let config = LoaderConfig {
        native_dir: Some(native.path().to_path_buf()),
        extract_dir: Some(extract.path().to_path_buf()),
        ..config
    };
    let lib = bootstrap(&config).unwrap();

    assert!(std::ptr::eq(lib.variant().unwrap(), variant));
    assert!(lib.path().unwrap().starts_with(extract.path()));

    let key = AeadKey::new([1; 32]);
    let nonce = Nonce::from_bytes([2; 24]);
    let aead = lib.xchacha20poly1305();
    let ciphertext = aead.encrypt(b"through the pipeline", b"", &nonce, &key).unwrap();
    assert_eq!(
        aead.decrypt(&ciphertext, b"", &nonce, &key).as_deref(),
        Some(&b"through the pipeline"[..])
    );
}
