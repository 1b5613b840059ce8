use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Shared-library extensions picked up from the native directory.
const LIBRARY_EXTENSIONS: &[&str] = &["so", "dylib", "dll"];

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let native_dir = native_dir();

    let mut entries = Vec::new();
    if let Ok(dir) = fs::read_dir(&native_dir) {
        for entry in dir.flatten() {
            let path = entry.path();
            if path.is_file() && is_library(&path) {
                entries.push(path);
            }
        }
    }
    entries.sort();

    let mut generated = String::from("pub(crate) static EMBEDDED: &[(&str, &[u8])] = &[\n");
    for path in &entries {
        let name = path.file_name().unwrap().to_string_lossy();
        let absolute = fs::canonicalize(path).unwrap();
        writeln!(
            generated,
            "    ({:?}, include_bytes!({:?})),",
            name,
            absolute.display().to_string()
        )
        .unwrap();
    }
    generated.push_str("];\n");

    fs::write(out_dir.join("embedded_resources.rs"), generated).unwrap();

    println!("cargo:rerun-if-changed={}", native_dir.display());
    println!("cargo:rerun-if-env-changed=NATRIUM_NATIVE_DIR");
    if !entries.is_empty() {
        println!(
            "cargo:warning=Embedded {} native libraries from {}",
            entries.len(),
            native_dir.display()
        );
    }
}

fn native_dir() -> PathBuf {
    if let Ok(dir) = env::var("NATRIUM_NATIVE_DIR") {
        PathBuf::from(dir)
    } else {
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap()).join("native")
    }
}

fn is_library(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| LIBRARY_EXTENSIONS.contains(&ext))
}
