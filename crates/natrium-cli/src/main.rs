//! natrium CLI
//!
//! Inspect the native libsodium catalog, extract builds, and encrypt or
//! decrypt files with XChaCha20-Poly1305.

mod config;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use natrium_core::resources::EmbeddedResources;
use natrium_core::{
    AVAILABLE_VERSIONS, AeadKey, Catalog, Extractor, LoaderConfig, Nonce, Platform, Variant,
    platform::{detect_arch, detect_os},
    resolve_for,
};
use std::path::PathBuf;
use zeroize::Zeroizing;

use config::Config;

/// natrium - prebuilt libsodium loader and AEAD tool
#[derive(Parser)]
#[command(name = "natrium")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Variant selection overrides
#[derive(Args)]
struct SelectArgs {
    /// Library version
    #[arg(long)]
    version: Option<String>,

    /// Required runtime tag (repeatable)
    #[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_tag_arg)]
    tags: Vec<(String, String)>,

    /// Fail if more than one variant matches
    #[arg(long)]
    strict: bool,
}

/// Key material and associated data
#[derive(Args)]
struct CipherArgs {
    /// 32-byte key (hex)
    #[arg(long)]
    key: String,

    /// 24-byte nonce (hex)
    #[arg(long)]
    nonce: String,

    /// Additional authenticated data
    #[arg(long, default_value = "")]
    aad: String,

    /// Input file
    input: PathBuf,

    /// Output file
    output: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog versions and their builds
    Versions,

    /// Show the detected host platform
    Platform,

    /// Resolve the build for this host
    Resolve {
        #[command(flatten)]
        select: SelectArgs,
    },

    /// Extract the build for this host to a file
    Extract {
        #[command(flatten)]
        select: SelectArgs,

        /// Directory to extract into
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Generate a random key and nonce
    Keygen,

    /// Encrypt a file
    Encrypt {
        #[command(flatten)]
        cipher: CipherArgs,
    },

    /// Decrypt a file
    Decrypt {
        #[command(flatten)]
        cipher: CipherArgs,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load_or_default()?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose {
            "debug"
        } else {
            config.logging.level.as_str()
        })
        .init();

    config.validate()?;

    match cli.command {
        Commands::Versions => list_versions(),
        Commands::Platform => show_platform(),
        Commands::Resolve { select } => resolve_variant(&select.apply(&config.loader))?,
        Commands::Extract { select, out_dir } => {
            let mut loader = select.apply(&config.loader);
            if out_dir.is_some() {
                loader.extract_dir = out_dir;
            }
            extract_variant(&loader)?;
        }
        Commands::Keygen => generate_key(),
        Commands::Encrypt { cipher } => encrypt_file(&cipher, config.loader)?,
        Commands::Decrypt { cipher } => decrypt_file(&cipher, config.loader)?,
    }

    Ok(())
}

impl SelectArgs {
    /// Overlay command-line selection onto the configured loader settings
    fn apply(&self, base: &LoaderConfig) -> LoaderConfig {
        let mut config = base.clone();
        if let Some(version) = &self.version {
            config.version.clone_from(version);
        }
        if !self.tags.is_empty() {
            config.tags = self.tags.iter().cloned().collect();
        }
        config.strict |= self.strict;
        config
    }
}

fn parse_tag_arg(s: &str) -> Result<(String, String), String> {
    natrium_core::config::parse_tag(s).map_err(|e| e.to_string())
}

/// List catalog versions and their builds
fn list_versions() {
    let catalog = Catalog::builtin();

    for version in AVAILABLE_VERSIONS.iter() {
        println!("{version}");
        for variant in catalog.iter().filter(|v| v.version == *version) {
            println!("  {:<12} {}", variant.platform().to_string(), variant.resource_id);
        }
    }

    println!();
    let embedded = EmbeddedResources.names();
    if embedded.is_empty() {
        println!("Embedded: none (set loader.native_dir to load from a directory)");
    }
    for name in embedded {
        println!("Embedded: {}", describe_resource(&catalog, name));
    }
}

fn describe_resource(catalog: &Catalog, name: &str) -> String {
    match catalog.by_resource_id(name) {
        Some(variant) => format!("{name} ({} on {})", variant.version, variant.platform()),
        None => format!("{name} (not in catalog)"),
    }
}

fn format_tags(variant: &Variant) -> String {
    variant
        .tag_map()
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Show the detected host platform
fn show_platform() {
    println!("OS:   {} ({})", display_or_unknown(detect_os()), std::env::consts::OS);
    println!(
        "Arch: {} ({})",
        display_or_unknown(detect_arch()),
        std::env::consts::ARCH
    );

    match Platform::detect() {
        Some(platform) => {
            let count = Catalog::builtin()
                .iter()
                .filter(|v| v.platform() == platform)
                .count();
            println!("Catalog builds for {platform}: {count}");
        }
        None => println!("This host is not supported by the catalog"),
    }
}

fn display_or_unknown<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

fn select_variant(loader: &LoaderConfig) -> anyhow::Result<&'static Variant> {
    loader.validate()?;
    let platform = Platform::current()?;
    Ok(resolve_for(
        &Catalog::builtin(),
        platform,
        &loader.version,
        &loader.tags,
        loader.policy(),
    )?)
}

/// Resolve the build for this host
fn resolve_variant(loader: &LoaderConfig) -> anyhow::Result<()> {
    let variant = select_variant(loader)?;

    println!("Resource: {}", variant.resource_id);
    println!("Version:  {}", variant.version);
    println!("Platform: {}", variant.platform());
    println!("Suffix:   {}", variant.file_suffix());
    if !variant.tags.is_empty() {
        println!("Tags:     {}", format_tags(variant));
    }

    Ok(())
}

/// Extract the build for this host to a file
fn extract_variant(loader: &LoaderConfig) -> anyhow::Result<()> {
    let variant = select_variant(loader)?;

    let source = loader.resource_source();
    let mut extractor = Extractor::new(source.as_ref());
    if let Some(dir) = &loader.extract_dir {
        std::fs::create_dir_all(dir)?;
        extractor = extractor.in_dir(dir);
    }

    let extracted = extractor.extract(variant)?;
    println!("{}", extracted.path().display());
    tracing::info!("Extracted {} bytes", extracted.size());

    Ok(())
}

/// Generate a random key and nonce
fn generate_key() {
    let mut rng = rand_core::OsRng;
    let key = AeadKey::generate(&mut rng);
    let nonce = Nonce::generate(&mut rng);

    println!("Key:   {}", hex::encode(key.as_bytes()));
    println!("Nonce: {}", hex::encode(nonce.as_bytes()));
    println!("\n⚠️  Never reuse a nonce with the same key.");
}

fn parse_key(hex_key: &str) -> anyhow::Result<AeadKey> {
    let bytes = Zeroizing::new(hex::decode(hex_key.trim()).context("Key is not valid hex")?);
    Ok(AeadKey::from_slice(&bytes)?)
}

fn parse_nonce(hex_nonce: &str) -> anyhow::Result<Nonce> {
    let bytes = hex::decode(hex_nonce.trim()).context("Nonce is not valid hex")?;
    Ok(Nonce::from_slice(&bytes)?)
}

/// Encrypt a file
fn encrypt_file(args: &CipherArgs, loader: LoaderConfig) -> anyhow::Result<()> {
    let key = parse_key(&args.key)?;
    let nonce = parse_nonce(&args.nonce)?;
    let message = Zeroizing::new(
        std::fs::read(&args.input)
            .with_context(|| format!("Failed to read {}", args.input.display()))?,
    );

    natrium_core::global::configure(loader)?;
    let ciphertext = natrium_core::encrypt(&message, args.aad.as_bytes(), &nonce, &key)?;

    std::fs::write(&args.output, &ciphertext)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    tracing::info!(
        "Encrypted {} bytes into {}",
        message.len(),
        args.output.display()
    );

    Ok(())
}

/// Decrypt a file
fn decrypt_file(args: &CipherArgs, loader: LoaderConfig) -> anyhow::Result<()> {
    let key = parse_key(&args.key)?;
    let nonce = parse_nonce(&args.nonce)?;
    let ciphertext = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    natrium_core::global::configure(loader)?;
    let Some(plaintext) = natrium_core::decrypt(&ciphertext, args.aad.as_bytes(), &nonce, &key)?
    else {
        anyhow::bail!("Decryption failed");
    };
    let plaintext = Zeroizing::new(plaintext);

    std::fs::write(&args.output, plaintext.as_slice())
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    tracing::info!("Decrypted into {}", args.output.display());

    Ok(())
}
