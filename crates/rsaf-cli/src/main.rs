//! rsaf: RSAF chunked RSA file encryption CLI
//!
//! Commands:
//!   keygen           - generate an RSA keypair and write PEM files
//!   encrypt <file>   - encrypt a file into an RSAF container
//!   decrypt <file>   - recover the original file from a container
//!   list             - list artifacts in the configured store
//!   inspect <file>   - print container metadata without decrypting

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

use rsaf_core::config::RsafConfig;
use rsaf_crypto::engine::ProgressFn;
use rsaf_crypto::keys::Keyring;
use rsaf_crypto::{ciphertext_name, list_ciphertexts, load_ciphertext, validate_file, HEADER_SIZE};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "rsaf",
    version,
    about = "Chunked RSA file encryption",
    long_about = "rsaf: encrypt whole files with an RSA keypair using the chained RSAF container format"
)]
struct Cli {
    /// Path to rsaf.toml configuration file
    #[arg(long, short = 'c', env = "RSAF_CONFIG", default_value = "~/.config/rsaf/config.toml")]
    config: PathBuf,

    /// Log filter (RUST_LOG overrides)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an RSA keypair and write it as PEM files
    Keygen {
        /// Modulus size in bits (overrides config)
        #[arg(long)]
        bits: Option<usize>,
        /// Overwrite existing key files
        #[arg(long)]
        force: bool,
    },

    /// Encrypt a file into an RSAF container
    Encrypt {
        /// File to encrypt
        source: PathBuf,
        /// Output path (default: <source>.rsa next to the source)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Public key PEM (overrides config)
        #[arg(long, env = "RSAF_PUBLIC_KEY")]
        key: Option<PathBuf>,
        /// Place the artifact in the configured store directory under its
        /// ciphertext-derived name instead of next to the source
        #[arg(long, conflicts_with = "output")]
        store: bool,
    },

    /// Decrypt an RSAF container
    Decrypt {
        /// Encrypted container, or an artifact name with --store
        source: PathBuf,
        /// Output path (default: the embedded original filename, in the
        /// current directory)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Private key PEM (overrides config)
        #[arg(long, env = "RSAF_PRIVATE_KEY")]
        key: Option<PathBuf>,
        /// Resolve <SOURCE> as an artifact name in the configured store
        #[arg(long)]
        store: bool,
    },

    /// List artifacts in the configured store
    List,

    /// Print container metadata without decrypting
    Inspect {
        /// Candidate RSAF file
        file: PathBuf,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    let config = load_config(&expand_tilde(&cli.config))?;

    match cli.command {
        Commands::Keygen { bits, force } => cmd_keygen(&config, bits, force),
        Commands::Encrypt { source, output, key, store } => {
            cmd_encrypt(&config, &source, output.as_deref(), key.as_deref(), store)
        }
        Commands::Decrypt { source, output, key, store } => {
            cmd_decrypt(&config, &source, output.as_deref(), key.as_deref(), store)
        }
        Commands::List => cmd_list(&config),
        Commands::Inspect { file, json } => cmd_inspect(&file, json),
    }
}

fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

// ── Config loading ────────────────────────────────────────────────────────────

fn load_config(path: &Path) -> Result<RsafConfig> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config: {}", path.display()))
    } else {
        tracing::debug!("config file not found: {} (using defaults)", path.display());
        Ok(RsafConfig::default())
    }
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if s.starts_with("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(format!("{}/{}", home, &s[2..]))
    } else {
        path.to_path_buf()
    }
}

// ── Progress bar helpers ──────────────────────────────────────────────────────

fn make_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "{prefix:.bold} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}",
        )
        .unwrap()
        .progress_chars("=>-"),
    );
    pb.set_prefix(prefix.to_string());
    pb
}

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}").unwrap());
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ── `rsaf keygen` ─────────────────────────────────────────────────────────────

fn cmd_keygen(config: &RsafConfig, bits: Option<usize>, force: bool) -> Result<()> {
    let private_path = expand_tilde(&config.keys.private_key);
    let public_path = expand_tilde(&config.keys.public_key);
    let bits = bits.unwrap_or(config.keys.modulus_bits);

    if !force && (private_path.exists() || public_path.exists()) {
        anyhow::bail!(
            "key files already exist ({} / {}) — use --force to overwrite",
            private_path.display(),
            public_path.display()
        );
    }

    if let Some(parent) = private_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating key directory: {}", parent.display()))?;
    }

    let pb = make_spinner("keygen");
    pb.set_message(format!("generating {bits}-bit RSA keypair..."));

    let mut keyring = Keyring::new();
    keyring.generate(bits).context("generating keypair")?;
    keyring
        .save(&private_path, &public_path)
        .context("writing key files")?;

    pb.finish_with_message("done");
    println!("Keypair written:");
    println!("  private: {}", private_path.display());
    println!("  public:  {}", public_path.display());

    Ok(())
}

// ── `rsaf encrypt` ────────────────────────────────────────────────────────────

fn cmd_encrypt(
    config: &RsafConfig,
    source: &Path,
    output: Option<&Path>,
    key: Option<&Path>,
    store: bool,
) -> Result<()> {
    let key_path = key
        .map(Path::to_path_buf)
        .unwrap_or_else(|| expand_tilde(&config.keys.public_key));
    if !key_path.exists() {
        anyhow::bail!(
            "public key not found: {} — run `rsaf keygen` first",
            key_path.display()
        );
    }

    let mut keyring = Keyring::new();
    keyring
        .load_public(&key_path)
        .with_context(|| format!("loading public key: {}", key_path.display()))?;

    let dest = match output {
        Some(p) => p.to_path_buf(),
        None => {
            let mut name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "output".into());
            name.push_str(".rsa");
            source.with_file_name(name)
        }
    };
    if dest.exists() {
        anyhow::bail!("output already exists: {}", dest.display());
    }

    let size = std::fs::metadata(source)
        .with_context(|| format!("reading source: {}", source.display()))?
        .len();
    let pb = make_progress_bar(size, "encrypt");
    let pb_clone = pb.clone();
    let progress: ProgressFn = Box::new(move |done, total| {
        pb_clone.set_length(total);
        pb_clone.set_position(done);
    });

    let result = rsaf_crypto::encrypt_file(source, &dest, keyring.public()?, Some(&progress));
    if result.is_err() {
        // partial output is never valid
        let _ = std::fs::remove_file(&dest);
    }
    let report = result.with_context(|| format!("encrypting {}", source.display()))?;
    pb.finish_with_message("done");

    let final_path = if store {
        let store_dir = expand_tilde(&config.store.dir);
        move_into_store(&dest, &store_dir).context("moving artifact into store")?
    } else {
        dest
    };

    println!("Encrypted:");
    println!("  output: {}", final_path.display());
    println!("  blocks: {} (+1 seed block)", report.blocks);
    println!("  bytes:  {}", fmt_bytes(report.bytes));

    Ok(())
}

/// Rename a fresh container into the store directory under the name derived
/// from its first ciphertext block.
fn move_into_store(path: &Path, store_dir: &Path) -> Result<PathBuf> {
    let meta = validate_file(path).context("artifact failed validation")?;
    let mut prefix = [0u8; 10];
    {
        use std::io::{Read, Seek, SeekFrom};
        let mut file = std::fs::File::open(path)?;
        file.seek(SeekFrom::Start(HEADER_SIZE as u64 + meta.filename_len as u64))?;
        file.read_exact(&mut prefix)?;
    }

    std::fs::create_dir_all(store_dir)?;
    let target = store_dir.join(ciphertext_name(&prefix));
    std::fs::rename(path, &target)
        .with_context(|| format!("renaming into {}", store_dir.display()))?;
    Ok(target)
}

// ── `rsaf decrypt` ────────────────────────────────────────────────────────────

fn cmd_decrypt(
    config: &RsafConfig,
    source: &Path,
    output: Option<&Path>,
    key: Option<&Path>,
    store: bool,
) -> Result<()> {
    let source = if store {
        expand_tilde(&config.store.dir).join(source)
    } else {
        source.to_path_buf()
    };
    let source = source.as_path();

    let key_path = key
        .map(Path::to_path_buf)
        .unwrap_or_else(|| expand_tilde(&config.keys.private_key));
    if !key_path.exists() {
        anyhow::bail!(
            "private key not found: {} — run `rsaf keygen` first",
            key_path.display()
        );
    }

    let mut keyring = Keyring::new();
    keyring
        .load_private(&key_path)
        .with_context(|| format!("loading private key: {}", key_path.display()))?;

    // cheap pre-flight before any decryption cost
    let meta = validate_file(source)
        .with_context(|| format!("{} is not an RSAF file", source.display()))?;

    let dest = match output {
        Some(p) => p.to_path_buf(),
        // only the final component: a hostile container must not name a
        // path outside the current directory
        None => Path::new(&meta.filename)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("decrypted.out")),
    };
    if dest.exists() {
        anyhow::bail!("output already exists: {}", dest.display());
    }

    let pb = make_progress_bar(meta.file_size, "decrypt");
    let pb_clone = pb.clone();
    let progress: ProgressFn = Box::new(move |done, total| {
        pb_clone.set_length(total);
        pb_clone.set_position(done);
    });

    let result = rsaf_crypto::decrypt_file(source, &dest, keyring.private()?, Some(&progress));
    if result.is_err() {
        let _ = std::fs::remove_file(&dest);
    }
    let report = result.with_context(|| format!("decrypting {}", source.display()))?;
    pb.finish_with_message("done");

    println!("Decrypted:");
    println!("  output:   {}", dest.display());
    println!("  original: {}", report.filename);
    println!("  bytes:    {}", fmt_bytes(report.size));

    Ok(())
}

// ── `rsaf list` ───────────────────────────────────────────────────────────────

fn cmd_list(config: &RsafConfig) -> Result<()> {
    let store_dir = expand_tilde(&config.store.dir);
    let artifacts = list_ciphertexts(&store_dir)
        .with_context(|| format!("listing store: {}", store_dir.display()))?;

    if artifacts.is_empty() {
        println!("store is empty: {}", store_dir.display());
        return Ok(());
    }

    println!("{}", store_dir.display());
    for path in &artifacts {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let container = load_ciphertext(path)
            .with_context(|| format!("reading artifact: {}", path.display()))?;
        match validate_file(path) {
            Some(meta) => println!(
                "  {}  {:>10}  {} ({})",
                name,
                fmt_bytes(container.len() as u64),
                meta.filename,
                fmt_bytes(meta.file_size)
            ),
            None => println!(
                "  {}  {:>10}  (not an RSAF container)",
                name,
                fmt_bytes(container.len() as u64)
            ),
        }
    }

    Ok(())
}

// ── `rsaf inspect` ────────────────────────────────────────────────────────────

fn cmd_inspect(file: &Path, json: bool) -> Result<()> {
    let meta = match validate_file(file) {
        Some(meta) => meta,
        None => {
            eprintln!("{}: not a recognized RSAF file", file.display());
            std::process::exit(1);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&meta)?);
    } else {
        println!("{}", file.display());
        println!("  version:    {}", meta.version);
        println!("  filename:   {}", meta.filename);
        println!("  plaintext:  {}", fmt_bytes(meta.file_size));
        println!("  blocks:     {} (+1 seed block)", meta.block_count);
        println!("  container:  {}", fmt_bytes(meta.total_size));
    }

    Ok(())
}

// ── Utilities ─────────────────────────────────────────────────────────────────

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
