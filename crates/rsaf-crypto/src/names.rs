//! Ciphertext-derived identifiers and the `.rsa` artifact store
//!
//! An artifact's name is the hex of its first 10 raw ciphertext bytes. This
//! is a filesystem-safe naming convenience, not a content hash: two
//! ciphertexts sharing a 10-byte prefix would collide (astronomically
//! unlikely for RSA output, but not structurally prevented), so it is never
//! an integrity or uniqueness guarantee.

use std::fs;
use std::path::{Path, PathBuf};

use rsaf_core::RsafResult;

pub const CIPHERTEXT_EXT: &str = "rsa";

const NAME_PREFIX_LEN: usize = 10;

/// Derive the store filename for a ciphertext payload.
pub fn ciphertext_name(ciphertext: &[u8]) -> String {
    let prefix = &ciphertext[..ciphertext.len().min(NAME_PREFIX_LEN)];
    format!("{}.{}", hex::encode(prefix), CIPHERTEXT_EXT)
}

/// Write a ciphertext into `dir` under its derived name, creating the
/// directory if needed. Returns the artifact path.
pub fn save_ciphertext(ciphertext: &[u8], dir: &Path) -> RsafResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(ciphertext_name(ciphertext));
    fs::write(&path, ciphertext)?;
    Ok(path)
}

pub fn load_ciphertext(path: &Path) -> RsafResult<Vec<u8>> {
    Ok(fs::read(path)?)
}

/// List `.rsa` artifacts in `dir`, sorted by name. A missing directory is an
/// empty store, not an error.
pub fn list_ciphertexts(dir: &Path) -> RsafResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut artifacts: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == CIPHERTEXT_EXT))
        .collect();
    artifacts.sort();
    Ok(artifacts)
}

mod hex {
    pub fn encode(data: &[u8]) -> String {
        let mut s = String::with_capacity(data.len() * 2);
        for byte in data {
            s.push_str(&format!("{:02x}", byte));
        }
        s
    }
}
