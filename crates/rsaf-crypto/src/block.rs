//! Single-block RSA-OAEP encrypt/decrypt
//!
//! The block primitive turns at most `max_chunk_size` plaintext bytes into
//! exactly `encrypted_block_size` ciphertext bytes (the modulus size).
//! OAEP re-randomizes on every call, so ciphertext is not a deterministic
//! function of plaintext.

use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use rsaf_core::{RsafError, RsafResult};

/// OAEP overhead per block: 2 * SHA-256 output + 2
const OAEP_OVERHEAD: usize = 2 * 32 + 2;

/// Block sizes for a given key: 256/190 for a 2048-bit modulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGeometry {
    /// Fixed ciphertext block size (modulus size in bytes)
    pub encrypted_block_size: usize,
    /// Maximum plaintext bytes a single block can carry
    pub max_chunk_size: usize,
}

impl BlockGeometry {
    pub fn for_key(key: &impl PublicKeyParts) -> Self {
        let modulus = key.size();
        Self {
            encrypted_block_size: modulus,
            max_chunk_size: modulus - OAEP_OVERHEAD,
        }
    }
}

/// Encrypt one block with OAEP-SHA256 under the recipient's public key.
pub fn encrypt_block(public_key: &RsaPublicKey, plaintext: &[u8]) -> RsafResult<Vec<u8>> {
    let geometry = BlockGeometry::for_key(public_key);
    if plaintext.len() > geometry.max_chunk_size {
        return Err(RsafError::Encoding(format!(
            "block plaintext too long: {} bytes (limit {})",
            plaintext.len(),
            geometry.max_chunk_size
        )));
    }

    public_key
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|e| RsafError::Key(format!("OAEP encryption failed: {e}")))
}

/// Decrypt one block. Fails for ciphertext not produced under the matching
/// public key, and for any tampered block (OAEP rejects it outright).
pub fn decrypt_block(private_key: &RsaPrivateKey, ciphertext: &[u8]) -> RsafResult<Vec<u8>> {
    private_key
        .decrypt(Oaep::new::<Sha256>(), ciphertext)
        .map_err(|e| RsafError::Decryption(e.to_string()))
}
