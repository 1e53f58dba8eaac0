//! rsaf-crypto: chunked RSA-OAEP file encryption (the RSAF container)
//!
//! RSA only encrypts messages shorter than its modulus, so whole files are
//! processed as a chain of fixed-size chunks, each masked by the previous
//! block's ciphertext before encryption (CBC reinterpreted around an
//! asymmetric block):
//!
//! ```text
//! [32-byte header][filename][E(seed)][C_0 = E(P_0 ⊕ seed)][C_1 = E(P_1 ⊕ C_0)]…
//! ```
//!
//! For a 2048-bit modulus each encrypted block is 256 bytes and carries at
//! most 190 plaintext bytes (OAEP/SHA-256 overhead). The header records the
//! exact original length, so final-block zero padding carries no information.
//!
//! Known gap: there is no MAC. Per-block OAEP failure plus the header's
//! length check are the only integrity signals; adding a tag would change
//! the on-disk format.

pub mod block;
pub mod engine;
pub mod header;
pub mod keys;
pub mod names;

pub use block::{decrypt_block, encrypt_block, BlockGeometry};
pub use engine::{decrypt_file, encrypt_file, DecryptReport, EncryptReport, ProgressFn};
pub use header::{validate_file, Metadata, HEADER_SIZE, RSAF_MAGIC, RSAF_VERSION};
pub use keys::{generate_keypair, Keyring};
pub use names::{ciphertext_name, list_ciphertexts, load_ciphertext, save_ciphertext};

#[cfg(test)]
pub(crate) mod testutil;
