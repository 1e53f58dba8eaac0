//! Shared test keys. RSA keygen is slow, so each keypair is generated once
//! per test process.

use rand::rngs::OsRng;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::sync::OnceLock;

static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
static OTHER_KEY: OnceLock<RsaPrivateKey> = OnceLock::new();

pub fn private_key() -> &'static RsaPrivateKey {
    KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 2048).expect("test keypair"))
}

pub fn public_key() -> RsaPublicKey {
    RsaPublicKey::from(private_key())
}

/// A second keypair, guaranteed not to match `private_key()`.
pub fn other_private_key() -> &'static RsaPrivateKey {
    OTHER_KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 2048).expect("test keypair"))
}
