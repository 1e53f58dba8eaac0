//! RSA keypair generation, PEM persistence, and the keyring

use rand::rngs::OsRng;
use rsa::pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding,
};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::path::Path;
use tracing::debug;

use rsaf_core::{RsafError, RsafResult};

pub const DEFAULT_MODULUS_BITS: usize = 2048;

/// Generate an RSA keypair (public exponent 65537).
pub fn generate_keypair(bits: usize) -> RsafResult<(RsaPrivateKey, RsaPublicKey)> {
    let private = RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| RsafError::Key(format!("keypair generation failed: {e}")))?;
    let public = RsaPublicKey::from(&private);
    Ok((private, public))
}

/// Write the private key as PKCS#8 PEM. Owner-only permissions on Unix.
pub fn save_private_key(key: &RsaPrivateKey, path: &Path) -> RsafResult<()> {
    let pem = key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| RsafError::Key(format!("PKCS#8 encoding failed: {e}")))?;
    std::fs::write(path, pem.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

/// Write the public key as SPKI PEM.
pub fn save_public_key(key: &RsaPublicKey, path: &Path) -> RsafResult<()> {
    let pem = key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| RsafError::Key(format!("SPKI encoding failed: {e}")))?;
    std::fs::write(path, pem.as_bytes())?;
    Ok(())
}

pub fn load_private_key(path: &Path) -> RsafResult<RsaPrivateKey> {
    let pem = std::fs::read_to_string(path)?;
    RsaPrivateKey::from_pkcs8_pem(&pem)
        .map_err(|e| RsafError::Key(format!("parsing {}: {e}", path.display())))
}

pub fn load_public_key(path: &Path) -> RsafResult<RsaPublicKey> {
    let pem = std::fs::read_to_string(path)?;
    RsaPublicKey::from_public_key_pem(&pem)
        .map_err(|e| RsafError::Key(format!("parsing {}: {e}", path.display())))
}

/// Holder for the configured key material. Either half may be absent;
/// accessors fail with `KeyMissing` so callers can prompt for key setup
/// instead of unwrapping options everywhere.
#[derive(Default)]
pub struct Keyring {
    private: Option<RsaPrivateKey>,
    public: Option<RsaPublicKey>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh keypair and hold both halves.
    pub fn generate(&mut self, bits: usize) -> RsafResult<()> {
        let (private, public) = generate_keypair(bits)?;
        self.private = Some(private);
        self.public = Some(public);
        Ok(())
    }

    pub fn public(&self) -> RsafResult<&RsaPublicKey> {
        self.public.as_ref().ok_or(RsafError::KeyMissing("public"))
    }

    pub fn private(&self) -> RsafResult<&RsaPrivateKey> {
        self.private
            .as_ref()
            .ok_or(RsafError::KeyMissing("private"))
    }

    pub fn has_public(&self) -> bool {
        self.public.is_some()
    }

    pub fn has_private(&self) -> bool {
        self.private.is_some()
    }

    /// Load a PKCS#8 private key; the public half is derived from it.
    pub fn load_private(&mut self, path: &Path) -> RsafResult<()> {
        let private = load_private_key(path)?;
        debug!(path = %path.display(), "loaded private key");
        self.public = Some(RsaPublicKey::from(&private));
        self.private = Some(private);
        Ok(())
    }

    /// Load an SPKI public key. Leaves any private half untouched.
    pub fn load_public(&mut self, path: &Path) -> RsafResult<()> {
        self.public = Some(load_public_key(path)?);
        debug!(path = %path.display(), "loaded public key");
        Ok(())
    }

    pub fn save(&self, private_path: &Path, public_path: &Path) -> RsafResult<()> {
        save_private_key(self.private()?, private_path)?;
        save_public_key(self.public()?, public_path)?;
        Ok(())
    }
}

impl std::fmt::Debug for Keyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyring")
            .field("private", &self.private.as_ref().map(|_| "[REDACTED]"))
            .field("public", &self.public.is_some())
            .finish()
    }
}
