use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level rsaf configuration (loaded from rsaf.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RsafConfig {
    pub keys: KeyConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// PEM-encoded public key (SPKI)
    pub public_key: PathBuf,
    /// PEM-encoded private key (PKCS#8)
    pub private_key: PathBuf,
    /// RSA modulus size in bits used by `keygen` (default: 2048)
    pub modulus_bits: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory for `.rsa` ciphertext artifacts
    pub dir: PathBuf,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            public_key: PathBuf::from("~/.config/rsaf/public.pem"),
            private_key: PathBuf::from("~/.config/rsaf/private.pem"),
            modulus_bits: 2048,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("~/.local/share/rsaf/store"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[keys]
public_key = "/tmp/pub.pem"
private_key = "/tmp/priv.pem"
modulus_bits = 4096

[store]
dir = "/var/lib/rsaf"
"#;
        let config: RsafConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.keys.public_key, PathBuf::from("/tmp/pub.pem"));
        assert_eq!(config.keys.private_key, PathBuf::from("/tmp/priv.pem"));
        assert_eq!(config.keys.modulus_bits, 4096);
        assert_eq!(config.store.dir, PathBuf::from("/var/lib/rsaf"));
    }

    #[test]
    fn test_parse_defaults() {
        let config: RsafConfig = toml::from_str("").unwrap();

        assert_eq!(config.keys.modulus_bits, 2048);
        assert_eq!(
            config.keys.public_key,
            PathBuf::from("~/.config/rsaf/public.pem")
        );
        assert_eq!(config.store.dir, PathBuf::from("~/.local/share/rsaf/store"));
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[keys]
modulus_bits = 3072
"#;
        let config: RsafConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.keys.modulus_bits, 3072);
        // Defaults
        assert_eq!(
            config.keys.private_key,
            PathBuf::from("~/.config/rsaf/private.pem")
        );
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = RsafConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: RsafConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.keys.public_key, parsed.keys.public_key);
        assert_eq!(config.store.dir, parsed.store.dir);
    }
}
