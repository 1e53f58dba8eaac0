use thiserror::Error;

pub type RsafResult<T> = Result<T, RsafError>;

#[derive(Debug, Error)]
pub enum RsafError {
    /// Not a recognized RSAF file: short header, bad magic, unsupported
    /// version, or a filename field running past end-of-file.
    #[error("invalid RSAF file: {0}")]
    Format(String),

    /// An operation needed a key that the keyring does not hold.
    #[error("no {0} key loaded")]
    KeyMissing(&'static str),

    /// A ciphertext block could not be inverted (wrong key or corrupted
    /// block). Fatal for the current file; partial output is not trusted.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Recovered plaintext length disagrees with the header's file size.
    #[error("integrity failure: recovered {actual} bytes, header declares {expected}")]
    Integrity { expected: u64, actual: u64 },

    /// A value does not fit its header field (filename length, block count).
    #[error("header encoding error: {0}")]
    Encoding(String),

    /// Key generation or PEM serialization/parsing failure.
    #[error("key error: {0}")]
    Key(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
