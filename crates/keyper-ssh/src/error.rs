// ABOUTME: Error types for SSH key operations using thiserror.
// ABOUTME: Provides typed errors for key generation, encoding, file output and hardware tokens.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while producing SSH key material.
#[derive(Error, Debug)]
pub enum SshError {
    /// The requested algorithm token is not in the catalog.
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// The requested size is not valid for the algorithm.
    #[error("unsupported {algorithm} key size: {bits}")]
    UnsupportedKeySize { algorithm: String, bits: u32 },

    /// Failed to generate an SSH key.
    #[error("failed to generate {algorithm} key: {source}")]
    GenerateKey {
        algorithm: String,
        #[source]
        source: ssh_key::Error,
    },

    /// The RSA primitive refused to produce a key.
    #[error("failed to generate RSA key: {0}")]
    GenerateRsa(#[source] rsa::Error),

    /// Failed to serialize a key.
    #[error("failed to serialize key: {0}")]
    SerializeKey(#[source] ssh_key::Error),

    /// Failed to encrypt a private key with the passphrase.
    #[error("failed to encrypt private key: {0}")]
    EncryptKey(#[source] ssh_key::Error),

    /// Failed to create the directory a key file goes in.
    #[error("failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a key file to disk.
    #[error("failed to write key to {path}: {source}")]
    WriteKey {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to set file permissions.
    #[error("failed to set permissions on {path}: {source}")]
    SetPermissions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No compatible hardware token was found.
    #[error("no compatible hardware token found")]
    TokenNotFound,

    /// The hardware token cannot produce the requested key.
    #[error("hardware token does not support {0} keys")]
    TokenUnsupported(String),

    /// The hardware token reported a failure.
    #[error("hardware token error: {0}")]
    Token(String),

    /// Reading the management PIN failed.
    #[error("could not get management PIN: {0}")]
    Pin(#[source] std::io::Error),
}

/// Result type alias using SshError.
pub type Result<T> = std::result::Result<T, SshError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn test_unsupported_key_type_error_display() {
        let err = SshError::UnsupportedKeyType("dsa".to_string());
        let display = format!("{}", err);
        assert!(display.contains("unsupported key type"));
        assert!(display.contains("dsa"));
    }

    #[test]
    fn test_unsupported_key_size_error_display() {
        let err = SshError::UnsupportedKeySize {
            algorithm: "ECDSA".to_string(),
            bits: 300,
        };
        assert_eq!(err.to_string(), "unsupported ECDSA key size: 300");
    }

    #[test]
    fn test_generate_key_error_display() {
        let err = SshError::GenerateKey {
            algorithm: "Ed25519".to_string(),
            source: ssh_key::Error::AlgorithmUnknown,
        };
        let display = format!("{}", err);
        assert!(display.contains("failed to generate Ed25519 key"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_write_key_error_display() {
        let err = SshError::WriteKey {
            path: PathBuf::from("/path/to/key"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
        };
        let display = format!("{}", err);
        assert!(display.contains("failed to write key"));
        assert!(display.contains("/path/to/key"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_set_permissions_error_display() {
        let err = SshError::SetPermissions {
            path: PathBuf::from("/path/to/key"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
        };
        assert!(err.to_string().contains("failed to set permissions"));
    }

    #[test]
    fn test_pin_error_keeps_source() {
        let err = SshError::Pin(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
        assert!(err.to_string().contains("management PIN"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_token_errors_have_no_source() {
        assert!(SshError::TokenNotFound.source().is_none());
        assert!(SshError::TokenUnsupported("ed25519-sk".into()).source().is_none());
        assert_eq!(
            SshError::TokenUnsupported("ed25519-sk".into()).to_string(),
            "hardware token does not support ed25519-sk keys"
        );
    }
}
