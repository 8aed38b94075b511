// ABOUTME: SSH public key fingerprint computation.
// ABOUTME: Produces the OpenSSH "SHA256:<base64>" form from the key's wire blob.

use crate::error::{Result, SshError};
use base64::Engine;
use sha2::{Digest, Sha256};
use ssh_key::PublicKey;

/// Compute the SHA256 fingerprint of a public key.
///
/// The digest covers the SSH wire encoding of the key (algorithm name and key
/// data as length-prefixed strings), the same bytes that appear base64 encoded
/// in an authorized-key line. The result is `SHA256:` followed by the
/// unpadded base64 of the digest, matching `ssh-keygen -l`.
///
/// # Errors
/// Returns `SshError::SerializeKey` if the key cannot be wire encoded.
pub fn compute_fingerprint(public_key: &PublicKey) -> Result<String> {
    let blob = public_key.to_bytes().map_err(SshError::SerializeKey)?;

    let mut hasher = Sha256::new();
    hasher.update(&blob);
    let hash = hasher.finalize();

    Ok(format!(
        "SHA256:{}",
        base64::engine::general_purpose::STANDARD_NO_PAD.encode(hash)
    ))
}
