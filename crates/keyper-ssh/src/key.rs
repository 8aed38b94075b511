// ABOUTME: SSH key generation and persistence.
// ABOUTME: Builds key material per algorithm, encodes it in OpenSSH formats and writes key files.

use crate::algorithm::{KeyAlgorithm, ECDSA_CURVES};
use crate::error::{Result, SshError};
use crate::fingerprint::compute_fingerprint;
use crate::hardware::{generate_on_token, PinEntry, TokenKeySpec, TokenProvider};
use ssh_key::private::{KeypairData, RsaKeypair};
use ssh_key::{Algorithm, EcdsaCurve, LineEnding, PrivateKey, PublicKey};
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Key material produced for one request.
///
/// Software keys carry the private half; hardware keys only ever expose the
/// public half.
#[derive(Debug, Clone)]
pub enum KeyMaterial {
    Rsa(PrivateKey),
    Ecdsa(PrivateKey),
    Ed25519(PrivateKey),
    HardwarePublic(PublicKey),
}

/// Encoding of key material into OpenSSH text formats.
pub trait KeyEncoding {
    /// Authorized-key line: `<algorithm> <base64> <comment>`, no trailing newline.
    fn encode_public(&self, comment: &str) -> Result<String>;

    /// OpenSSH private key container, encrypted when `passphrase` is non-empty.
    ///
    /// `None` when there is no exportable private key.
    fn encode_private(&self, comment: &str, passphrase: &str)
        -> Result<Option<Zeroizing<String>>>;
}

impl KeyMaterial {
    /// Generate fresh key material.
    ///
    /// `bits` must already have been validated for `algorithm`.
    pub fn generate(
        algorithm: KeyAlgorithm,
        bits: u32,
        tokens: &dyn TokenProvider,
        pin: &dyn PinEntry,
    ) -> Result<Self> {
        let mut rng = rand::thread_rng();

        match algorithm {
            KeyAlgorithm::Rsa => {
                let private = rsa::RsaPrivateKey::new(&mut rng, bits as usize)
                    .map_err(SshError::GenerateRsa)?;
                let keypair = RsaKeypair::try_from(private).map_err(|e| SshError::GenerateKey {
                    algorithm: algorithm.short().to_string(),
                    source: e,
                })?;
                let key = PrivateKey::new(KeypairData::from(keypair), "").map_err(|e| {
                    SshError::GenerateKey {
                        algorithm: algorithm.short().to_string(),
                        source: e,
                    }
                })?;
                Ok(KeyMaterial::Rsa(key))
            }
            KeyAlgorithm::Ecdsa => {
                let curve = match bits {
                    256 => EcdsaCurve::NistP256,
                    384 => EcdsaCurve::NistP384,
                    521 => EcdsaCurve::NistP521,
                    _ => {
                        return Err(SshError::UnsupportedKeySize {
                            algorithm: algorithm.short().to_string(),
                            bits,
                        })
                    }
                };
                debug_assert!(ECDSA_CURVES.contains(&bits));
                let key = PrivateKey::random(&mut rng, Algorithm::Ecdsa { curve }).map_err(
                    |e| SshError::GenerateKey {
                        algorithm: algorithm.short().to_string(),
                        source: e,
                    },
                )?;
                Ok(KeyMaterial::Ecdsa(key))
            }
            KeyAlgorithm::Ed25519 => {
                let key = PrivateKey::random(&mut rng, Algorithm::Ed25519).map_err(|e| {
                    SshError::GenerateKey {
                        algorithm: algorithm.short().to_string(),
                        source: e,
                    }
                })?;
                Ok(KeyMaterial::Ed25519(key))
            }
            KeyAlgorithm::Ed25519Sk | KeyAlgorithm::EcdsaSk => {
                let spec = TokenKeySpec::authentication(algorithm, bits);
                let public = generate_on_token(tokens, pin, &spec)?;
                Ok(KeyMaterial::HardwarePublic(public))
            }
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        match self {
            KeyMaterial::Rsa(key) | KeyMaterial::Ecdsa(key) | KeyMaterial::Ed25519(key) => {
                key.public_key()
            }
            KeyMaterial::HardwarePublic(public) => public,
        }
    }

    /// Whether a private key file will be written.
    pub fn has_private(&self) -> bool {
        !matches!(self, KeyMaterial::HardwarePublic(_))
    }

    pub fn fingerprint(&self) -> Result<String> {
        compute_fingerprint(self.public_key())
    }
}

impl KeyEncoding for KeyMaterial {
    fn encode_public(&self, comment: &str) -> Result<String> {
        let bare = PublicKey::new(self.public_key().key_data().clone(), "");
        let encoded = bare.to_openssh().map_err(SshError::SerializeKey)?;

        let line = format!("{} {}", encoded.trim(), comment.trim());
        Ok(line.trim().to_string())
    }

    fn encode_private(
        &self,
        comment: &str,
        passphrase: &str,
    ) -> Result<Option<Zeroizing<String>>> {
        let key = match self {
            KeyMaterial::Rsa(key) | KeyMaterial::Ecdsa(key) | KeyMaterial::Ed25519(key) => key,
            KeyMaterial::HardwarePublic(_) => return Ok(None),
        };

        let mut commented =
            PrivateKey::new(key.key_data().clone(), comment).map_err(SshError::SerializeKey)?;

        if !passphrase.is_empty() {
            commented = commented
                .encrypt(&mut rand::thread_rng(), passphrase.as_bytes())
                .map_err(SshError::EncryptKey)?;
        }

        let pem = commented
            .to_openssh(LineEnding::LF)
            .map_err(SshError::SerializeKey)?;
        Ok(Some(pem))
    }
}

/// Inputs for [`generate`].
#[derive(Debug, Clone)]
pub struct KeyRequest {
    pub algorithm: KeyAlgorithm,
    pub bits: u32,
    pub comment: String,
    pub passphrase: Zeroizing<String>,
    pub path: PathBuf,
}

/// Result of [`generate`]: what was written and how to identify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedKey {
    /// Authorized-key line without trailing newline.
    pub authorized_key: String,
    /// `SHA256:<base64>` fingerprint.
    pub fingerprint: String,
    /// Private key file, absent for hardware-backed keys.
    pub private_path: Option<PathBuf>,
    /// File holding the authorized-key line.
    pub public_path: PathBuf,
}

/// Generate a key for `request` and write it to disk.
///
/// Software keys are written as `<path>` (mode 0600) plus `<path>.pub`
/// (mode 0644). Hardware keys only have a public half, which is written to
/// `<path>` itself with mode 0644.
///
/// # Errors
/// Any failure aborts before later files are written.
pub fn generate(
    request: &KeyRequest,
    tokens: &dyn TokenProvider,
    pin: &dyn PinEntry,
) -> Result<GeneratedKey> {
    tracing::info!(
        algorithm = %request.algorithm,
        bits = request.bits,
        path = %request.path.display(),
        "generating key"
    );

    let material = KeyMaterial::generate(request.algorithm, request.bits, tokens, pin)?;
    save(&material, request)
}

/// Write `material` to the locations derived from `request.path`.
pub fn save(material: &KeyMaterial, request: &KeyRequest) -> Result<GeneratedKey> {
    let authorized_key = material.encode_public(&request.comment)?;
    let fingerprint = material.fingerprint()?;
    let public_line = format!("{}\n", authorized_key);

    let (private_path, public_path) =
        match material.encode_private(&request.comment, &request.passphrase)? {
            Some(pem) => {
                write_private(&request.path, pem.as_bytes())?;
                let public_path = public_path_for(&request.path);
                write_public(&public_path, public_line.as_bytes())?;
                (Some(request.path.clone()), public_path)
            }
            None => {
                write_public(&request.path, public_line.as_bytes())?;
                (None, request.path.clone())
            }
        };

    tracing::debug!(%fingerprint, public = %public_path.display(), "key written");

    Ok(GeneratedKey {
        authorized_key,
        fingerprint,
        private_path,
        public_path,
    })
}

/// `<path>.pub`, keeping any existing extension.
pub fn public_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".pub");
    PathBuf::from(name)
}

/// Write a private key so that it is never readable by others, not even
/// transiently. The key goes to a 0600 temp file in the target directory
/// which is then renamed over `path`, so a failed write keeps any old key.
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    let write_err = |e: std::io::Error| SshError::WriteKey {
        path: path.to_path_buf(),
        source: e,
    };

    let dir = ensure_parent(path)?;
    let mut file = tempfile::Builder::new()
        .prefix(".keyper-")
        .tempfile_in(&dir)
        .map_err(write_err)?;
    set_mode(file.path(), 0o600)?;
    file.write_all(contents).map_err(write_err)?;
    file.as_file().sync_all().map_err(write_err)?;
    file.persist(path).map_err(|e| write_err(e.error))?;

    set_mode(path, 0o600)
}

/// Create the parent directory of `path` if needed and return it.
fn ensure_parent(path: &Path) -> Result<PathBuf> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| SshError::CreateDirectory {
        path: parent.clone(),
        source: e,
    })?;
    Ok(parent)
}

fn write_public(path: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent(path)?;
    std::fs::write(path, contents).map_err(|e| SshError::WriteKey {
        path: path.to_path_buf(),
        source: e,
    })?;

    set_mode(path, 0o644)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|e| {
        SshError::SetPermissions {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
