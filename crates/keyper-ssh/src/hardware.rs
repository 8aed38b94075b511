// ABOUTME: Hardware security token seam for the *-sk key types.
// ABOUTME: Token discovery and on-device key generation, with an optional YubiKey PIV backend.

use ssh_key::PublicKey;

use crate::algorithm::KeyAlgorithm;
use crate::error::{Result, SshError};

/// Source of the management PIN for a token.
///
/// Implemented by the CLI on top of its prompt layer.
pub trait PinEntry {
    fn management_pin(&self, token_name: &str) -> std::io::Result<String>;
}

/// PIN requirement attached to a token-resident key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinPolicy {
    Always,
}

/// Touch requirement attached to a token-resident key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPolicy {
    Always,
}

/// What to ask the token for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenKeySpec {
    pub algorithm: KeyAlgorithm,
    pub bits: u32,
    pub pin_policy: PinPolicy,
    pub touch_policy: TouchPolicy,
}

impl TokenKeySpec {
    /// Key bound to the authentication slot, PIN and touch required on every use.
    pub fn authentication(algorithm: KeyAlgorithm, bits: u32) -> Self {
        Self {
            algorithm,
            bits,
            pin_policy: PinPolicy::Always,
            touch_policy: TouchPolicy::Always,
        }
    }
}

/// An opened hardware token.
pub trait HardwareToken {
    /// Reader or device name shown to the user.
    fn name(&self) -> &str;

    /// Generate a key on the device and return its public half.
    ///
    /// The private key never leaves the token.
    fn generate(&mut self, spec: &TokenKeySpec, pin: &str) -> Result<PublicKey>;
}

/// Finds tokens attached to the machine.
pub trait TokenProvider {
    /// Open the first recognised, compatible token.
    fn open_first(&self) -> Result<Box<dyn HardwareToken>>;
}

/// Provider used when no token backend is compiled in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTokens;

impl TokenProvider for NoTokens {
    fn open_first(&self) -> Result<Box<dyn HardwareToken>> {
        Err(SshError::TokenNotFound)
    }
}

/// The provider matching the enabled cargo features.
pub fn default_provider() -> Box<dyn TokenProvider> {
    #[cfg(feature = "piv")]
    {
        Box::new(piv::PivTokens)
    }
    #[cfg(not(feature = "piv"))]
    {
        tracing::debug!("built without the piv feature; hardware tokens are unavailable");
        Box::new(NoTokens)
    }
}

/// Open a token, ask for its PIN and generate a key on it.
pub fn generate_on_token(
    provider: &dyn TokenProvider,
    pin: &dyn PinEntry,
    spec: &TokenKeySpec,
) -> Result<PublicKey> {
    let mut token = provider.open_first()?;
    tracing::info!(token = token.name(), algorithm = %spec.algorithm, "using hardware token");

    let code = pin.management_pin(token.name()).map_err(SshError::Pin)?;

    token.generate(spec, &code)
}

#[cfg(feature = "piv")]
pub mod piv {
    //! YubiKey PIV backend.

    use super::{HardwareToken, TokenKeySpec, TokenProvider};
    use crate::algorithm::KeyAlgorithm;
    use crate::error::{Result, SshError};
    use ssh_key::public::{EcdsaPublicKey, KeyData};
    use ssh_key::PublicKey;
    use yubikey::piv::{self, AlgorithmId, SlotId};
    use yubikey::reader::Context;
    use yubikey::{MgmKey, PinPolicy, TouchPolicy, YubiKey};

    fn token_err(e: yubikey::Error) -> SshError {
        SshError::Token(e.to_string())
    }

    /// Enumerates PC/SC readers and opens the first YubiKey.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct PivTokens;

    impl TokenProvider for PivTokens {
        fn open_first(&self) -> Result<Box<dyn HardwareToken>> {
            let mut context = Context::open().map_err(token_err)?;
            let readers = context.iter().map_err(token_err)?;

            let mut found = 0usize;
            for reader in readers {
                found += 1;
                let name = reader.name().to_string();
                if !name.to_lowercase().contains("yubikey") {
                    continue;
                }
                tracing::debug!(readers = found, reader = %name, "opening YubiKey");
                let device = reader.open().map_err(token_err)?;
                return Ok(Box::new(PivToken { name, device }));
            }

            tracing::debug!(readers = found, "no YubiKey among PC/SC readers");
            Err(SshError::TokenNotFound)
        }
    }

    pub struct PivToken {
        name: String,
        device: YubiKey,
    }

    impl HardwareToken for PivToken {
        fn name(&self) -> &str {
            &self.name
        }

        fn generate(&mut self, spec: &TokenKeySpec, pin: &str) -> Result<PublicKey> {
            let algorithm = match (spec.algorithm, spec.bits) {
                (KeyAlgorithm::EcdsaSk, 256) => AlgorithmId::EccP256,
                (KeyAlgorithm::EcdsaSk, 384) => AlgorithmId::EccP384,
                (KeyAlgorithm::EcdsaSk, bits) => {
                    return Err(SshError::UnsupportedKeySize {
                        algorithm: spec.algorithm.short().to_string(),
                        bits,
                    })
                }
                (other, _) => return Err(SshError::TokenUnsupported(other.to_string())),
            };

            self.device.verify_pin(pin.as_bytes()).map_err(token_err)?;
            let management = MgmKey::get_protected(&mut self.device).map_err(token_err)?;
            self.device.authenticate(management).map_err(token_err)?;

            let info = piv::generate(
                &mut self.device,
                SlotId::Authentication,
                algorithm,
                PinPolicy::Always,
                TouchPolicy::Always,
            )
            .map_err(token_err)?;

            let point = info.subject_public_key.raw_bytes();
            let ecdsa = EcdsaPublicKey::from_sec1_bytes(point).map_err(SshError::SerializeKey)?;

            Ok(PublicKey::new(KeyData::Ecdsa(ecdsa), ""))
        }
    }
}
