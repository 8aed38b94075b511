// ABOUTME: SSH key generation library for the keyper client.
// ABOUTME: Re-exports the algorithm catalog, key generator, fingerprinting and token seam.

pub mod algorithm;
pub mod error;
pub mod fingerprint;
pub mod hardware;
pub mod key;

pub use algorithm::{
    default_bit_size, lookup, validate_bit_size, AlgorithmDefinition, KeyAlgorithm, SizeCheck,
};
pub use error::{Result, SshError};
pub use fingerprint::compute_fingerprint;
pub use hardware::{
    default_provider, generate_on_token, HardwareToken, NoTokens, PinEntry, TokenKeySpec,
    TokenProvider,
};
pub use key::{generate, public_path_for, GeneratedKey, KeyEncoding, KeyMaterial, KeyRequest};
