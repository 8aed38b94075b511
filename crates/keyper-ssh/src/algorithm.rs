// ABOUTME: Static catalog of the SSH key algorithms keyper can produce.
// ABOUTME: Looks algorithms up by suffix token and validates requested bit sizes.

use std::fmt;
use std::str::FromStr;

use crate::error::SshError;

/// Closed set of key algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Rsa,
    Ed25519Sk,
    Ed25519,
    EcdsaSk,
    Ecdsa,
}

/// One entry of the algorithm catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmDefinition {
    pub algorithm: KeyAlgorithm,
    pub short: &'static str,
    pub long: &'static str,
    pub suffix: &'static str,
}

static DEFINITIONS: [AlgorithmDefinition; 5] = [
    AlgorithmDefinition {
        algorithm: KeyAlgorithm::Rsa,
        short: "RSA",
        long: "Rivest–Shamir–Adleman",
        suffix: "rsa",
    },
    AlgorithmDefinition {
        algorithm: KeyAlgorithm::Ed25519Sk,
        short: "Ed25519-SK",
        long: "Elliptic Curve Digital Signature Algorithm with Curve25519 and Secure Key",
        suffix: "ed25519-sk",
    },
    AlgorithmDefinition {
        algorithm: KeyAlgorithm::Ed25519,
        short: "Ed25519",
        long: "Elliptic Curve Digital Signature Algorithm with Curve25519",
        suffix: "ed25519",
    },
    AlgorithmDefinition {
        algorithm: KeyAlgorithm::EcdsaSk,
        short: "ECDSA-SK",
        long: "Elliptic Curve Digital Signature Algorithm with Secure Key",
        suffix: "ecdsa-sk",
    },
    AlgorithmDefinition {
        algorithm: KeyAlgorithm::Ecdsa,
        short: "ECDSA",
        long: "Elliptic Curve Digital Signature Algorithm",
        suffix: "ecdsa",
    },
];

/// Minimum RSA modulus size accepted without an override.
pub const RSA_MIN_BITS: u32 = 1024;

/// Curve sizes accepted for ECDSA keys.
pub const ECDSA_CURVES: [u32; 3] = [256, 384, 521];

/// Fixed size of Ed25519 keys.
pub const ED25519_BITS: u32 = 256;

/// Find the catalog entry for a suffix token such as `ed25519-sk`.
///
/// Matching is case-insensitive. `None` means the algorithm is unknown and
/// the caller must stop before doing any I/O.
pub fn lookup(suffix: &str) -> Option<&'static AlgorithmDefinition> {
    DEFINITIONS
        .iter()
        .find(|d| d.suffix.eq_ignore_ascii_case(suffix.trim()))
}

/// Every catalog entry, in catalog order.
pub fn definitions() -> &'static [AlgorithmDefinition] {
    &DEFINITIONS
}

impl KeyAlgorithm {
    pub fn definition(self) -> &'static AlgorithmDefinition {
        // DEFINITIONS holds exactly one entry per variant
        DEFINITIONS
            .iter()
            .find(|d| d.algorithm == self)
            .unwrap_or(&DEFINITIONS[0])
    }

    pub fn suffix(self) -> &'static str {
        self.definition().suffix
    }

    pub fn short(self) -> &'static str {
        self.definition().short
    }

    /// True for the variants whose private key lives on a hardware token.
    pub fn is_hardware(self) -> bool {
        matches!(self, KeyAlgorithm::Ed25519Sk | KeyAlgorithm::EcdsaSk)
    }
}

impl AlgorithmDefinition {
    /// Long description with the short name appended, e.g. `... (RSA)`.
    pub fn description(&self) -> String {
        format!("{} ({})", self.long, self.short)
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for KeyAlgorithm {
    type Err = SshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(s)
            .map(|d| d.algorithm)
            .ok_or_else(|| SshError::UnsupportedKeyType(s.to_string()))
    }
}

/// Default size used when the caller did not ask for one.
pub fn default_bit_size(algorithm: KeyAlgorithm) -> u32 {
    match algorithm {
        KeyAlgorithm::Rsa => 2048,
        KeyAlgorithm::Ecdsa | KeyAlgorithm::EcdsaSk => 256,
        KeyAlgorithm::Ed25519 | KeyAlgorithm::Ed25519Sk => ED25519_BITS,
    }
}

/// Verdict of [`validate_bit_size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeCheck {
    /// The size can be used as is.
    Accepted(u32),
    /// RSA size below the minimum. Only an explicit override of at least
    /// `minimum` bits may replace it.
    BelowMinimum { requested: u32, minimum: u32 },
    /// ECDSA size outside the curve set. The caller must have the user pick
    /// one of `options`.
    ChooseCurve {
        requested: u32,
        options: &'static [u32],
    },
    /// The algorithm has a fixed size. The caller must confirm before the
    /// size becomes `fixed`.
    ConfirmFixed { requested: u32, fixed: u32 },
}

/// Check a user-requested size against the rules of `algorithm`.
pub fn validate_bit_size(algorithm: KeyAlgorithm, requested: u32) -> SizeCheck {
    match algorithm {
        KeyAlgorithm::Rsa if requested < RSA_MIN_BITS => SizeCheck::BelowMinimum {
            requested,
            minimum: RSA_MIN_BITS,
        },
        KeyAlgorithm::Rsa => SizeCheck::Accepted(requested),
        KeyAlgorithm::Ecdsa | KeyAlgorithm::EcdsaSk => {
            if ECDSA_CURVES.contains(&requested) {
                SizeCheck::Accepted(requested)
            } else {
                SizeCheck::ChooseCurve {
                    requested,
                    options: &ECDSA_CURVES,
                }
            }
        }
        KeyAlgorithm::Ed25519 | KeyAlgorithm::Ed25519Sk => {
            if requested == ED25519_BITS {
                SizeCheck::Accepted(ED25519_BITS)
            } else {
                SizeCheck::ConfirmFixed {
                    requested,
                    fixed: ED25519_BITS,
                }
            }
        }
    }
}
