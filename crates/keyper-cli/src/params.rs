// ABOUTME: Collects key generation parameters from flags, defaults and prompts.
// ABOUTME: Resolves bit sizes, destination paths, overwrite confirmation and passphrases.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use keyper_ssh::{
    default_bit_size, lookup, public_path_for, validate_bit_size, KeyAlgorithm, KeyRequest,
    SizeCheck,
};
use zeroize::Zeroizing;

use crate::commands::NewArgs;
use crate::prompt::Prompter;

/// Number of times a mismatched passphrase pair may be re-entered.
pub const PASSPHRASE_ATTEMPTS: usize = 3;

/// Placeholder in `--filename` replaced by the algorithm suffix.
const TYPE_PLACEHOLDER: &str = "<type>";

/// Facts about the machine and login the defaults are built from.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub home: Option<PathBuf>,
    pub login: String,
    pub hostname: String,
}

impl Environment {
    pub fn detect() -> Self {
        let login = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_default();
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_default();

        Self {
            home: dirs::home_dir(),
            login,
            hostname,
        }
    }

    /// `<login>@<hostname>`, the conventional key name.
    pub fn default_comment(&self) -> String {
        format!("{}@{}", self.login, self.hostname)
    }
}

/// Everything needed to generate a key and optionally register it.
#[derive(Debug, Clone)]
pub struct KeyParameters {
    pub algorithm: KeyAlgorithm,
    pub bits: u32,
    pub comment: String,
    pub passphrase: Zeroizing<String>,
    pub path: PathBuf,
    pub username: String,
    pub register: bool,
}

impl KeyParameters {
    /// Build parameters from `args`, asking the user where flags leave a
    /// decision open. The algorithm is checked before anything else.
    pub fn collect(args: &NewArgs, env: &Environment, prompter: &dyn Prompter) -> Result<Self> {
        let algorithm = lookup(&args.key_type)
            .map(|d| d.algorithm)
            .with_context(|| format!("unsupported key type: {}", args.key_type))?;

        let bits = resolve_bit_size(algorithm, args.bits, prompter)?;
        let path = expand_filename(&args.filename, env.home.as_deref(), algorithm)?;
        check_destination(&path, algorithm, args.overwrite, prompter)?;

        let passphrase = match (&args.passphrase, algorithm.is_hardware()) {
            (Some(given), _) => Zeroizing::new(given.clone()),
            // Token keys have no private file to protect.
            (None, true) => Zeroizing::new(String::new()),
            (None, false) => read_passphrase(prompter)?,
        };

        let comment = args
            .comment
            .clone()
            .unwrap_or_else(|| env.default_comment());
        let username = args.user.clone().unwrap_or_else(|| env.login.clone());

        Ok(Self {
            algorithm,
            bits,
            comment,
            passphrase,
            path,
            username,
            register: !args.no_add,
        })
    }

    pub fn request(&self) -> KeyRequest {
        KeyRequest {
            algorithm: self.algorithm,
            bits: self.bits,
            comment: self.comment.clone(),
            passphrase: self.passphrase.clone(),
            path: self.path.clone(),
        }
    }
}

/// Settle the key size. Without an explicit request the default is used
/// silently; otherwise the size rules decide whether the user must answer.
pub fn resolve_bit_size(
    algorithm: KeyAlgorithm,
    requested: Option<u32>,
    prompter: &dyn Prompter,
) -> Result<u32> {
    let Some(requested) = requested else {
        return Ok(default_bit_size(algorithm));
    };

    match validate_bit_size(algorithm, requested) {
        SizeCheck::Accepted(bits) => Ok(bits),
        SizeCheck::BelowMinimum { requested, minimum } => {
            let bits = prompter.number(
                &format!(
                    "{requested} bits is below the {minimum} bit minimum for {}, enter a key size",
                    algorithm.short()
                ),
                default_bit_size(algorithm),
            )?;
            if bits < minimum {
                bail!(
                    "{} keys must be at least {minimum} bits, got {bits}",
                    algorithm.short()
                );
            }
            Ok(bits)
        }
        SizeCheck::ChooseCurve { requested, options } => {
            let items: Vec<String> = options.iter().map(|b| format!("{b} bits")).collect();
            let choice = prompter.select(
                &format!(
                    "{requested} is not a valid curve size for {}, choose one",
                    algorithm.short()
                ),
                &items,
            )?;
            options
                .get(choice)
                .copied()
                .with_context(|| format!("invalid curve selection {choice}"))
        }
        SizeCheck::ConfirmFixed { requested, fixed } => {
            let accepted = prompter.confirm(
                &format!(
                    "{} keys are always {fixed} bits, use {fixed} instead of {requested}?",
                    algorithm.short()
                ),
                true,
            )?;
            if !accepted {
                bail!("{} keys can only be {fixed} bits", algorithm.short());
            }
            Ok(fixed)
        }
    }
}

/// Expand `~/` and a trailing `<type>` in a destination path.
pub fn expand_filename(raw: &str, home: Option<&Path>, algorithm: KeyAlgorithm) -> Result<PathBuf> {
    let name = match raw.strip_suffix(TYPE_PLACEHOLDER) {
        Some(stem) => format!("{stem}{}", algorithm.suffix()),
        None => raw.to_string(),
    };

    match name.strip_prefix("~/") {
        Some(rest) => {
            let home = home.context("cannot determine home directory to expand ~/")?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(name)),
    }
}

/// Refuse to clobber existing key files unless overwriting was requested or confirmed.
pub fn check_destination(
    path: &Path,
    algorithm: KeyAlgorithm,
    overwrite: bool,
    prompter: &dyn Prompter,
) -> Result<()> {
    if overwrite {
        return Ok(());
    }

    let mut existing = vec![path.to_path_buf()];
    if !algorithm.is_hardware() {
        existing.push(public_path_for(path));
    }
    let Some(found) = existing.into_iter().find(|p| p.exists()) else {
        return Ok(());
    };

    let replace = prompter.confirm(
        &format!("{} already exists. Overwrite?", found.display()),
        false,
    )?;
    if !replace {
        bail!("file already exists: {}", found.display());
    }
    Ok(())
}

/// Ask for a passphrase twice, allowing a few attempts to get a matching pair.
pub fn read_passphrase(prompter: &dyn Prompter) -> Result<Zeroizing<String>> {
    for attempt in 1..=PASSPHRASE_ATTEMPTS {
        let first = Zeroizing::new(prompter.secret("Enter passphrase (empty for no passphrase)")?);
        let second = Zeroizing::new(prompter.secret("Enter same passphrase again")?);

        if *first == *second {
            return Ok(first);
        }

        tracing::warn!(attempt, "passphrases do not match");
        println!("Passphrases do not match. Try again.");
    }

    bail!("passphrases did not match after {PASSPHRASE_ATTEMPTS} attempts")
}
