// ABOUTME: Interactive prompt seam used by key generation and reconciliation.
// ABOUTME: A trait over dialoguer widgets so flows can be driven by scripted answers in tests.

use std::io;

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password, Select};
use keyper_ssh::PinEntry;

/// Blocking terminal questions. Every failure (closed stdin, no tty) is an
/// `io::Error` the caller treats as fatal.
pub trait Prompter: Send + Sync {
    /// Hidden input, no confirmation.
    fn secret(&self, prompt: &str) -> io::Result<String>;

    fn confirm(&self, prompt: &str, default: bool) -> io::Result<bool>;

    /// Single choice; returns the index into `items`.
    fn select(&self, prompt: &str, items: &[String]) -> io::Result<usize>;

    fn number(&self, prompt: &str, default: u32) -> io::Result<u32>;
}

/// Terminal prompts backed by dialoguer.
#[derive(Default)]
pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl Prompter for DialoguerPrompter {
    fn secret(&self, prompt: &str) -> io::Result<String> {
        Password::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(io::Error::from)
    }

    fn confirm(&self, prompt: &str, default: bool) -> io::Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(io::Error::from)
    }

    fn select(&self, prompt: &str, items: &[String]) -> io::Result<usize> {
        Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact()
            .map_err(io::Error::from)
    }

    fn number(&self, prompt: &str, default: u32) -> io::Result<u32> {
        Input::<u32>::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact_text()
            .map_err(io::Error::from)
    }
}

/// Asks for a hardware token's management PIN through a [`Prompter`].
pub struct PromptedPin<'a> {
    prompter: &'a dyn Prompter,
}

impl<'a> PromptedPin<'a> {
    pub fn new(prompter: &'a dyn Prompter) -> Self {
        Self { prompter }
    }
}

impl PinEntry for PromptedPin<'_> {
    fn management_pin(&self, token_name: &str) -> io::Result<String> {
        self.prompter.secret(&format!("Enter the PIN for {token_name}"))
    }
}
