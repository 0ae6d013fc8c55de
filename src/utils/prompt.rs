//! User prompt utilities using dialoguer

use crate::utils::error::{Result, ZaiError};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

/// Prompt for text input
pub fn prompt_input(prompt: &str, default: Option<&str>) -> Result<String> {
    let theme = ColorfulTheme::default();
    let mut input = Input::with_theme(&theme).with_prompt(prompt);

    if let Some(d) = default {
        input = input.default(d.to_string());
    }

    input.interact_text().map_err(|_| ZaiError::UserCancelled)
}

/// Prompt for input that may be left empty
pub fn prompt_optional(prompt: &str) -> Result<Option<String>> {
    let theme = ColorfulTheme::default();
    let input: String = Input::with_theme(&theme)
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(|_| ZaiError::UserCancelled)?;

    if input.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(input))
    }
}

/// Prompt for yes/no confirmation
pub fn prompt_confirm(prompt: &str, default: bool) -> Result<bool> {
    let theme = ColorfulTheme::default();
    Confirm::with_theme(&theme)
        .with_prompt(prompt)
        .default(default)
        .interact_opt()
        .map_err(|e| ZaiError::Io(std::io::Error::other(e.to_string())))?
        .ok_or(ZaiError::UserCancelled)
}

/// Prompt for selection from a list
pub fn prompt_select<T: ToString>(prompt: &str, items: &[T], default: usize) -> Result<usize> {
    let theme = ColorfulTheme::default();
    Select::with_theme(&theme)
        .with_prompt(prompt)
        .items(items)
        .default(default)
        .interact_opt()
        .map_err(|e| ZaiError::Io(std::io::Error::other(e.to_string())))?
        .ok_or(ZaiError::UserCancelled)
}

/// Display a warning and ask for confirmation
pub fn warn_confirm(warning: &str) -> Result<bool> {
    println!("\n{} {}\n", "WARNING:".yellow().bold(), warning);
    prompt_confirm("Continue?", false)
}

/// Display a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}
