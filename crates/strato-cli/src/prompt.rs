//! Interactive prompts.
//!
//! Handlers never talk to the terminal directly. They ask a [`Prompter`] to
//! fill fields the flags left empty, before any network call.

#[cfg(any(test, feature = "test-util"))]
use std::collections::VecDeque;

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password};
#[cfg(any(test, feature = "test-util"))]
use parking_lot::Mutex;

use crate::error::CliError;

/// Source of answers for missing fields.
pub trait Prompter: Send + Sync {
    /// Ask for a line of text. An empty answer takes `default` when given.
    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, CliError>;

    /// Ask for a secret.
    fn password(&self, prompt: &str) -> Result<String, CliError>;

    /// Ask a yes/no question.
    fn confirm(&self, prompt: &str) -> Result<bool, CliError>;
}

fn prompt_error(e: dialoguer::Error) -> CliError {
    CliError::Io(std::io::Error::other(e))
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, CliError> {
        let theme = ColorfulTheme::default();
        let mut input = Input::<String>::with_theme(&theme)
            .with_prompt(prompt)
            .allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        input.interact_text().map_err(prompt_error)
    }

    fn password(&self, prompt: &str) -> Result<String, CliError> {
        Password::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .interact()
            .map_err(prompt_error)
    }

    fn confirm(&self, prompt: &str) -> Result<bool, CliError> {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(prompt_error)
    }
}

/// Replays canned answers and records the questions asked.
///
/// Running out of answers is a validation error, which is what a user
/// closing the prompt would produce.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test-util"))]
impl ScriptedPrompter {
    /// Create a prompter answering with `answers`, in order.
    #[must_use]
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far.
    #[must_use]
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().clone()
    }

    fn next(&self, prompt: &str) -> Result<String, CliError> {
        self.asked.lock().push(prompt.to_string());
        self.answers
            .lock()
            .pop_front()
            .ok_or_else(|| CliError::Validation(format!("no answer for '{prompt}'")))
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Prompter for ScriptedPrompter {
    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, CliError> {
        let answer = self.next(prompt)?;
        match default {
            Some(default) if answer.is_empty() => Ok(default.to_string()),
            _ => Ok(answer),
        }
    }

    fn password(&self, prompt: &str) -> Result<String, CliError> {
        self.next(prompt)
    }

    fn confirm(&self, prompt: &str) -> Result<bool, CliError> {
        let answer = self.next(prompt)?;
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}
