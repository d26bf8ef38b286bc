//! Operator prompts.
//!
//! Every interactive decision goes through the [`Prompt`] trait so that the
//! reconciliation, duplicate-resolution and deletion logic can be driven by
//! a [`ScriptedPrompt`] in tests and by a [`TerminalPrompt`] at runtime.
//!
//! Three kinds of question are asked:
//! - yes/no ([`Prompt::confirm`]): answered by typing `y`
//! - confirmation phrase ([`Prompt::confirm_phrase`]): the exact phrase must
//!   be typed, anything else declines
//! - free answers ([`Prompt::ask`]): interpreted by the caller

use std::collections::VecDeque;
use std::io;

/// Phrase that must be typed before any irreversible batch operation.
pub const CONFIRM_PHRASE: &str = "confirm";

/// Source of operator answers.
pub trait Prompt {
    /// Ask `question` and return the raw answer.
    ///
    /// # Errors
    ///
    /// Returns an error when no answer can be obtained (closed input,
    /// terminal failure). Callers treat this as "no".
    fn ask(&mut self, question: &str) -> io::Result<String>;

    /// Ask a yes/no question. Only `y` (any case, surrounding whitespace
    /// ignored) counts as yes.
    fn confirm(&mut self, question: &str) -> bool {
        match self.ask(&format!("{question} (y/n)")) {
            Ok(answer) => answer.trim().eq_ignore_ascii_case("y"),
            Err(e) => {
                log::warn!("No answer to '{}': {}", question, e);
                false
            }
        }
    }

    /// Require `phrase` to be typed exactly (case-insensitive, trimmed).
    fn confirm_phrase(&mut self, question: &str, phrase: &str) -> bool {
        match self.ask(&format!("{question} Type '{phrase}' to proceed")) {
            Ok(answer) => answer.trim().eq_ignore_ascii_case(phrase),
            Err(e) => {
                log::warn!("No answer to '{}': {}", question, e);
                false
            }
        }
    }
}

/// Prompt reading answers from the terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    /// Create a terminal prompt.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Prompt for TerminalPrompt {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        dialoguer::Input::<String>::new()
            .with_prompt(question)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| io::Error::other(e.to_string()))
    }
}

/// Prompt answering from a fixed script, for tests and automation.
///
/// Every question asked is recorded. Once the script runs out, `ask`
/// fails with `UnexpectedEof`.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompt {
    /// Create a prompt that returns `answers` in order.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// Prompt with no answers: every question fails.
    #[must_use]
    pub fn silent() -> Self {
        Self::default()
    }

    /// Questions asked so far.
    #[must_use]
    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    /// Answers not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        self.asked.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
    }
}
