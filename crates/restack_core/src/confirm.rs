//! Operator confirmation gates.
//!
//! Every branch that mutates destructive state (actual destroy, forced
//! metadata removal) is gated by its own yes/no confirmation. Declining is a
//! clean cancellation, never an error. The prompts are the only cancellation
//! points: once a destructive subprocess starts it cannot be aborted.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use tracing::debug;

/// A yes/no gate presented to the operator.
pub trait Confirmation: Send + Sync {
    /// Ask the operator; true means proceed.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Interactive confirmation over stdin.
pub struct StdinConfirmer;

impl Confirmation for StdinConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} (yes/no): ", prompt);
        let _ = io::stdout().flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "yes" | "y")
    }
}

/// Fixed-answer gate for non-interactive runs (`--yes`).
pub struct AutoConfirmer {
    answer: bool,
}

impl AutoConfirmer {
    pub fn new(answer: bool) -> Self {
        Self { answer }
    }
}

impl Confirmation for AutoConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        debug!("Auto-answering '{}' to: {}", self.answer, prompt);
        self.answer
    }
}

/// Scripted gate for tests: answers are consumed in order, and running out
/// of answers declines.
pub struct ScriptedConfirmer {
    answers: Mutex<VecDeque<bool>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirmer {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts seen so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt lock").clone()
    }
}

impl Confirmation for ScriptedConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts
            .lock()
            .expect("prompt lock")
            .push(prompt.to_string());
        self.answers
            .lock()
            .expect("answer lock")
            .pop_front()
            .unwrap_or(false)
    }
}
