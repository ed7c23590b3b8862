use std::io::{self, BufRead, Write};

use tracing::warn;

use crate::registry::Confirm;

/// Asks for confirmation in the terminal. Anything but an explicit yes is a refusal.
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        if let Err(e) = io::stdout().flush() {
            warn!("Failed to show prompt {e}");
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(e) => {
                warn!("Failed to read confirmation {e}");
                false
            }
        }
    }
}

/// Used with `--yes`, when the user confirmed upfront.
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
