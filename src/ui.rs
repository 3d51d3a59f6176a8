use anyhow::Result;
use colored::{ColoredString, Colorize};
use declarative::{Action, ApplyResult, ConfirmCallback, ExecuteSummary};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Plan and Result Formatting
// ============================================================================

/// Colored plan symbol for an action
pub fn action_symbol(action: Action) -> ColoredString {
    let symbol = action.symbol();
    match action {
        Action::Create => symbol.green(),
        Action::Update => symbol.yellow(),
        Action::Replace => symbol.magenta(),
        Action::Delete => symbol.red(),
        Action::NoChange => symbol.normal(),
    }
}

/// One-line description of an apply result
pub fn describe_result(name: &str, result: &ApplyResult) -> String {
    match result {
        ApplyResult::NoChange => format!("{} {} {}", "·".dimmed(), name, "unchanged".dimmed()),
        ApplyResult::Created => format!("{} {} created", "✓".green(), name),
        ApplyResult::Modified => format!("{} {} updated", "✓".green(), name),
        ApplyResult::Replaced => format!("{} {} replaced", "✓".green(), name),
        ApplyResult::Removed => format!("{} {} deleted", "✓".green(), name),
        ApplyResult::Failed { error } => format!("{} {}: {}", "✗".red(), name, error),
        ApplyResult::Skipped { reason } => {
            format!("{} {} {}", "○".yellow(), name, format!("({reason})").dimmed())
        }
    }
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Stack applied successfully!", "✓".green().bold());
    } else {
        println!("  {} Stack applied with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} updated", summary.modified);
    }
    if summary.replaced > 0 {
        println!("    • {} replaced", summary.replaced);
    }
    if summary.removed > 0 {
        println!("    • {} deleted", summary.removed);
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {}", summary.failed, "failed".red());
    }
}

// ============================================================================
// Confirmation
// ============================================================================

/// Interactive confirmation, bypassed by `--yes`
pub struct PromptConfirm {
    pub assume_yes: bool,
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }

        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;

        Ok(confirmed)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_result() {
        colored::control::set_override(false);

        assert_eq!(describe_result("web", &ApplyResult::Created), "✓ web created");
        assert_eq!(
            describe_result(
                "web",
                &ApplyResult::Failed {
                    error: "creating web: timeout".into()
                }
            ),
            "✗ web: creating web: timeout"
        );
        assert_eq!(
            describe_result(
                "web",
                &ApplyResult::Skipped {
                    reason: "Dry run".into()
                }
            ),
            "○ web (Dry run)"
        );
    }

    #[test]
    fn test_action_symbol() {
        colored::control::set_override(false);

        assert_eq!(action_symbol(Action::Replace).to_string(), "-/+");
        assert_eq!(action_symbol(Action::Create).to_string(), "+");
    }

    #[test]
    fn test_assume_yes_skips_prompt() {
        let mut confirm = PromptConfirm { assume_yes: true };
        assert!(confirm.confirm("Apply changes?").unwrap());
    }
}
