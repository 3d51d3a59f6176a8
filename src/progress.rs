//! Progress indicators for kubemanifest.

use declarative::{Action, ApplyResult, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};

use crate::ui;

/// Progress bar over the changes of one run; prints a line per result
pub struct ApplyProgress {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl ApplyProgress {
    pub fn new(quiet: bool) -> Self {
        Self { bar: None, quiet }
    }

    fn report(&self, line: &str) {
        match &self.bar {
            Some(bar) => bar.println(format!("  {line}")),
            None => println!("  {line}"),
        }
    }
}

impl ProgressCallback for ApplyProgress {
    fn on_batch_start(&mut self, count: usize) {
        if self.quiet {
            return;
        }

        let bar = ProgressBar::new(count as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        self.bar = Some(bar);
    }

    fn on_resource_start(&mut self, name: &str, action: Action) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("{action} {name}"));
        }
    }

    fn on_resource_complete(&mut self, name: &str, result: &ApplyResult) {
        // Failures are always shown, even when quiet
        if !self.quiet || !result.is_success() {
            self.report(&ui::describe_result(name, result));
        }
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn on_batch_complete(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
