//! Progress indicators for voidctl CLI.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A spinner with a message; hidden when `visible` is false
pub fn spinner(message: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Run `f` behind a spinner, clearing it afterwards
pub fn with_spinner<T>(message: &str, visible: bool, f: impl FnOnce() -> T) -> T {
    let pb = spinner(message, visible);
    let result = f();
    pb.finish_and_clear();
    result
}
