use indicatif::{ProgressBar, ProgressStyle};

/// Spinner naming the check in flight. Hidden when stderr is not a terminal.
pub fn check_spinner(name: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner} [{elapsed}] {msg}")
            .expect("invalid spinner template"),
    );
    pb.set_message(format!("{name}..."));
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Clear the spinner; the result line printed afterwards replaces it.
pub fn finish_spinner(pb: &ProgressBar) {
    pb.finish_and_clear();
}
