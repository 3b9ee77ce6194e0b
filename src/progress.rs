use indicatif::{ProgressBar, ProgressStyle};

/// Creates a progress bar for a transfer, or a spinner if the size is
/// unknown (`0`).
///
/// # Arguments
/// * `size` - Expected number of bytes.
/// * `offset` - Bytes already transferred.
/// * `name` - Label shown in front of the bar.
pub fn setup_progress_log(size: u64, offset: Option<u64>, name: &str) -> ProgressBar {
    if size == 0 {
        spinner(name)
    } else {
        progress_bar(size, offset, name)
    }
}

fn progress_bar(size: u64, offset: Option<u64>, name: &str) -> ProgressBar {
    let pb = ProgressBar::new(size);

    if let Some(offset) = offset {
        pb.inc(offset);
    }

    let template =
        name.to_owned() + " {bar:40.cyan} {percent:.cyan}% | {bytes}/{total_bytes} ({eta})";

    match ProgressStyle::default_bar().template(&template) {
        Ok(style) => pb.set_style(style.progress_chars("=>-")),
        Err(e) => tracing::trace!(error = %e, "falling back to the default bar style"),
    }

    pb
}

fn spinner(name: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let template = "{spinner:.cyan} ".to_owned() + name + " {bytes}";

    if let Ok(style) = ProgressStyle::default_spinner().template(&template) {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠏"));
    }

    pb
}
