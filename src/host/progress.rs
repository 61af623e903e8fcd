use crate::host::ProgressReporter;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Mutex;

/// Resolution of the bar; fractions are mapped onto this many steps.
const PROGRESS_STEPS: u64 = 1000;

/// Progress overlay drawn with indicatif on stderr.
pub struct TerminalProgress {
    bar: Mutex<Option<ProgressBar>>,
    hidden: bool,
}

impl TerminalProgress {
    pub fn new(hidden: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            hidden,
        }
    }

    fn create_bar(&self) -> ProgressBar {
        let pb = ProgressBar::new(PROGRESS_STEPS);
        if self.hidden {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {prefix:.cyan} [{bar:40}] {percent:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb
    }

    /// Current bar position, if the overlay is showing.
    #[cfg(test)]
    pub fn position(&self) -> Option<u64> {
        self.bar
            .lock()
            .ok()
            .and_then(|bar| bar.as_ref().map(ProgressBar::position))
    }
}

impl ProgressReporter for TerminalProgress {
    fn report(&self, title: &str, message: &str, fraction: f32) {
        let Ok(mut slot) = self.bar.lock() else {
            return;
        };
        let pb = slot.get_or_insert_with(|| self.create_bar());
        pb.set_prefix(title.to_string());
        pb.set_message(message.to_string());
        pb.set_position(fraction_to_steps(fraction));
    }

    fn clear(&self) {
        if let Some(pb) = self.bar.lock().ok().and_then(|mut slot| slot.take()) {
            pb.finish_and_clear();
        }
    }
}

fn fraction_to_steps(fraction: f32) -> u64 {
    let clamped = fraction.clamp(0.0, 1.0) as f64;
    (clamped * PROGRESS_STEPS as f64).round() as u64
}
