// THEORY:
// Progress reporting is a side channel: the pipeline calls `step()` once per
// processed frame and never looks at the result. `ProgressBar` renders a fixed-width
// text bar and hands it to the `log` facade, so the host application decides where
// (and whether) it shows up.

use log::info;

const BLOCK_PERCENT: u32 = 5;
const BLOCKS: u32 = 100 / BLOCK_PERCENT;

/// Receives one notification per processed frame.
pub trait ProgressReporter {
    fn step(&mut self);
}

/// A reporter that ignores every step.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn step(&mut self) {}
}

/// Text progress bar, e.g. `Motion detection [========            ] 40%`.
#[derive(Debug, Clone)]
pub struct ProgressBar {
    message: String,
    total: u32,
    done: u32,
}

impl ProgressBar {
    pub fn new(total: u32, message: impl Into<String>) -> Self {
        Self { message: message.into(), total, done: 0 }
    }

    /// Completed steps, capped at the total.
    pub fn done(&self) -> u32 {
        self.done.min(self.total)
    }

    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 100;
        }
        100 * self.done() / self.total
    }

    /// The bar as it currently reads.
    pub fn render(&self) -> String {
        let percent = self.percent();
        let filled = (percent / BLOCK_PERCENT) as usize;
        let empty = BLOCKS as usize - filled;
        format!(
            "{} [{}{}] {}%",
            self.message,
            "=".repeat(filled),
            " ".repeat(empty),
            percent
        )
    }
}

impl ProgressReporter for ProgressBar {
    fn step(&mut self) {
        if self.done >= self.total {
            return;
        }
        self.done += 1;
        info!("{}", self.render());
    }
}
