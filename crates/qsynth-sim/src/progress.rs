//! Progress reporting and cancellation.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::ProgressMode;

/// A progress bar that is cleared when the guard drops.
///
/// The bar disappears on every exit path, including errors, cancellation and
/// runs with nothing to do.
pub struct ProgressGuard {
    bar: Option<ProgressBar>,
}

impl ProgressGuard {
    /// Start a bar of `len` ticks.
    pub fn new(mode: ProgressMode, len: u64) -> Self {
        let bar = match mode {
            ProgressMode::Off => None,
            ProgressMode::Hidden => Some(ProgressBar::hidden()),
            ProgressMode::Stderr => {
                let bar = ProgressBar::new(len);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} gates")
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                Some(bar)
            }
        };
        if let Some(bar) = &bar {
            bar.set_length(len);
        }
        Self { bar }
    }

    /// Advance by one gate.
    pub fn tick(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    /// The underlying bar, if one is drawn or tracked.
    pub fn bar(&self) -> Option<&ProgressBar> {
        self.bar.as_ref()
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

/// Cooperative cancellation flag shared with a running simulation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The run stops before its next gate.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
