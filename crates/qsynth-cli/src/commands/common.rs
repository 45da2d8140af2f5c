//! Shared helpers for CLI commands.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use qsynth_arith::ShiftStrategy;
use qsynth_sim::{ProgressMode, Simulator, SimulatorConfig};
use qsynth_types::Value;

/// Simulator settings taken from global flags.
pub struct SimOptions {
    /// YAML configuration file.
    pub config: Option<PathBuf>,
    /// Draw a progress bar.
    pub progress: bool,
}

/// Build a simulator from the configuration file, if any, and the
/// `QSYNTH_SIM_*` environment.
pub fn load_simulator(options: &SimOptions) -> Result<Simulator> {
    let mut config = match &options.config {
        Some(path) => SimulatorConfig::from_file(path)
            .and_then(SimulatorConfig::merge_env)
            .with_context(|| format!("Failed to load simulator config: {}", path.display()))?,
        None => SimulatorConfig::from_env().context("Invalid QSYNTH_SIM_* environment")?,
    };
    if options.progress {
        config = config.with_progress(ProgressMode::Stderr);
    }
    Simulator::new(config).context("Failed to create simulator")
}

/// Smallest register width `w` with `modulus ≤ 2^w`.
pub fn width_for(modulus: u64) -> Result<usize> {
    if modulus < 2 {
        anyhow::bail!("Modulus must be at least 2, got {modulus}");
    }
    Ok((u64::BITS - (modulus - 1).leading_zeros()) as usize)
}

/// Parse a shift strategy name.
pub fn parse_strategy(name: &str) -> Result<ShiftStrategy> {
    match name.to_lowercase().as_str() {
        "doubling" | "log" => Ok(ShiftStrategy::Doubling),
        "naive" | "linear" => Ok(ShiftStrategy::Naive),
        other => anyhow::bail!("Unknown strategy: '{other}'. Available: doubling, naive"),
    }
}

/// Spinner shown while a circuit is synthesized or simulated.
pub fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Print a decoded distribution as a table with bars.
pub fn print_distribution(name: &str, outcomes: &[(Value, f64)]) {
    println!("\n{} Distribution of {}:", style("✓").green().bold(), style(name).cyan());

    for (value, p) in outcomes.iter().take(16) {
        let percent = p * 100.0;
        let bar: String = "█".repeat((percent / 2.0).round() as usize);
        println!(
            "  {:>6}: {:>6.2}% {}",
            style(value).cyan(),
            percent,
            style(bar).green()
        );
    }

    if outcomes.len() > 16 {
        println!("  ... and {} more outcomes", outcomes.len() - 16);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_for() {
        assert_eq!(width_for(2).unwrap(), 1);
        assert_eq!(width_for(7).unwrap(), 3);
        assert_eq!(width_for(8).unwrap(), 3);
        assert_eq!(width_for(9).unwrap(), 4);
        assert!(width_for(1).is_err());
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!(parse_strategy("Doubling").unwrap(), ShiftStrategy::Doubling);
        assert_eq!(parse_strategy("naive").unwrap(), ShiftStrategy::Naive);
        assert!(parse_strategy("bubble").is_err());
    }

    #[test]
    fn test_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.yaml");
        std::fs::write(&path, "max_qubits: 12\nseed: 3\n").unwrap();
        let options = SimOptions {
            config: Some(path),
            progress: false,
        };
        let sim = load_simulator(&options).unwrap();
        assert_eq!(sim.config().max_qubits, 12);
    }

    #[test]
    fn test_missing_config_file_names_path() {
        let options = SimOptions {
            config: Some(PathBuf::from("/nonexistent/qsynth-sim.yaml")),
            progress: false,
        };
        let err = load_simulator(&options).err().unwrap();
        assert!(format!("{err:#}").contains("/nonexistent/qsynth-sim.yaml"));
    }
}
