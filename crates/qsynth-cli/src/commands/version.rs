//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - quantum arithmetic synthesis with automatic uncomputation",
        style("qsynth").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qsynth-ir     Qubit allocator and circuit graph");
    println!("  qsynth-env    Scoped environments and uncomputation");
    println!("  qsynth-types  Quantum variables and decoders");
    println!("  qsynth-arith  Arithmetic synthesis");
    println!("  qsynth-sim    State-vector simulator");
    println!();
    println!("License: {}", style(env!("CARGO_PKG_LICENSE")).dim());
}
