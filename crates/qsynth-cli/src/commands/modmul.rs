//! Modmul command implementation.

use anyhow::{Context, Result};
use console::style;
use qsynth_arith::mod_multiply;
use qsynth_env::Session;
use qsynth_ir::ResourceCounts;
use qsynth_types::{MeasureOptions, QuantumVariable, Value};

use super::common::{SimOptions, load_simulator, print_distribution, spinner, width_for};

/// Execute the modmul command.
pub fn execute(
    a: u64,
    modulus: u64,
    x0: u64,
    shots: Option<u32>,
    seed: Option<u64>,
    sim: &SimOptions,
) -> Result<()> {
    println!(
        "{} Computing {} · {} mod {}",
        style("→").cyan().bold(),
        style(a).yellow(),
        style(x0).green(),
        style(modulus).yellow()
    );

    let width = width_for(modulus)?;
    if x0 >= modulus {
        anyhow::bail!("x must be below the modulus, got {x0} >= {modulus}");
    }

    let mut session = Session::named("modmul");
    let x = QuantumVariable::integer(&mut session, "x", width)?;
    x.init(&mut session, x0 as i64)
        .context("Failed to initialize x")?;
    mod_multiply(&mut session, &x, a, modulus, &[])
        .with_context(|| format!("Failed to synthesize {a}·x mod {modulus}"))?;
    let circuit = session.finish()?;

    let counts = ResourceCounts::from_circuit(&circuit);
    println!(
        "  Synthesized: {} qubits, {} ops, depth {}",
        counts.width, counts.total, counts.depth
    );

    let simulator = load_simulator(sim)?;
    let options = MeasureOptions {
        shots,
        seed,
        ..MeasureOptions::default()
    };

    let progress = spinner("Simulating...");
    let outcomes = x.get_measurement(&simulator, &circuit, &options);
    progress.finish_and_clear();
    let outcomes = outcomes.context("Simulation failed")?;

    print_distribution("x", &outcomes);

    let expected = Value::Int(((u128::from(a) * u128::from(x0)) % u128::from(modulus)) as i64);
    match outcomes.first() {
        Some((value, _)) if *value == expected => {
            println!("\n  Expected {}: {}", style(&expected).cyan(), style("ok").green());
        }
        _ => {
            anyhow::bail!("Most likely outcome differs from the expected {expected}");
        }
    }

    Ok(())
}
