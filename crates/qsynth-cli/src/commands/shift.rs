//! Shift command implementation.

use anyhow::{Context, Result};
use console::style;
use qsynth_arith::cyclic_shift_with;
use qsynth_env::Session;
use qsynth_ir::ResourceCounts;
use qsynth_types::{MeasureOptions, QuantumVariable, Value, get_measurement};

use super::common::{SimOptions, load_simulator, parse_strategy, spinner};

/// Bits needed to hold every value below `n` (at least one).
fn bits_for(n: u64) -> usize {
    (u64::BITS - n.saturating_sub(1).leading_zeros()).max(1) as usize
}

/// Execute the shift command.
///
/// Cell `i` starts out holding `i`; the offset register holds `offset`.
pub fn execute(cells: usize, offset: u64, strategy: &str, sim: &SimOptions) -> Result<()> {
    let strategy = parse_strategy(strategy)?;
    if cells == 0 {
        anyhow::bail!("Need at least one cell");
    }
    println!(
        "{} Shifting {} cells by {} ({:?})",
        style("→").cyan().bold(),
        style(cells).yellow(),
        style(offset).green(),
        strategy
    );

    let cell_width = bits_for(cells as u64);
    let offset_width = bits_for(cells as u64).max(bits_for(offset + 1));

    let mut session = Session::named("shift");
    let vars = (0..cells)
        .map(|i| -> Result<QuantumVariable> {
            let cell = QuantumVariable::integer(&mut session, format!("c{i}"), cell_width)?;
            cell.init(&mut session, i as i64)?;
            Ok(cell)
        })
        .collect::<Result<Vec<_>>>()?;
    let k = QuantumVariable::integer(&mut session, "k", offset_width)?;
    k.init(&mut session, offset as i64)?;

    cyclic_shift_with(&mut session, &vars, &k, strategy).context("Failed to synthesize shift")?;
    let circuit = session.finish()?;

    let counts = ResourceCounts::from_circuit(&circuit);
    println!(
        "  Synthesized: {} qubits, {} controlled swaps, depth {}",
        counts.width,
        counts.count("cswap"),
        counts.depth
    );

    let simulator = load_simulator(sim)?;
    let refs: Vec<&QuantumVariable> = vars.iter().collect();
    let progress = spinner("Simulating...");
    let measurement = get_measurement(&simulator, &circuit, &refs, &MeasureOptions::exact());
    progress.finish_and_clear();
    let measurement = measurement.context("Simulation failed")?;

    let Some(contents) = measurement.most_likely() else {
        anyhow::bail!("Simulation returned no outcomes");
    };
    let rendered: Vec<String> = contents.iter().map(Value::to_string).collect();
    println!(
        "\n{} Cells: [{}]",
        style("✓").green().bold(),
        style(rendered.join(", ")).cyan()
    );

    let n = cells as u64;
    let shifted = (0..n)
        .map(|j| Value::Int(((j + n - offset % n) % n) as i64))
        .collect::<Vec<_>>();
    if contents != shifted.as_slice() {
        anyhow::bail!("Cell contents differ from a rotation by {offset}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_for() {
        assert_eq!(bits_for(1), 1);
        assert_eq!(bits_for(2), 1);
        assert_eq!(bits_for(5), 3);
        assert_eq!(bits_for(8), 3);
    }
}
