//! Resources command implementation.

use anyhow::{Context, Result};
use console::style;
use qsynth_arith::{mod_exp, mod_multiply};
use qsynth_env::Session;
use qsynth_ir::ResourceCounts;
use qsynth_types::QuantumVariable;

use super::common::width_for;

/// Synthesize the fragment and count its resources.
fn count(a: u64, modulus: u64, exponent_bits: Option<usize>) -> Result<ResourceCounts> {
    let width = width_for(modulus)?;
    let mut session = Session::named("resources");
    match exponent_bits {
        Some(bits) => {
            let exponent = QuantumVariable::integer(&mut session, "e", bits)?;
            let x = QuantumVariable::integer(&mut session, "x", width)?;
            mod_exp(&mut session, &exponent, &x, a, modulus)
                .with_context(|| format!("Failed to synthesize {a}^e mod {modulus}"))?;
        }
        None => {
            let x = QuantumVariable::integer(&mut session, "x", width)?;
            mod_multiply(&mut session, &x, a, modulus, &[])
                .with_context(|| format!("Failed to synthesize {a}·x mod {modulus}"))?;
        }
    }
    Ok(ResourceCounts::from_circuit(&session.finish()?))
}

/// Execute the resources command.
pub fn execute(a: u64, modulus: u64, exponent_bits: Option<usize>, format: &str) -> Result<()> {
    let counts = count(a, modulus, exponent_bits)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
        "table" => {
            let fragment = match exponent_bits {
                Some(bits) => format!("{a}^e mod {modulus} ({bits} exponent bits)"),
                None => format!("{a}·x mod {modulus}"),
            };
            println!(
                "{} Resources for {}",
                style("✓").green().bold(),
                style(fragment).cyan()
            );
            for line in counts.to_string().lines() {
                println!("  {line}");
            }
        }
        other => {
            anyhow::bail!("Unknown format: '{other}'. Available: table, json");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modmul_counts() {
        let counts = count(7, 15, None).unwrap();
        // x, the work register and the flag.
        assert_eq!(counts.width, 4 + 5 + 1);
        assert_eq!(counts.measurements, 0);
        assert!(counts.count("h") > 0);
    }

    #[test]
    fn test_exponent_bits_scale_operations() {
        let one = count(7, 15, Some(1)).unwrap();
        let two = count(7, 15, Some(2)).unwrap();
        assert_eq!(two.width, 2 + 4 + 5 + 1);
        assert!(two.total > one.total);
    }

    #[test]
    fn test_non_invertible_multiplier() {
        let err = count(5, 15, None).unwrap_err();
        assert!(format!("{err:#}").contains("no inverse"));
    }
}
