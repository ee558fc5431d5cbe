//! Plain text rendering of search parameters and results.

use std::fmt::{self, Write};

use crate::{format_resistance, Evaluation, Params};

pub const SCHEMATIC: &str = "
VIN -- Rs ----------- VOUT
        |       |
        R1      |
        |       K
        |---R TL431
        |       A
        R2      |
        |       |
GND ----------------- GND
";

pub const NO_SOLUTION: &str = "No combination found within constraints";

const HEADINGS: [&str; 8] = [
    "R1 Ω",
    "R2 Ω",
    "Rs Ω",
    "Vout V",
    "VOUT Err V/%",
    "Idiv mA",
    "Irs mA",
    "Ik mA",
];
const WIDTHS: [usize; 8] = [7, 7, 7, 9, 20, 9, 8, 8];

/// One line restating what was searched for.
pub fn write_header(out: &mut impl Write, params: &Params) -> fmt::Result {
    write!(
        out,
        "Target Vout: {:.3} V | Vin: {:.3} V | Series: {} | Ik: {:.3}-{:.3} mA | Idiv max: {:.3} mA",
        params.vout,
        params.vin,
        params.series,
        params.ik_min * 1e3,
        params.ik_max * 1e3,
        params.idiv_max * 1e3,
    )?;
    if let Some(irs_max) = params.irs_max {
        write!(out, " | Irs max: {:.3} mA", irs_max * 1e3)?;
    }
    writeln!(out)
}

fn write_row<I>(out: &mut impl Write, cells: I) -> fmt::Result
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    for (i, (cell, width)) in cells.into_iter().zip(WIDTHS.iter()).enumerate() {
        if i > 0 {
            out.write_str(" | ")?;
        }
        write!(out, "{:>width$}", cell.as_ref(), width = *width)?;
    }
    writeln!(out)
}

/// The result table, or the no solution message when `results` is empty.
pub fn write_table(out: &mut impl Write, results: &[Evaluation]) -> fmt::Result {
    if results.is_empty() {
        return writeln!(out, "{}", NO_SOLUTION);
    }

    write_row(out, HEADINGS)?;
    let rule = WIDTHS.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    writeln!(out, "{}", rule.join("-+-"))?;

    for e in results {
        write_row(
            out,
            [
                format_resistance(e.r1),
                format_resistance(e.r2),
                format_resistance(e.rs),
                format!("{:.6}", e.vout),
                format!("{:+.6}/{:+.3}", e.error, e.error_pct),
                format!("{:.6}", e.idiv * 1e3),
                format!("{:.3}", e.irs * 1e3),
                format!("{:.3}", e.ik * 1e3),
            ],
        )?;
    }
    Ok(())
}

/// Writes the full report: optional schematic, header and table.
pub fn write_report(
    out: &mut impl Write,
    params: &Params,
    results: &[Evaluation],
    schematic: bool,
) -> fmt::Result {
    if schematic {
        writeln!(out, "Schematic{}", SCHEMATIC)?;
    }
    write_header(out, params)?;
    writeln!(out)?;
    write_table(out, results)
}

/// [`write_report`] into a `String`.
pub fn render(params: &Params, results: &[Evaluation], schematic: bool) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(&mut out, params, results, schematic);
    out
}
