//! A resistor value finder for TL431 shunt regulator circuits.
//!
//! The TL431 regulates its cathode so that the reference pin sits at `VREF`. With a divider R1/R2
//! from the output to the reference pin and a series resistor Rs from the supply, the output
//! voltage is set by R1/R2 alone while Rs has to feed both the divider and enough cathode current
//! to keep the regulator in its operating range:
//!
//! ```text
//! VIN -- Rs ----------- VOUT
//!         |       |
//!         R1      |
//!         |       K
//!         |---R TL431
//!         |       A
//!         R2      |
//!         |       |
//! GND ----------------- GND
//! ```
//!
//! Every (R1, R2, Rs) triple drawn from a standard series is evaluated, combinations breaking the
//! current limits are dropped and the rest are presented in order of increasing inaccuracy.
//!
//! # Example
//! ```rust
//! use tl431_calc::*;
//!
//! let calc = Tl431Calc::new(
//!     Params::new(5.0, 3.65)
//!         .series(Series::E24)
//!         .ik_range(1e-3, 20e-3)
//!         .idiv_max(1e-3)
//!         .max_results(5),
//! )
//! .expect("valid parameters");
//!
//! println!("Number of combinations: {}", calc.combinations());
//!
//! for res in calc.search() {
//!     println!("{} -> {:.4}V", res, res.vout);
//! }
//! ```

#[macro_use]
extern crate lazy_static;

use itertools::Itertools;

use std::{fmt, str::FromStr};

mod error;
pub mod report;
mod search;

pub use error::{Error, Result};
pub use search::{Evaluation, Params, Tl431Calc, DEFAULT_RESULTS, VREF};

/// Decade multipliers applied to the three digit base values, giving 10R .. 953K.
const DECADES: &[f64] = &[1e0, 1e1, 1e2, 1e3, 1e4];

lazy_static! {
    /// The small set of values commonly sold in resistor kits.
    pub static ref KIT: RSeries = RSeries::new(&[100, 120, 150, 220, 330, 470, 680]);
    /// RSeries constant for the E12 standard series
    pub static ref E12: RSeries = RSeries::extend(&KIT, &[180, 270, 390, 560, 820]);
    /// RSeries constant for the E24 standard series
    pub static ref E24: RSeries = RSeries::extend(
        &E12,
        &[110, 130, 160, 200, 240, 300, 360, 430, 510, 620, 750, 910]
    );
    /// RSeries constant for the E48 standard series
    pub static ref E48: RSeries = RSeries::new(&[
        100, 105, 110, 115, 121, 127, 133, 140, 147, 154, 162, 169, 178, 187, 196, 205, 215, 226,
        237, 249, 261, 274, 287, 301, 316, 332, 348, 365, 383, 402, 422, 442, 464, 487, 511, 536,
        562, 590, 619, 649, 681, 715, 750, 787, 825, 866, 909, 953,
    ]);
}

/// A pool of resistor values, sorted ascending and free of duplicates.
#[derive(Debug)]
pub struct RSeries {
    values: Box<[f64]>,
}

impl RSeries {
    fn new(base: &[u16]) -> Self {
        Self::from_values(Self::expand(base).collect())
    }

    fn extend(base: &RSeries, add: &[u16]) -> Self {
        Self::from_values(base.iter().cloned().chain(Self::expand(add)).collect())
    }

    // Integer arithmetic up to the final division keeps values such as 2200 exact.
    fn expand(base: &[u16]) -> impl Iterator<Item = f64> + '_ {
        base.iter()
            .cartesian_product(DECADES.iter())
            .map(|(val, pow)| f64::from(*val) * pow / 10.0)
    }

    fn from_values(mut values: Vec<f64>) -> Self {
        values.sort_by(f64::total_cmp);
        values.dedup();
        RSeries {
            values: values.into_boxed_slice(),
        }
    }

    /// Iterates over the values in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &f64> + Clone {
        self.values.iter()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The series a search may draw its values from.
///
/// E96 and E192 are deliberately not offered, the cubic search space gets too large for them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Series {
    Kit,
    #[default]
    E12,
    E24,
    E48,
}

impl Series {
    /// The expanded value pool for this series.
    pub fn table(self) -> &'static RSeries {
        match self {
            Series::Kit => &KIT,
            Series::E12 => &E12,
            Series::E24 => &E24,
            Series::E48 => &E48,
        }
    }
}

impl FromStr for Series {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kit" | "default" => Ok(Series::Kit),
            "e12" => Ok(Series::E12),
            "e24" => Ok(Series::E24),
            "e48" => Ok(Series::E48),
            "e96" | "e192" => Err(Error::InvalidSeries {
                name: s.to_string(),
                reason: "too large to search, use E12, E24 or E48",
            }),
            _ => Err(Error::InvalidSeries {
                name: s.to_string(),
                reason: "unknown series, expected E12, E24, E48 or kit",
            }),
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Series::Kit => "kit",
            Series::E12 => "E12",
            Series::E24 => "E24",
            Series::E48 => "E48",
        })
    }
}

fn format_rval(r: f64, unit: &str) -> String {
    let mut val = format!("{}", r);
    if val.contains('.') {
        val.replace('.', unit)
    } else {
        val.push_str(unit);
        val
    }
}

/// Formats a resistance the way it is marked on schematics: `100R`, `2K2`, `1M`.
pub fn format_resistance(r: f64) -> String {
    if r < 1000.0 {
        format_rval(r, "R")
    } else if r < 1_000_000.0 {
        format_rval(r / 1000.0, "K")
    } else {
        format_rval(r / 1_000_000.0, "M")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_sizes() {
        assert_eq!(KIT.len(), 7 * 5);
        assert_eq!(E12.len(), 12 * 5);
        assert_eq!(E24.len(), 24 * 5);
        assert_eq!(E48.len(), 48 * 5);
    }

    #[test]
    fn pools_are_sorted_and_distinct() {
        for series in &[Series::Kit, Series::E12, Series::E24, Series::E48] {
            let vals = series.table().values();
            assert!(vals.windows(2).all(|w| w[0] < w[1]), "{} not strictly ascending", series);
            assert!(vals.iter().all(|v| *v > 0.0));
        }
    }

    #[test]
    fn pool_range() {
        assert_eq!(E12.values()[0], 10.0);
        assert_eq!(*E12.values().last().unwrap(), 820_000.0);
        assert_eq!(*E48.values().last().unwrap(), 953_000.0);
    }

    #[test]
    fn values_are_exact() {
        let vals = E24.values();
        for exact in &[100.0, 2200.0, 4700.0, 11_000.0, 910_000.0] {
            assert!(vals.contains(exact), "missing {}", exact);
        }
    }

    #[test]
    fn e12_contains_kit() {
        assert!(KIT.iter().all(|v| E12.values().contains(v)));
    }

    #[test]
    fn parse_series() {
        assert_eq!("E12".parse::<Series>(), Ok(Series::E12));
        assert_eq!("e24".parse::<Series>(), Ok(Series::E24));
        assert_eq!(" E48 ".parse::<Series>(), Ok(Series::E48));
        assert_eq!("default".parse::<Series>(), Ok(Series::Kit));
        assert_eq!(Series::default(), Series::E12);
    }

    #[test]
    fn large_series_rejected() {
        for name in &["E96", "e192"] {
            match name.parse::<Series>() {
                Err(Error::InvalidSeries { reason, .. }) => assert!(reason.contains("too large")),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!(matches!("E6".parse::<Series>(), Err(Error::InvalidSeries { .. })));
    }

    #[test]
    fn resistance_format() {
        assert_eq!(format_resistance(100.0), "100R");
        assert_eq!(format_resistance(10.5), "10R5");
        assert_eq!(format_resistance(2200.0), "2K2");
        assert_eq!(format_resistance(4700.0), "4K7");
        assert_eq!(format_resistance(1000.0), "1K");
        assert_eq!(format_resistance(1_500_000.0), "1M5");
    }
}
