use itertools::Itertools;
use tracing::{debug, info};

use std::{cmp::Ordering, fmt, time::Instant};

use crate::{format_resistance, Error, Result, Series};

/// Typical TL431 reference voltage.
pub const VREF: f64 = 2.495;

/// Number of results returned unless [`Params::max_results`] says otherwise.
pub const DEFAULT_RESULTS: usize = 20;

/// Inputs for one search. Currents are in Amperes, voltages in Volts.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    pub vin: f64,
    pub vout: f64,
    pub series: Series,
    pub ik_min: f64,
    pub ik_max: f64,
    pub idiv_max: f64,
    pub irs_max: Option<f64>,
    pub max_results: usize,
}

impl Params {
    /// Parameters for regulating `vout` from a `vin` supply, with the default series and limits:
    /// E12, 1mA to 20mA cathode current and at most 1mA through the divider.
    pub fn new(vin: f64, vout: f64) -> Self {
        Params {
            vin,
            vout,
            series: Series::default(),
            ik_min: 1e-3,
            ik_max: 20e-3,
            idiv_max: 1e-3,
            irs_max: None,
            max_results: DEFAULT_RESULTS,
        }
    }

    pub fn series(mut self, series: Series) -> Self {
        self.series = series;
        self
    }

    /// Allowed TL431 cathode current range.
    pub fn ik_range(mut self, min: f64, max: f64) -> Self {
        self.ik_min = min;
        self.ik_max = max;
        self
    }

    pub fn idiv_max(mut self, max: f64) -> Self {
        self.idiv_max = max;
        self
    }

    /// Upper limit on the current through Rs. Unlimited by default.
    pub fn irs_max(mut self, max: f64) -> Self {
        self.irs_max = Some(max);
        self
    }

    pub fn max_results(mut self, count: usize) -> Self {
        self.max_results = count;
        self
    }

    /// Checks the parameters describe a circuit that can be searched.
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: String) -> Result<()> {
            Err(Error::InvalidArgument(msg))
        }

        if !self.vin.is_finite() || self.vin <= 0.0 {
            return invalid(format!("Vin must be a positive voltage, got {}", self.vin));
        }
        if !self.vout.is_finite() || self.vout < VREF {
            return invalid(format!(
                "Vout must be at least the {}V reference, got {}",
                VREF, self.vout
            ));
        }
        if !self.ik_min.is_finite() || self.ik_min < 0.0 {
            return invalid(format!("Ik min must not be negative, got {}", self.ik_min));
        }
        if !self.ik_max.is_finite() || self.ik_max <= 0.0 {
            return invalid(format!("Ik max must be positive, got {}", self.ik_max));
        }
        if self.ik_min > self.ik_max {
            return invalid(format!(
                "Ik min ({}) is greater than Ik max ({})",
                self.ik_min, self.ik_max
            ));
        }
        if !self.idiv_max.is_finite() || self.idiv_max <= 0.0 {
            return invalid(format!("Idiv max must be positive, got {}", self.idiv_max));
        }
        if let Some(irs_max) = self.irs_max {
            if !irs_max.is_finite() || irs_max <= 0.0 {
                return invalid(format!("Irs max must be positive, got {}", irs_max));
            }
        }
        Ok(())
    }
}

/// The electrical state of one (R1, R2, Rs) combination.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub r1: f64,
    pub r2: f64,
    pub rs: f64,
    pub vout: f64,
    /// Signed output error, `vout - target`.
    pub error: f64,
    pub error_pct: f64,
    pub idiv: f64,
    pub irs: f64,
    pub ik: f64,
}

impl Evaluation {
    /// Whether this combination keeps every current within the limits of `params`.
    pub fn is_feasible(&self, params: &Params) -> bool {
        self.vout.is_finite()
            && self.irs.is_finite()
            && self.irs > 0.0
            && self.idiv <= params.idiv_max
            && self.ik >= params.ik_min
            && self.ik <= params.ik_max
            && params.irs_max.map_or(true, |max| self.irs <= max)
    }

    // Absolute error in parts per billion of a volt, so near-identical errors rank as equal and
    // fall through to the current tie-breaks.
    fn error_ppb(&self) -> u64 {
        (self.error.abs() * 1e9).round() as u64
    }

    fn rank(&self, other: &Self) -> Ordering {
        self.error_ppb()
            .cmp(&other.error_ppb())
            .then(self.idiv.total_cmp(&other.idiv))
            .then(self.irs.total_cmp(&other.irs))
            .then(self.r1.total_cmp(&other.r1))
            .then(self.r2.total_cmp(&other.r2))
            .then(self.rs.total_cmp(&other.rs))
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sep = if f.alternate() { "\n" } else { ", " };
        write!(
            f,
            "R1: {}{sep}R2: {}{sep}Rs: {}",
            format_resistance(self.r1),
            format_resistance(self.r2),
            format_resistance(self.rs),
            sep = sep
        )
    }
}

/// Main calculator struct
#[derive(Debug)]
pub struct Tl431Calc {
    params: Params,
}

impl Tl431Calc {
    /// Creates a calculator, rejecting parameters that could never describe a working circuit.
    /// # Examples
    /// ```
    ///     # use tl431_calc::*;
    ///     assert!(Tl431Calc::new(Params::new(12.0, 5.0)).is_ok());
    ///     assert!(Tl431Calc::new(Params::new(12.0, 1.8)).is_err());
    /// ```
    pub fn new(params: Params) -> Result<Self> {
        params.validate()?;
        Ok(Tl431Calc { params })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the number of (R1, R2, Rs) triples in the configured series. This maps fairly
    /// directly to the time a search takes.
    pub fn combinations(&self) -> u128 {
        (self.params.series.table().len() as u128).pow(3)
    }

    /// Evaluates a single combination against the parameters, without applying any limits.
    pub fn evaluate(&self, r1: f64, r2: f64, rs: f64) -> Evaluation {
        let target = self.params.vout;
        let vout = VREF * (1.0 + r1 / r2);
        let idiv = VREF / r2;
        let irs = (self.params.vin - vout) / rs;
        let error = vout - target;
        Evaluation {
            r1,
            r2,
            rs,
            vout,
            error,
            error_pct: error / target * 100.0,
            idiv,
            irs,
            ik: irs - idiv,
        }
    }

    /// Searches every combination in the series and returns the feasible ones, most accurate
    /// first, truncated to `max_results`. An empty list means nothing satisfied the limits.
    pub fn search(&self) -> Vec<Evaluation> {
        let params = &self.params;
        if params.max_results == 0 {
            return Vec::new();
        }
        // A shunt regulator can only drop voltage, with no headroom Rs never carries current.
        if params.vin <= params.vout {
            debug!(vin = params.vin, vout = params.vout, "no headroom above target");
            return Vec::new();
        }

        let pool = params.series.table();
        debug!(
            series = %params.series,
            pool = pool.len(),
            combinations = %self.combinations(),
            "starting search"
        );
        let start = Instant::now();

        let mut res: Vec<Evaluation> = pool
            .iter()
            .cloned()
            .cartesian_product(pool.iter().cloned())
            // The divider does not depend on Rs, so prune it before the inner loop.
            .filter(|&(r1, r2)| r1 > 0.0 && r2 > 0.0 && VREF / r2 <= params.idiv_max)
            .flat_map(|(r1, r2)| {
                pool.iter()
                    .filter(|rs| **rs > 0.0)
                    .map(move |&rs| self.evaluate(r1, r2, rs))
            })
            .filter(|e| e.is_feasible(params))
            .collect();

        let feasible = res.len();
        res.sort_by(Evaluation::rank);
        res.truncate(params.max_results);

        info!(
            feasible,
            returned = res.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "search complete"
        );
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn example() -> Tl431Calc {
        Tl431Calc::new(
            Params::new(5.0, 3.65)
                .series(Series::E24)
                .ik_range(1e-3, 20e-3)
                .idiv_max(1e-3),
        )
        .unwrap()
    }

    #[test]
    fn documented_example_figures() {
        let calc = example();
        let e = calc.evaluate(2200.0, 4700.0, 100.0);
        assert!((e.vout - 3.663).abs() < 5e-4);
        assert!((e.error - 0.013).abs() < 5e-4);
        assert!((e.error_pct - 0.35).abs() < 0.01);
        assert!((e.idiv * 1e3 - 0.531).abs() < 5e-4);
        assert!((e.irs * 1e3 - 13.371).abs() < 5e-4);
        assert!((e.ik * 1e3 - 12.840).abs() < 5e-4);
        assert!(e.is_feasible(calc.params()));
    }

    #[test]
    fn example_search_beats_documented_candidate() {
        let calc = example();
        let res = calc.search();
        assert_eq!(res.len(), DEFAULT_RESULTS);
        let documented = calc.evaluate(2200.0, 4700.0, 100.0);
        assert!(res[0].error.abs() <= documented.error.abs());
    }

    #[test]
    fn results_are_feasible_and_conserve_current() {
        let calc = example();
        for e in calc.search() {
            assert!(e.ik >= 1e-3 && e.ik <= 20e-3, "{:?}", e);
            assert!(e.idiv <= 1e-3, "{:?}", e);
            assert!(e.irs > 0.0);
            assert!((e.ik - (e.irs - e.idiv)).abs() < EPS);
            assert!((e.idiv - e.vout / (e.r1 + e.r2)).abs() < EPS);
        }
    }

    #[test]
    fn results_sorted_by_error() {
        let res = example().search();
        assert!(res
            .windows(2)
            .all(|w| w[0].error.abs() <= w[1].error.abs() + 1e-9));
    }

    #[test]
    fn first_result_is_optimal() {
        let calc = Tl431Calc::new(Params::new(12.0, 5.0).series(Series::E12)).unwrap();
        let res = calc.search();
        let pool = Series::E12.table().values();
        let best = pool
            .iter()
            .flat_map(|&r1| pool.iter().map(move |&r2| (r1, r2)))
            .flat_map(|(r1, r2)| pool.iter().map(move |&rs| (r1, r2, rs)))
            .map(|(r1, r2, rs)| calc.evaluate(r1, r2, rs))
            .filter(|e| e.is_feasible(calc.params()))
            .map(|e| e.error.abs())
            .fold(f64::INFINITY, f64::min);
        assert!(!res.is_empty());
        assert!((res[0].error.abs() - best).abs() < 2e-9);
    }

    #[test]
    fn truncates_to_requested_count() {
        let params = Params::new(12.0, 5.0).max_results(3);
        assert_eq!(Tl431Calc::new(params).unwrap().search().len(), 3);
    }

    #[test]
    fn zero_results_requested() {
        let params = Params::new(12.0, 5.0).max_results(0);
        assert!(Tl431Calc::new(params).unwrap().search().is_empty());
    }

    #[test]
    fn vin_not_above_vout_finds_nothing() {
        for vin in &[3.0, 3.3] {
            let calc = Tl431Calc::new(Params::new(*vin, 3.3)).unwrap();
            assert!(calc.search().is_empty());
        }
    }

    #[test]
    fn irs_limit_applies() {
        let calc = Tl431Calc::new(Params::new(12.0, 5.0).irs_max(5e-3)).unwrap();
        let res = calc.search();
        assert!(!res.is_empty());
        assert!(res.iter().all(|e| e.irs <= 5e-3));
    }

    #[test]
    fn deterministic() {
        assert_eq!(example().search(), example().search());
    }

    #[test]
    fn ties_break_on_divider_current() {
        let res = Tl431Calc::new(Params::new(12.0, 5.0).max_results(200))
            .unwrap()
            .search();
        for w in res.windows(2) {
            if w[0].error_ppb() == w[1].error_ppb() {
                assert!(w[0].idiv <= w[1].idiv);
            }
        }
    }

    #[test]
    fn combinations_count() {
        assert_eq!(example().combinations(), 120u128.pow(3));
    }

    #[test]
    fn rejects_bad_params() {
        let bad = vec![
            Params::new(-5.0, 3.3),
            Params::new(f64::NAN, 3.3),
            Params::new(5.0, 1.0),
            Params::new(5.0, 3.3).ik_range(20e-3, 1e-3),
            Params::new(5.0, 3.3).ik_range(-1e-3, 1e-3),
            Params::new(5.0, 3.3).idiv_max(0.0),
            Params::new(5.0, 3.3).irs_max(-1.0),
        ];
        for p in bad {
            assert!(
                matches!(Tl431Calc::new(p.clone()), Err(Error::InvalidArgument(_))),
                "{:?}",
                p
            );
        }
    }

    #[test]
    fn display_values() {
        let e = example().evaluate(2200.0, 4700.0, 100.0);
        assert_eq!(e.to_string(), "R1: 2K2, R2: 4K7, Rs: 100R");
        assert_eq!(format!("{:#}", e), "R1: 2K2\nR2: 4K7\nRs: 100R");
    }
}
