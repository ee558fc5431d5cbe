use clap::Parser;
use tl431_calc::{report, Params, Series, Tl431Calc, DEFAULT_RESULTS};
use tracing_subscriber::EnvFilter;

use std::process::ExitCode;

/// Calculate TL431 resistor divider and series resistor values for a target Vout.
#[derive(Debug, Parser)]
#[command(name = "tl431-calc", version, about)]
struct Cli {
    /// Minimum input supply voltage (V)
    #[arg(long, allow_negative_numbers = true)]
    vin: f64,

    /// Required output voltage (V)
    #[arg(long, allow_negative_numbers = true)]
    vout: f64,

    /// Resistor series to draw values from (E12, E24, E48 or kit)
    #[arg(long, default_value = "E12")]
    series: Series,

    /// Minimum TL431 cathode current (mA)
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    ik_min: f64,

    /// Maximum TL431 cathode current (mA)
    #[arg(long, default_value_t = 20.0, allow_negative_numbers = true)]
    ik_max: f64,

    /// Maximum current through the R1/R2 divider (mA)
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    idiv_max: f64,

    /// Maximum current through Rs (mA), unlimited if not given
    #[arg(long, allow_negative_numbers = true)]
    irs_max: Option<f64>,

    /// Maximum number of results to print
    #[arg(long, default_value_t = DEFAULT_RESULTS)]
    results: usize,

    /// Print the modelled circuit before the results
    #[arg(long)]
    schematic: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    fn params(&self) -> Params {
        let params = Params::new(self.vin, self.vout)
            .series(self.series)
            .ik_range(self.ik_min * 1e-3, self.ik_max * 1e-3)
            .idiv_max(self.idiv_max * 1e-3)
            .max_results(self.results);
        match self.irs_max {
            Some(irs_max) => params.irs_max(irs_max * 1e-3),
            None => params,
        }
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "tl431_calc=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let calc = match Tl431Calc::new(cli.params()) {
        Ok(calc) => calc,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let results = calc.search();
    print!("{}", report::render(calc.params(), &results, cli.schematic));
    ExitCode::SUCCESS
}
