mod logging;

use std::{fmt::Write, fs, path::PathBuf, sync::LazyLock};

use clap::Parser;
use isochem::{
    AbbreviationDatabase, AtomicDatabase, Bounds, BoundsMode, Charge, Config, IsochemError, Molecule,
    Simulator, Storage, molecules::mutation::parse_factor,
};
use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, IntoDiagnostic, WrapErr};
use rust_decimal::Decimal;
use rustyline::DefaultEditor;
use tracing::info;

static ATOMIC_DB: LazyLock<AtomicDatabase> = LazyLock::new(AtomicDatabase::default);
static ABBREVIATIONS: LazyLock<AbbreviationDatabase> =
    LazyLock::new(|| AbbreviationDatabase::builtin(&ATOMIC_DB));

const HELP: &str = "\
Enter a formula to simulate its isotope pattern, or modify the current molecule with:
  + <formula>      add atoms (and optionally a charge)
  - <formula>      remove atoms
  * <n>            multiply every atom count by n
  / <n>            divide every atom count by n
  reset            undo every modification
  bounds [p]       confidence bounds of each peak (default p = 0.95)
  :set <key> <v>   change a configuration option
  help             show this message";

/// Calculates isotope patterns, exact masses, and elemental compositions of chemical formulae
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Formulae to report on; starts an interactive session if none are given
    formulae: Vec<String>,
    /// A TOML file of configuration options
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Decimal places the raw isotope pattern is binned to
    #[arg(short, long)]
    decimals: Option<u32>,
    /// Resolving power of the simulated instrument
    #[arg(short, long)]
    resolution: Option<f64>,
    /// Charge used when a formula doesn't specify its own
    #[arg(short = 'z', long, allow_hyphen_values = true)]
    charge: Option<i64>,
    /// Discard raw peaks below this fraction of the tallest peak
    #[arg(short = 't', long)]
    discard_threshold: Option<f64>,
    /// Allocate every bin of a spectrum up front
    #[arg(long)]
    dense: bool,
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Silence all logging
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    logging::setup_logging(args.verbose, args.quiet);

    let config = load_config(&args)?;
    info!(?config, "loaded configuration");
    let simulator = Simulator::new(&ATOMIC_DB, &ABBREVIATIONS, config).map_err(|e| *e)?;

    if args.formulae.is_empty() {
        repl(simulator).into_diagnostic()?;
    } else {
        for formula in &args.formulae {
            match simulator.molecule(formula) {
                Ok(molecule) => print!("{}", molecule_info(&molecule)),
                Err(diagnostic) => render_error(*diagnostic),
            }
        }
    }
    Ok(())
}

fn load_config(args: &Args) -> miette::Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let toml = fs::read_to_string(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to read {}", path.display()))?;
            Config::from_toml(path.display().to_string(), toml).map_err(|e| *e)?
        }
        None => Config::default(),
    };

    if let Some(decimals) = args.decimals {
        config.decimals = decimals;
    }
    if let Some(resolution) = args.resolution {
        config.resolution = resolution;
    }
    if let Some(charge) = args.charge {
        config.charge = Charge::from(charge);
    }
    if let Some(discard_threshold) = args.discard_threshold {
        config.discard_threshold = discard_threshold;
    }
    if args.dense {
        config.storage = Storage::Dense;
    }
    if args.verbose > 0 {
        config.verbose = true;
    }
    config.validate()?;

    Ok(config)
}

fn repl(mut simulator: Simulator<'static>) -> rustyline::Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut molecule: Option<Molecule> = None;
    println!("{HELP}\n");

    while let Ok(line) = rl.readline("Formula: ") {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        rl.add_history_entry(line)?;

        match command(&mut simulator, &mut molecule, line) {
            Ok(Some(output)) => print!("{output}"),
            Ok(None) => println!("{HELP}\n"),
            Err(diagnostic) => render_error(*diagnostic),
        }
    }
    Ok(())
}

// NOTE: Returns `None` when the line wasn't understood, so the help text can be shown
fn command(
    simulator: &mut Simulator<'static>,
    molecule: &mut Option<Molecule<'static>>,
    line: &str,
) -> isochem::Result<Option<String>> {
    if line == "help" {
        return Ok(None);
    }

    if let Some(setting) = line.strip_prefix(":set") {
        let Some((option, value)) = setting.trim().split_once(char::is_whitespace) else {
            return Ok(None);
        };
        let mut config = *simulator.config();
        config.set(option, value)?;
        if let Some(current) = molecule {
            current.reconfigure(config)?;
        }
        *simulator = Simulator::new(&ATOMIC_DB, &ABBREVIATIONS, config)?;
        return Ok(Some(format!("{option} = {value}\n\n")));
    }

    match molecule {
        Some(current) => modify(simulator, current, line).map(Some),
        None => {
            let new = simulator.molecule(line)?;
            let info = molecule_info(&new);
            *molecule = Some(new);
            Ok(Some(info))
        }
    }
}

fn modify(simulator: &Simulator<'static>, molecule: &mut Molecule<'static>, line: &str) -> isochem::Result<String> {
    if let Some(operand) = line.strip_prefix('+') {
        molecule.add(operand.trim())?;
    } else if let Some(operand) = line.strip_prefix('-') {
        molecule.subtract(operand.trim())?;
    } else if let Some(factor) = line.strip_prefix('*') {
        molecule.multiply(parse_factor(factor)?)?;
    } else if let Some(factor) = line.strip_prefix('/') {
        molecule.divide(parse_factor(factor)?)?;
    } else if line == "reset" {
        molecule.reset();
    } else if let Some(confidence) = line.strip_prefix("bounds") {
        let confidence = confidence.trim();
        let confidence = if confidence.is_empty() {
            0.95
        } else {
            confidence.parse().map_err(|_| invalid_confidence(confidence))?
        };
        return bounds_info(molecule, confidence);
    } else {
        *molecule = simulator.molecule(line)?;
    }
    Ok(molecule_info(molecule))
}

fn molecule_info(molecule: &Molecule) -> String {
    let mut buf = String::new();

    let weight = Decimal::from(molecule.molecular_weight()).round_dp(6);
    writeln!(buf, "Formula: {molecule}").unwrap();
    writeln!(buf, "Exact Mass: {:.5}", molecule.exact_mass()).unwrap();
    writeln!(buf, "Molecular Weight: {weight}").unwrap();
    writeln!(buf, "Charge: {}", molecule.charge()).unwrap();
    writeln!(buf, "FWHM: {:.6}", molecule.fwhm()).unwrap();

    writeln!(buf, "Percent Composition:").unwrap();
    for (symbol, fraction) in molecule.percent_composition() {
        let percent = (fraction * Decimal::ONE_HUNDRED).round_dp(2);
        writeln!(buf, "  {symbol:<3} {percent:>7}%").unwrap();
    }

    writeln!(buf, "Isotope Pattern:").unwrap();
    for (mz, intensity) in molecule.bar_pattern().iter() {
        writeln!(buf, "  {mz:>12.5} {intensity:>8.2}").unwrap();
    }

    writeln!(buf).unwrap();
    buf
}

fn bounds_info(molecule: &Molecule, confidence: f64) -> isochem::Result<String> {
    let mut buf = String::new();
    let percent = confidence * 100.0;
    if let Bounds::PerPeak(peaks) = molecule.bounds(confidence, BoundsMode::PerPeak, 0.01)? {
        for (mz, (lower, upper)) in peaks {
            writeln!(buf, "  {mz:>12.5}: {lower:.5} to {upper:.5} ({percent}%)").unwrap();
        }
    }
    if let Bounds::Envelope(lower, upper) = molecule.bounds(confidence, BoundsMode::Envelope, 0.01)? {
        writeln!(buf, "  Envelope: {lower:.5} to {upper:.5} ({percent}%)").unwrap();
    }
    writeln!(buf).unwrap();
    Ok(buf)
}

fn invalid_confidence(text: &str) -> Box<IsochemError> {
    isochem::molecules::config::ConfigError::InvalidValue {
        option: "confidence".to_owned(),
        value: text.to_owned(),
    }
    .into()
}

fn render_error(diagnostic: impl Into<Box<dyn Diagnostic + 'static>>) {
    let mut buf = String::new();
    GraphicalReportHandler::new_themed(GraphicalTheme::unicode())
        .render_report(&mut buf, diagnostic.into().as_ref())
        .unwrap();
    println!("{buf}");
}
