use super::CliError;
use super::helpers::{
    BANNER, render_demo_message, render_input_summary, render_measurement_table,
    render_shortcut_table,
};
use super::session::SessionDriver;
use anyhow::Context;
use nifty_core::common::{EngineConfig, EngineConfigError, WavelengthUnit, load_engine_config};
use nifty_core::domain::NiftyError;
use nifty_core::io::{
    IoError, SpectrumFormat, SpectrumRequest, load_feature_list, load_line_catalog,
    load_measurement_file, load_spectrum,
};
use nifty_core::spectrum::{ModelInputs, ShiftOutcome};
use nifty_core::synth::{SyntheticSpectrumSpec, create_spectrum};
use nifty_core::workbench::{RestoreReport, Workbench};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(clap::Args)]
pub(super) struct SessionFlags {
    /// Measurement file; restored when it exists and written by `save`
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON engine configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read session commands from this file instead of stdin
    #[arg(long)]
    script: Option<PathBuf>,

    /// Do not print the banner and input summary
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::Args)]
#[command(group(clap::ArgGroup::new("feature_units").args(["feature_unit", "match_units"])))]
pub(super) struct SessionArgs {
    /// Spectrum file
    #[arg(short, long)]
    input: PathBuf,

    /// Spectrum format (ascii, json, fits); inferred from the extension when omitted
    #[arg(short = 't', long = "format", alias = "type")]
    format: Option<SpectrumFormat>,

    /// Wavelength unit of the spectrum
    #[arg(long, default_value = "angstrom")]
    unit: WavelengthUnit,

    /// Wavelength column or key
    #[arg(long)]
    xkey: Option<String>,

    /// Flux column or key
    #[arg(long)]
    ykey: Option<String>,

    /// Feature list file
    #[arg(short, long)]
    features: PathBuf,

    /// Wavelength unit of the feature list and line catalogs
    #[arg(long)]
    feature_unit: Option<WavelengthUnit>,

    /// Pick the feature unit that places the most features inside the spectrum
    #[arg(long)]
    match_units: bool,

    /// Reference spectrum, read like the input spectrum
    #[arg(long = "ref")]
    reference: Option<PathBuf>,

    /// Stellar line catalog files or glob patterns
    #[arg(long, num_args = 1..)]
    stellar: Vec<String>,

    /// Interstellar line catalog files or glob patterns
    #[arg(long, num_args = 1..)]
    interstellar: Vec<String>,

    #[command(flatten)]
    flags: SessionFlags,
}

#[derive(clap::Args)]
pub(super) struct DemoArgs {
    /// Random seed of the synthetic spectrum
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Number of samples
    #[arg(long, default_value_t = 300)]
    values: usize,

    /// Number of absorption features
    #[arg(long = "feature-count", default_value_t = 3)]
    feature_count: usize,

    /// Signal to noise ratio of the continuum
    #[arg(long, default_value_t = 10.0)]
    sn: f64,

    #[command(flatten)]
    flags: SessionFlags,
}

#[derive(clap::Args)]
pub(super) struct SummaryArgs {
    /// Measurement file to summarise
    #[arg(value_name = "FILE")]
    path: PathBuf,
}

pub(super) fn run_session_command(args: SessionArgs) -> Result<i32, CliError> {
    let config = engine_config(args.flags.config.as_deref())?;

    let mut request = SpectrumRequest::new(&args.input);
    request.format = args.format;
    request.unit = args.unit;
    request.x_key = args.xkey.clone();
    request.y_key = args.ykey.clone();
    let data = load_spectrum(&request).map_err(io_error)?;

    let raw_features = load_feature_list(&args.features, WavelengthUnit::Angstrom).map_err(io_error)?;
    let feature_unit = if args.match_units {
        WavelengthUnit::best_match(&raw_features, &data.wavelength).ok_or_else(|| {
            CliError::Compute(NiftyError::input_validation(
                "INPUT.UNIT_MATCH",
                format!(
                    "no wavelength unit places any feature of '{}' inside the spectrum",
                    args.features.display()
                ),
            ))
        })?
    } else {
        args.feature_unit.unwrap_or_default()
    };
    let features = feature_unit.to_angstrom(&raw_features);

    let mut inputs = ModelInputs::new(data, features);
    if let Some(reference) = &args.reference {
        let mut reference_request = request.clone();
        reference_request.path = reference.clone();
        reference_request.format = None;
        inputs.reference = Some(load_spectrum(&reference_request).map_err(io_error)?);
    }
    if !args.stellar.is_empty() {
        inputs.stellar_lines = Some(load_line_catalog(&args.stellar, feature_unit).map_err(io_error)?);
    }
    if !args.interstellar.is_empty() {
        inputs.interstellar_lines =
            Some(load_line_catalog(&args.interstellar, feature_unit).map_err(io_error)?);
    }

    let workbench = Workbench::new(config, inputs).map_err(|error| CliError::Compute(error.into()))?;

    if !args.flags.quiet {
        println!("{BANNER}");
        println!(
            "{}",
            render_input_summary(&[
                ("Input", args.input.display().to_string()),
                ("Format", request.resolved_format().to_string()),
                ("Unit", args.unit.to_string()),
                ("X-Key", args.xkey.clone().unwrap_or_else(|| "-".to_string())),
                ("Y-Key", args.ykey.clone().unwrap_or_else(|| "-".to_string())),
                ("Features", args.features.display().to_string()),
                ("Feature unit", feature_unit.to_string()),
                ("Matching", args.match_units.to_string()),
                ("Reference spectrum", display_optional(args.reference.as_deref())),
                ("Stellar lines", display_patterns(&args.stellar)),
                ("Interstellar lines", display_patterns(&args.interstellar)),
                ("Output", display_optional(args.flags.output.as_deref())),
            ])
        );
    }

    drive_session(workbench, &args.flags)
}

pub(super) fn run_demo_command(args: DemoArgs) -> Result<i32, CliError> {
    let config = engine_config(args.flags.config.as_deref())?;
    let synthetic = create_spectrum(&SyntheticSpectrumSpec {
        number_of_values: args.values,
        number_of_features: args.feature_count,
        signal_to_noise: args.sn,
        seed: args.seed,
        ..SyntheticSpectrumSpec::default()
    })
    .map_err(|error| CliError::Compute(error.into()))?;

    let workbench = Workbench::new(
        config,
        ModelInputs::new(synthetic.columns, synthetic.features),
    )
    .map_err(|error| CliError::Compute(error.into()))?;

    if !args.flags.quiet {
        println!("{BANNER}");
        println!("{}", render_demo_message());
    }
    drive_session(workbench, &args.flags)
}

pub(super) fn run_summary_command(args: SummaryArgs) -> Result<i32, CliError> {
    let file = load_measurement_file(&args.path).map_err(io_error)?;
    println!("{}", render_measurement_table(&file));
    Ok(0)
}

pub(super) fn run_shortcuts_command() -> Result<i32, CliError> {
    println!("{}", render_shortcut_table());
    Ok(0)
}

fn drive_session(mut workbench: Workbench, flags: &SessionFlags) -> Result<i32, CliError> {
    if let Some(output) = flags.output.as_deref().filter(|path| path.exists()) {
        let file = load_measurement_file(output).map_err(io_error)?;
        let report = workbench.restore(file);
        println!("{}", describe_restore(output, &report));
    }

    let stdout = std::io::stdout();
    let mut driver = SessionDriver::new(workbench, flags.output.clone(), stdout.lock());
    match &flags.script {
        Some(script) => {
            let file = File::open(script)
                .with_context(|| format!("failed to open session script '{}'", script.display()))?;
            driver.run(BufReader::new(file))?;
        }
        None => driver.run(std::io::stdin().lock())?,
    }
    Ok(0)
}

fn describe_restore(path: &Path, report: &RestoreReport) -> String {
    let mut lines = Vec::new();
    if report.records.is_restored() {
        lines.push(format!("Restored measurements from {}.", path.display()));
    } else {
        lines.push(format!(
            "Measurements in {} do not match the feature list; starting with empty records.",
            path.display()
        ));
    }
    if !report.ignored_shift_keys.is_empty() {
        lines.push(format!(
            "Ignored stored velocity shifts with unknown keys: {}.",
            report.ignored_shift_keys.join(", ")
        ));
    }
    for outcome in &report.applied_shifts {
        if let ShiftOutcome::Applied {
            target,
            velocity_kms,
        } = outcome
        {
            lines.push(format!("Restored {target} velocity shift of {velocity_kms} km/s."));
        }
    }
    lines.join("\n")
}

fn engine_config(path: Option<&Path>) -> Result<EngineConfig, CliError> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    load_engine_config(path).map_err(|error| {
        let placeholder = match error {
            EngineConfigError::Read { .. } => "IO.CONFIG_READ",
            EngineConfigError::Parse { .. } => "INPUT.CONFIG_PARSE",
            EngineConfigError::Invalid { .. } => "INPUT.CONFIG_INVALID",
        };
        let diagnostic = match error {
            EngineConfigError::Read { .. } => NiftyError::io_system(placeholder, error.to_string()),
            _ => NiftyError::input_validation(placeholder, error.to_string()),
        };
        CliError::Compute(diagnostic)
    })
}

fn io_error(error: IoError) -> CliError {
    CliError::Compute(error.into())
}

fn display_optional(path: Option<&Path>) -> String {
    path.map_or_else(|| "-".to_string(), |path| path.display().to_string())
}

fn display_patterns(patterns: &[String]) -> String {
    if patterns.is_empty() {
        "-".to_string()
    } else {
        patterns.join(", ")
    }
}
