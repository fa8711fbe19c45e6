use super::CliError;
use super::helpers::{format_measurement, render_shortcut_table};
use anyhow::Context;
use nifty_core::domain::{EngineError, NiftyError, ShiftTarget};
use nifty_core::io::save_measurement_file;
use nifty_core::spectrum::ShiftOutcome;
use nifty_core::workbench::Workbench;
use std::io::{BufRead, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum SessionCommand {
    Next(usize),
    Previous(usize),
    Goto(usize),
    ZoomIn,
    ZoomOut,
    PanUp,
    PanDown,
    Shift(ShiftTarget, f64),
    ShiftUp(ShiftTarget),
    ShiftDown(ShiftTarget),
    Fit(f64, f64),
    Reset,
    Measure(f64, f64),
    Undo,
    Mark,
    Note(String),
    Save,
    Status,
    Help,
    Quit,
}

/// Parses one script line; blank lines and `#` comments yield `None`.
pub(super) fn parse_command(line: &str) -> Result<Option<SessionCommand>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (name, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(name, rest)| (name, rest.trim()));
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match name.to_ascii_lowercase().as_str() {
        "next" | "right" => SessionCommand::Next(optional_count(&args)?),
        "prev" | "previous" | "left" => SessionCommand::Previous(optional_count(&args)?),
        "goto" => SessionCommand::Goto(parse_arg(&args, 0, "feature index")?),
        "zoom-in" | "+" => SessionCommand::ZoomIn,
        "zoom-out" | "-" => SessionCommand::ZoomOut,
        "pan-up" => SessionCommand::PanUp,
        "pan-down" => SessionCommand::PanDown,
        "shift" => SessionCommand::Shift(target_arg(&args)?, parse_arg(&args, 1, "velocity")?),
        "shift-up" | "up" => SessionCommand::ShiftUp(target_arg_or(&args, ShiftTarget::Reference)?),
        "shift-down" | "down" => {
            SessionCommand::ShiftDown(target_arg_or(&args, ShiftTarget::Reference)?)
        }
        "fit" => SessionCommand::Fit(parse_arg(&args, 0, "min")?, parse_arg(&args, 1, "max")?),
        "reset" | "r" => SessionCommand::Reset,
        "ew" | "measure" => {
            SessionCommand::Measure(parse_arg(&args, 0, "min")?, parse_arg(&args, 1, "max")?)
        }
        "undo" | "backspace" => SessionCommand::Undo,
        "mark" | "m" => SessionCommand::Mark,
        "note" | "n" => {
            if rest.is_empty() {
                return Err("note needs some text".to_string());
            }
            SessionCommand::Note(rest.to_string())
        }
        "save" => SessionCommand::Save,
        "status" => SessionCommand::Status,
        "help" | "h" => SessionCommand::Help,
        "quit" | "exit" | "escape" => SessionCommand::Quit,
        other => return Err(format!("unknown command '{other}', try 'help'")),
    };
    Ok(Some(command))
}

fn optional_count(args: &[&str]) -> Result<usize, String> {
    if args.is_empty() {
        return Ok(1);
    }
    parse_arg(args, 0, "step")
}

fn parse_arg<T: std::str::FromStr>(args: &[&str], index: usize, what: &str) -> Result<T, String> {
    let raw = args
        .get(index)
        .ok_or_else(|| format!("missing {what}"))?;
    raw.parse::<T>()
        .map_err(|_| format!("invalid {what} '{raw}'"))
}

fn target_arg(args: &[&str]) -> Result<ShiftTarget, String> {
    let raw = args.first().ok_or_else(|| "missing shift target".to_string())?;
    raw.parse::<ShiftTarget>().map_err(|error| error.to_string())
}

fn target_arg_or(args: &[&str], default: ShiftTarget) -> Result<ShiftTarget, String> {
    if args.is_empty() {
        return Ok(default);
    }
    target_arg(args)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Flow {
    Continue,
    Stop,
}

/// Drives a workbench from text commands, writing responses to `out`.
pub(super) struct SessionDriver<W: Write> {
    workbench: Workbench,
    output_path: Option<PathBuf>,
    out: W,
}

impl<W: Write> SessionDriver<W> {
    pub(super) fn new(workbench: Workbench, output_path: Option<PathBuf>, out: W) -> Self {
        Self {
            workbench,
            output_path,
            out,
        }
    }

    pub(super) fn run(&mut self, input: impl BufRead) -> Result<(), CliError> {
        self.announce_feature()?;
        for (line_index, line) in input.lines().enumerate() {
            let line = line.context("failed to read session command")?;
            match parse_command(&line) {
                Ok(Some(command)) => {
                    if self.execute(command)? == Flow::Stop {
                        break;
                    }
                }
                Ok(None) => {}
                Err(message) => {
                    let advisory = NiftyError::input_validation(
                        "INPUT.SESSION_COMMAND",
                        format!("line {}: {message}", line_index + 1),
                    );
                    self.print(&format!("ADVISORY: [{}] {}", advisory.placeholder(), advisory.message()))?;
                }
            }
        }
        self.out.flush().context("failed to flush session output")?;
        Ok(())
    }

    pub(super) fn execute(&mut self, command: SessionCommand) -> Result<Flow, CliError> {
        match command {
            SessionCommand::Next(step) => {
                self.workbench.select_next(step);
                self.announce_feature()?;
            }
            SessionCommand::Previous(step) => {
                self.workbench.select_previous(step);
                self.announce_feature()?;
            }
            SessionCommand::Goto(index) => {
                self.workbench.select_index(index);
                self.announce_feature()?;
            }
            SessionCommand::ZoomIn => {
                self.workbench.zoom_in();
                self.announce_range()?;
            }
            SessionCommand::ZoomOut => {
                self.workbench.zoom_out();
                self.announce_range()?;
            }
            SessionCommand::PanUp => {
                self.workbench.pan_up();
                self.announce_range()?;
            }
            SessionCommand::PanDown => {
                self.workbench.pan_down();
                self.announce_range()?;
            }
            SessionCommand::Shift(target, velocity) => {
                let outcome = self.workbench.apply_velocity_shift(target, velocity);
                self.announce_shift(outcome)?;
            }
            SessionCommand::ShiftUp(target) => {
                let outcome = self.workbench.shift_up(target);
                self.announce_shift(outcome)?;
            }
            SessionCommand::ShiftDown(target) => {
                let outcome = self.workbench.shift_down(target);
                self.announce_shift(outcome)?;
            }
            SessionCommand::Fit(min, max) => match self.workbench.add_fit_points(min, max) {
                Ok(fit) => {
                    let points = self.workbench.session().fit().indices().len();
                    self.print(&format!(
                        "Continuum fit over {points} point(s): slope={:.6e} intercept={:.6}",
                        fit.slope, fit.intercept
                    ))?;
                }
                Err(error) => self.advise(error)?,
            },
            SessionCommand::Reset => {
                self.workbench.reset_fit();
                self.workbench.reset_range_shift();
                self.print("Fit and range offset reset.")?;
            }
            SessionCommand::Measure(min, max) => match self.workbench.measure_equivalent_width(min, max) {
                Ok(measurement) => {
                    let count = self.workbench.active_record().map_or(0, |record| record.len());
                    self.print(&format!(
                        "Feature {}: {} ({count} result(s))",
                        self.workbench.model().selected_key(),
                        format_measurement(&measurement)
                    ))?;
                }
                Err(error) => self.advise(error)?,
            },
            SessionCommand::Undo => match self.workbench.delete_last_measurement() {
                Ok(measurement) => {
                    let remaining = self.workbench.active_record().map_or(0, |record| record.len());
                    self.print(&format!(
                        "Removed the measurement {} for feature {} - {remaining} result(s) remaining.",
                        format_measurement(&measurement),
                        self.workbench.model().selected_key()
                    ))?;
                }
                Err(error) => self.advise(error)?,
            },
            SessionCommand::Mark => match self.workbench.toggle_mark() {
                Ok(true) => self.print(&format!(
                    "Marked feature {}.",
                    self.workbench.model().selected_key()
                ))?,
                Ok(false) => self.print(&format!(
                    "Removed mark from feature {}.",
                    self.workbench.model().selected_key()
                ))?,
                Err(error) => self.advise(error)?,
            },
            SessionCommand::Note(text) => match self.workbench.append_note(&text) {
                Ok(()) => {
                    let notes = self
                        .workbench
                        .active_record()
                        .map(|record| record.notes().to_string())
                        .unwrap_or_default();
                    self.print(&format!("Full note:\n{}", notes.trim_end()))?;
                }
                Err(error) => self.advise(error)?,
            },
            SessionCommand::Save => self.save()?,
            SessionCommand::Status => {
                let status = serde_json::to_string(&self.workbench.status())
                    .context("failed to serialize session status")?;
                self.print(&status)?;
            }
            SessionCommand::Help => self.print(&render_shortcut_table())?,
            SessionCommand::Quit => return Ok(Flow::Stop),
        }
        Ok(Flow::Continue)
    }

    fn save(&mut self) -> Result<(), CliError> {
        let Some(path) = self.output_path.clone() else {
            let advisory = NiftyError::input_validation(
                "INPUT.NO_OUTPUT",
                "no output file given, start the session with --output to save",
            );
            return self.print(&format!("ADVISORY: [{}] {}", advisory.placeholder(), advisory.message()));
        };
        self.print(&format!("Saving measurements to {}", path.display()))?;
        save_measurement_file(&self.workbench.snapshot(), &path)
            .map_err(|error| CliError::Compute(error.into()))
    }

    fn advise(&mut self, error: EngineError) -> Result<(), CliError> {
        if !error.is_recoverable() {
            tracing::debug!(%error, "non-recoverable engine error reported as advisory");
        }
        self.print(&format!("ADVISORY: [{}] {}", error.placeholder(), error))
    }

    fn announce_feature(&mut self) -> Result<(), CliError> {
        let model = self.workbench.model();
        let line = format!(
            "Feature {}/{}: {} range {}",
            model.selection() + 1,
            model.features().len(),
            model.selected_key(),
            model.range_bounds()
        );
        self.print(&line)
    }

    fn announce_range(&mut self) -> Result<(), CliError> {
        let model = self.workbench.model();
        let line = format!(
            "Range {} (factor {:.6}, offset {:.4})",
            model.range_bounds(),
            model.range_factor(),
            model.range_shift()
        );
        self.print(&line)
    }

    fn announce_shift(&mut self, outcome: ShiftOutcome) -> Result<(), CliError> {
        match outcome {
            ShiftOutcome::Applied {
                target,
                velocity_kms,
            } => self.print(&format!("Shifted {target} to {velocity_kms} km/s.")),
            ShiftOutcome::TargetAbsent { target } => {
                self.print(&format!("No {target} data available for shifting."))
            }
            ShiftOutcome::Rejected {
                target,
                velocity_kms,
            } => {
                let advisory = NiftyError::input_validation(
                    "INPUT.VELOCITY_SHIFT",
                    format!("{target} cannot be shifted to {velocity_kms} km/s, shift unchanged"),
                );
                self.print(&format!("ADVISORY: [{}] {}", advisory.placeholder(), advisory.message()))
            }
        }
    }

    fn print(&mut self, text: &str) -> Result<(), CliError> {
        writeln!(self.out, "{text}").context("failed to write session output")?;
        Ok(())
    }
}
