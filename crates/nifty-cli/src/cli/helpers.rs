use nifty_core::io::MeasurementFile;
use nifty_core::measurement::FeatureMeasurement;
use nifty_core::numerics::stable_sum;
use std::fmt::Write as _;

const RULE_WIDTH: usize = 40;

pub(super) const BANNER: &str = r"
            d8,   ,d8888b
           `8P    88P'      d8P
               d888888P  d888888P
  88bd88b   88b  ?88'      ?88'  ?88   d8P
  88P' ?8b  88P  88P       88P   d88   88
 d88   88P d88  d88        88b   ?8(  d88
d88'   88bd88' d88'        `?8b  `?88P'?8b
                                        )88
                                       ,d8P
                                   `?8888P'
";

/// Session commands and what they do, in help order.
pub(super) const SESSION_COMMANDS: [(&str, &str); 20] = [
    ("next [n]", "jump to the next feature"),
    ("prev [n]", "jump to the previous feature"),
    ("goto <i>", "jump to feature number i (0-based)"),
    ("zoom-in", "decrease the range around the feature"),
    ("zoom-out", "increase the range around the feature"),
    ("pan-up", "move the range towards longer wavelengths"),
    ("pan-down", "move the range towards shorter wavelengths"),
    ("shift <target> <km/s>", "add a velocity shift to data, ref, stellar or interstellar"),
    ("shift-up <target>", "shift the target up by one velocity step"),
    ("shift-down <target>", "shift the target down by one velocity step"),
    ("fit <min> <max>", "add the samples in [min, max] to the continuum fit"),
    ("reset", "reset the continuum fit and the range offset"),
    ("ew <min> <max>", "measure the feature in [min, max]"),
    ("undo", "delete the last measurement of the feature"),
    ("mark", "mark / unmark the current feature"),
    ("note <text>", "append a line to the feature note"),
    ("save", "save measurements to the output file"),
    ("status", "print the current state as JSON"),
    ("help", "print this table"),
    ("quit", "exit the session"),
];

fn rule() -> String {
    "-".repeat(RULE_WIDTH)
}

pub(super) fn render_demo_message() -> String {
    format!(
        "{rule}\n# NIFTY DEMO MODE\n# Working with synthetic spectrum.\n# Start with \"--help\" to get available options.\n{rule}",
        rule = rule()
    )
}

/// `# Label: value` block printed before a session starts.
pub(super) fn render_input_summary(entries: &[(&str, String)]) -> String {
    let mut text = rule();
    text.push_str("\n# NIFTY INPUT PARAMETERS\n");
    for (label, value) in entries {
        let _ = writeln!(text, "# {label}: {value}");
    }
    text.push_str(&rule());
    text
}

pub(super) fn render_shortcut_table() -> String {
    let width = SESSION_COMMANDS
        .iter()
        .map(|(command, _)| command.len())
        .max()
        .unwrap_or(0);

    let mut text = rule();
    text.push_str("\n# SESSION COMMANDS\n");
    for (command, description) in SESSION_COMMANDS {
        let _ = writeln!(text, "# {command:>width$}  {description}");
    }
    text.push_str(&rule());
    text
}

pub(super) fn format_fwhm(fwhm: Option<f64>) -> String {
    fwhm.map_or_else(|| "undefined".to_string(), |value| format!("{value:.4}"))
}

pub(super) fn format_measurement(measurement: &FeatureMeasurement) -> String {
    format!(
        "EW={:.6} mode={:.4} FWHM={} window=[{:.4}, {:.4}]",
        measurement.equivalent_width,
        measurement.mode,
        format_fwhm(measurement.fwhm),
        measurement.window[0],
        measurement.window[1]
    )
}

/// One row per feature: measurement count, mean EW, last mode and FWHM,
/// mark and the first note line.
pub(super) fn render_measurement_table(file: &MeasurementFile) -> String {
    let mut text = format!(
        "{:>12} {:>4} {:>12} {:>12} {:>10} {:>6}  {}\n",
        "feature", "n", "mean EW", "last mode", "last FWHM", "marked", "notes"
    );
    for (key, record) in &file.records {
        let count = record.len();
        let mean = if count == 0 {
            "-".to_string()
        } else {
            format!("{:.6}", stable_sum(record.ew().iter().copied()) / count as f64)
        };
        let mode = record
            .modes()
            .last()
            .map_or_else(|| "-".to_string(), |mode| format!("{mode:.4}"));
        let fwhm = record
            .fwhm()
            .last()
            .map_or_else(|| "-".to_string(), |fwhm| format_fwhm(*fwhm));
        let note = record.notes().lines().next().unwrap_or("");
        let _ = writeln!(
            text,
            "{key:>12} {count:>4} {mean:>12} {mode:>12} {fwhm:>10} {:>6}  {note}",
            if record.is_marked() { "yes" } else { "no" }
        );
    }

    let measured = file.records.values().filter(|record| !record.is_empty()).count();
    let _ = write!(
        text,
        "{measured} of {} feature(s) measured",
        file.records.len()
    );
    if let Some(shifts) = file.velocity_shifts.as_ref().filter(|shifts| !shifts.is_empty()) {
        let rendered: Vec<String> = shifts
            .iter()
            .map(|(target, velocity)| format!("{target}={velocity} km/s"))
            .collect();
        let _ = write!(text, "\nvelocity shifts: {}", rendered.join(", "));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::{SESSION_COMMANDS, render_input_summary, render_measurement_table, render_shortcut_table};
    use nifty_core::io::MeasurementFile;
    use nifty_core::measurement::MeasurementRecord;
    use std::collections::BTreeMap;

    #[test]
    fn shortcut_table_lists_every_command() {
        let table = render_shortcut_table();
        for (command, _) in SESSION_COMMANDS {
            assert!(table.contains(command), "missing {command}");
        }
    }

    #[test]
    fn input_summary_has_one_line_per_entry() {
        let summary = render_input_summary(&[
            ("Input", "spectrum.txt".to_string()),
            ("Features", "dibs.txt".to_string()),
        ]);
        assert!(summary.contains("# Input: spectrum.txt\n"));
        assert!(summary.contains("# Features: dibs.txt\n"));
    }

    #[test]
    fn measurement_table_summarises_records() {
        let measured: MeasurementRecord = serde_json::from_str(
            r#"{"ew": [0.4, 0.6], "range": [[1, 2], [1, 2]], "mode": [1.5, 1.6], "fwhm": [null, 0.25], "notes": "blend\nrecheck\n", "marked": true}"#,
        )
        .expect("record parses");
        let mut records = BTreeMap::new();
        records.insert("5780.48".to_string(), measured);
        records.insert("6613.62".to_string(), MeasurementRecord::default());
        let mut shifts = BTreeMap::new();
        shifts.insert("data".to_string(), -4.0);

        let table = render_measurement_table(&MeasurementFile {
            velocity_shifts: Some(shifts),
            records,
        });
        assert!(table.contains("0.500000"));
        assert!(table.contains("0.2500"));
        assert!(table.contains("blend"));
        assert!(!table.contains("recheck"));
        assert!(table.contains("1 of 2 feature(s) measured"));
        assert!(table.contains("data=-4 km/s"));
    }
}
