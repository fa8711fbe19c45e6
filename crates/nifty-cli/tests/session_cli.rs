use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn nifty(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_nifty"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("nifty binary should run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("stdout should be utf-8")
}

fn stderr(output: &Output) -> String {
    String::from_utf8(output.stderr.clone()).expect("stderr should be utf-8")
}

struct Fixture {
    _temp: TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().expect("tempdir should be created");
        let root = temp.path().to_path_buf();
        fs::write(
            root.join("spectrum.txt"),
            "lambda flux\n100 1.0\n101 1.0\n102 0.5\n103 1.0\n104 1.0\n",
        )
        .expect("spectrum should be written");
        fs::write(root.join("features.txt"), "102\n").expect("features should be written");
        Self { _temp: temp, root }
    }

    fn path(&self, name: &str) -> String {
        self.root.join(name).display().to_string()
    }

    fn script(&self, name: &str, lines: &[&str]) -> String {
        let path = self.root.join(name);
        fs::write(&path, lines.join("\n")).expect("script should be written");
        path.display().to_string()
    }

    fn session(&self, script: &str, output: &str) -> Output {
        nifty(&[
            "session",
            "--input",
            &self.path("spectrum.txt"),
            "--features",
            &self.path("features.txt"),
            "--output",
            output,
            "--script",
            script,
            "--quiet",
        ])
    }
}

fn status_line(text: &str) -> Value {
    let line = text
        .lines()
        .rev()
        .find(|line| line.starts_with('{'))
        .expect("status line should be printed");
    serde_json::from_str(line).expect("status line should be JSON")
}

fn saved(path: &Path) -> Value {
    let content = fs::read_to_string(path).expect("measurement file should exist");
    serde_json::from_str(&content).expect("measurement file should be JSON")
}

#[test]
fn scripted_session_measures_marks_and_saves() {
    let fixture = Fixture::new();
    let output = fixture.path("out/measurements.json");
    let script = fixture.script(
        "session.txt",
        &[
            "fit 99 100.5",
            "fit 104.5 110",
            "ew 101.5 103.5",
            "mark",
            "note clean profile",
            "save",
            "status",
        ],
    );

    let result = fixture.session(&script, &output);
    assert!(result.status.success(), "stderr: {}", stderr(&result));
    let text = stdout(&result);
    assert!(text.contains("Feature 1/1: 102.0"));
    assert!(text.contains("EW=0.500000 mode=102.0000 FWHM=1.0000"));
    assert!(text.contains("Marked feature 102.0."));

    let status = status_line(&text);
    assert_eq!(status["key"], "102.0");
    assert_eq!(status["fitPoints"], 4);
    assert_eq!(status["marked"], true);
    assert_eq!(status["notes"], "clean profile\n");

    let file = saved(Path::new(&output));
    let record = &file["102.0"];
    assert_eq!(record["mode"], serde_json::json!([102.0]));
    assert_eq!(record["marked"], true);
    assert!(file.get("velocity_shifts").is_none());
}

#[test]
fn saved_measurements_are_restored_on_the_next_run() {
    let fixture = Fixture::new();
    let output = fixture.path("measurements.json");
    let first = fixture.script(
        "first.txt",
        &["fit 99 110", "ew 101.5 103.5", "shift data -8", "save"],
    );
    let result = fixture.session(&first, &output);
    assert!(result.status.success(), "stderr: {}", stderr(&result));
    assert_eq!(saved(Path::new(&output))["velocity_shifts"]["data"], -8.0);

    let second = fixture.script("second.txt", &["status"]);
    let result = fixture.session(&second, &output);
    assert!(result.status.success(), "stderr: {}", stderr(&result));
    let text = stdout(&result);
    assert!(text.contains("Restored measurements from"));
    assert!(text.contains("Restored data velocity shift of -8 km/s."));
    let status = status_line(&text);
    assert_eq!(status["ew"].as_array().map(Vec::len), Some(1));
    assert_eq!(status["velocityShifts"]["data"], -8.0);
}

#[test]
fn malformed_script_lines_are_advisories() {
    let fixture = Fixture::new();
    let script = fixture.script("bad.txt", &["dance", "ew 101 103", "save"]);
    let result = nifty(&[
        "session",
        "-i",
        &fixture.path("spectrum.txt"),
        "-f",
        &fixture.path("features.txt"),
        "--script",
        &script,
        "-q",
    ]);
    assert!(result.status.success(), "stderr: {}", stderr(&result));
    let text = stdout(&result);
    assert!(text.contains("ADVISORY: [INPUT.SESSION_COMMAND] line 1:"));
    assert!(text.contains("ADVISORY: [RUN.NO_FIT]"));
    assert!(text.contains("ADVISORY: [INPUT.NO_OUTPUT]"));
}

#[test]
fn fits_input_is_rejected_with_input_exit_code() {
    let fixture = Fixture::new();
    let result = nifty(&[
        "session",
        "--input",
        &fixture.path("spectrum.fits"),
        "--features",
        &fixture.path("features.txt"),
    ]);
    assert_eq!(result.status.code(), Some(2));
    let errors = stderr(&result);
    assert!(errors.contains("ERROR: [INPUT.UNSUPPORTED_FORMAT]"));
    assert!(errors.contains("FATAL EXIT CODE: 2"));
}

#[test]
fn missing_spectrum_is_an_io_failure() {
    let fixture = Fixture::new();
    let result = nifty(&[
        "session",
        "--input",
        &fixture.path("absent.txt"),
        "--features",
        &fixture.path("features.txt"),
    ]);
    assert_eq!(result.status.code(), Some(3));
    assert!(stderr(&result).contains("ERROR: [IO.READ]"));
}

#[test]
fn summary_prints_the_measurement_table() {
    let fixture = Fixture::new();
    let path = fixture.root.join("measurements.json");
    fs::write(
        &path,
        r#"{
  "velocity_shifts": {"data": -4.0},
  "5780.48": {"ew": [0.4, 0.6], "range": [[1, 2], [1, 2]], "mode": [5780.5, 5780.4], "fwhm": [1.2, null], "notes": "", "marked": false},
  "6613.62": {"ew": [], "range": [], "mode": [], "fwhm": [], "notes": "", "marked": true}
}"#,
    )
    .expect("measurement file should be written");

    let result = nifty(&["summary", &path.display().to_string()]);
    assert!(result.status.success(), "stderr: {}", stderr(&result));
    let text = stdout(&result);
    assert!(text.contains("0.500000"));
    assert!(text.contains("undefined"));
    assert!(text.contains("1 of 2 feature(s) measured"));
    assert!(text.contains("velocity shifts: data=-4 km/s"));
}

#[test]
fn shortcuts_lists_session_commands() {
    let result = nifty(&["shortcuts"]);
    assert!(result.status.success());
    let text = stdout(&result);
    assert!(text.contains("# SESSION COMMANDS"));
    assert!(text.contains("fit <min> <max>"));
}

#[test]
fn demo_session_is_reproducible_for_a_seed() {
    let fixture = Fixture::new();
    let script = fixture.script("demo.txt", &["next", "status"]);
    let run = || {
        let result = nifty(&["demo", "--seed", "11", "--script", &script, "--quiet"]);
        assert!(result.status.success(), "stderr: {}", stderr(&result));
        status_line(&stdout(&result))
    };

    let first = run();
    assert_eq!(first, run());
    let count = first["featureCount"].as_u64().expect("feature count");
    assert!((1..=3).contains(&count));
    assert_eq!(first["selection"].as_u64(), Some(1 % count));
}

#[test]
fn unknown_arguments_exit_with_usage_error() {
    let result = nifty(&["session", "--bogus"]);
    assert_eq!(result.status.code(), Some(2));
    assert!(stderr(&result).contains("[INPUT.CLI_USAGE]"));
}
