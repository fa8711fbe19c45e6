use super::{IoError, IoResult};
use crate::measurement::MeasurementRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk measurement file: one record per feature key, plus the velocity
/// shifts that were active when it was written.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeasurementFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity_shifts: Option<BTreeMap<String, f64>>,
    #[serde(flatten)]
    pub records: BTreeMap<String, MeasurementRecord>,
}

pub fn load_measurement_file(path: impl AsRef<Path>) -> IoResult<MeasurementFile> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: MeasurementFile = serde_json::from_str(&content)
        .map_err(|source| IoError::parse(path, source.to_string()))?;
    tracing::debug!(
        path = %path.display(),
        features = file.records.len(),
        shifts = file.velocity_shifts.as_ref().map_or(0, BTreeMap::len),
        "measurement file loaded"
    );
    Ok(file)
}

/// Writes `file` as pretty JSON next to `path` and renames it into place.
pub fn save_measurement_file(file: &MeasurementFile, path: impl AsRef<Path>) -> IoResult<()> {
    let path = path.as_ref();
    let mut rendered = serde_json::to_string_pretty(file)
        .map_err(|source| IoError::parse(path, source.to_string()))?;
    rendered.push('\n');

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| IoError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let staging = staging_path(path);
    fs::write(&staging, rendered).map_err(|source| IoError::Write {
        path: staging.clone(),
        source,
    })?;
    fs::rename(&staging, path).map_err(|source| {
        let _ = fs::remove_file(&staging);
        IoError::Write {
            path: path.to_path_buf(),
            source,
        }
    })?;
    tracing::info!(path = %path.display(), features = file.records.len(), "measurements saved");
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::{MeasurementFile, load_measurement_file, save_measurement_file};
    use crate::io::IoError;
    use crate::measurement::MeasurementRecord;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn velocity_shifts_sit_beside_feature_keys() {
        let content = r#"{
            "5780.48": {"ew": [0.1], "range": [[5779.0, 5782.0]], "mode": [5780.5], "fwhm": [null], "notes": "", "marked": true},
            "velocity_shifts": {"data": -12.5}
        }"#;
        let file: MeasurementFile = serde_json::from_str(content).expect("file parses");
        assert_eq!(file.records.len(), 1);
        assert!(file.records["5780.48"].is_marked());
        assert_eq!(
            file.velocity_shifts.as_ref().map(|shifts| shifts["data"]),
            Some(-12.5)
        );
    }

    #[test]
    fn save_then_load_preserves_records() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("out").join("measurements.json");

        let mut records = BTreeMap::new();
        records.insert("100.0".to_string(), MeasurementRecord::default());
        let mut shifts = BTreeMap::new();
        shifts.insert("stellar".to_string(), 3.0);
        let file = MeasurementFile {
            velocity_shifts: Some(shifts),
            records,
        };

        save_measurement_file(&file, &path).expect("file should save");
        assert!(!temp.path().join("out").join("measurements.json.tmp").exists());
        let loaded = load_measurement_file(&path).expect("file should load");
        assert_eq!(loaded, file);

        let without_shifts = MeasurementFile {
            velocity_shifts: None,
            ..file
        };
        save_measurement_file(&without_shifts, &path).expect("file should save");
        let raw = fs::read_to_string(&path).expect("file readable");
        assert!(!raw.contains("velocity_shifts"));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("broken.json");
        fs::write(&path, "{\"100.0\": 3}").expect("file written");
        let error = load_measurement_file(&path).expect_err("record must be an object");
        assert!(matches!(error, IoError::Parse { .. }));
    }
}
