use super::{IoError, IoResult};
use crate::common::WavelengthUnit;
use crate::spectrum::SpectrumColumns;
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_JSON_X_KEY: &str = "lambda";
pub const DEFAULT_JSON_Y_KEY: &str = "flux";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpectrumFormat {
    #[default]
    Ascii,
    Json,
    Fits,
}

impl SpectrumFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::Json => "json",
            Self::Fits => "fits",
        }
    }

    /// Guesses the format from the file extension; anything unknown is ASCII.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|extension| extension.to_str())
            .and_then(|extension| extension.parse().ok())
            .unwrap_or_default()
    }
}

impl Display for SpectrumFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for SpectrumFormat {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ascii" | "txt" | "dat" | "csv" | "text" => Ok(Self::Ascii),
            "json" => Ok(Self::Json),
            "fits" | "fit" | "fts" => Ok(Self::Fits),
            other => Err(format!(
                "unknown spectrum format '{other}', expected one of ascii, json, fits"
            )),
        }
    }
}

/// Where and how to read a spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumRequest {
    pub path: PathBuf,
    /// `None` infers the format from the extension.
    pub format: Option<SpectrumFormat>,
    pub unit: WavelengthUnit,
    pub x_key: Option<String>,
    pub y_key: Option<String>,
}

impl SpectrumRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: None,
            unit: WavelengthUnit::default(),
            x_key: None,
            y_key: None,
        }
    }

    pub fn resolved_format(&self) -> SpectrumFormat {
        self.format
            .unwrap_or_else(|| SpectrumFormat::from_path(&self.path))
    }
}

/// Reads `(wavelength, flux)` columns, converts wavelength to Angstrom and
/// sorts the samples by wavelength.
pub fn load_spectrum(request: &SpectrumRequest) -> IoResult<SpectrumColumns> {
    let path = request.path.as_path();
    let format = request.resolved_format();
    if format == SpectrumFormat::Fits {
        return Err(IoError::UnsupportedFormat {
            path: path.to_path_buf(),
            format: format.to_string(),
        });
    }

    let content = fs::read_to_string(path).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let (wavelength, flux) = match format {
        SpectrumFormat::Json => read_json_columns(
            path,
            &content,
            request.x_key.as_deref().unwrap_or(DEFAULT_JSON_X_KEY),
            request.y_key.as_deref().unwrap_or(DEFAULT_JSON_Y_KEY),
        )?,
        _ => read_ascii_columns(
            path,
            &content,
            request.x_key.as_deref(),
            request.y_key.as_deref(),
        )?,
    };

    let wavelength = request.unit.to_angstrom(&wavelength);
    let (wavelength, flux) = sort_by_wavelength(wavelength, flux);
    tracing::debug!(
        path = %path.display(),
        %format,
        samples = wavelength.len(),
        "spectrum loaded"
    );
    Ok(SpectrumColumns::new(wavelength, flux))
}

fn sort_by_wavelength(wavelength: Vec<f64>, flux: Vec<f64>) -> (Vec<f64>, Vec<f64>) {
    // Mismatched columns are passed through for the model to reject.
    if wavelength.len() != flux.len() {
        return (wavelength, flux);
    }
    let mut pairs: Vec<(f64, f64)> = wavelength.into_iter().zip(flux).collect();
    pairs.sort_by(|left, right| left.0.total_cmp(&right.0));
    pairs.into_iter().unzip()
}

pub(super) fn split_tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split(|character: char| character.is_whitespace() || character == ',')
        .filter(|token| !token.is_empty())
}

pub(super) fn strip_comment(line: &str) -> &str {
    line.find('#').map_or(line, |index| &line[..index]).trim()
}

/// Parses a number, accepting Fortran `D` exponent markers.
pub(super) fn parse_number(token: &str) -> Option<f64> {
    token
        .parse::<f64>()
        .ok()
        .or_else(|| token.replace(['D', 'd'], "E").parse::<f64>().ok())
}

fn read_ascii_columns(
    path: &Path,
    content: &str,
    x_key: Option<&str>,
    y_key: Option<&str>,
) -> IoResult<(Vec<f64>, Vec<f64>)> {
    let mut header: Option<Vec<String>> = None;
    let mut rows: Vec<(usize, Vec<f64>)> = Vec::new();

    for (line_index, raw) in content.lines().enumerate() {
        let line = strip_comment(raw);
        if line.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = split_tokens(line).collect();
        let values: Option<Vec<f64>> = tokens.iter().map(|token| parse_number(token)).collect();
        match values {
            Some(values) => rows.push((line_index + 1, values)),
            None if header.is_none() && rows.is_empty() => {
                header = Some(tokens.iter().map(|token| token.to_string()).collect());
            }
            None => {
                return Err(IoError::parse(
                    path,
                    format!("line {}: non-numeric value in '{line}'", line_index + 1),
                ));
            }
        }
    }

    if rows.is_empty() {
        return Err(IoError::missing(path, "spectrum samples"));
    }

    let x_column = resolve_column(path, header.as_deref(), x_key, 0)?;
    let y_column = resolve_column(path, header.as_deref(), y_key, 1)?;
    let needed = x_column.max(y_column) + 1;

    let mut wavelength = Vec::with_capacity(rows.len());
    let mut flux = Vec::with_capacity(rows.len());
    for (line_number, values) in rows {
        if values.len() < needed {
            return Err(IoError::parse(
                path,
                format!(
                    "line {line_number} has {} column(s), expected at least {needed}",
                    values.len()
                ),
            ));
        }
        wavelength.push(values[x_column]);
        flux.push(values[y_column]);
    }
    Ok((wavelength, flux))
}

/// Column named by `key` in the header, a numeric column index, or `default`.
fn resolve_column(
    path: &Path,
    header: Option<&[String]>,
    key: Option<&str>,
    default: usize,
) -> IoResult<usize> {
    let Some(key) = key else {
        return Ok(default);
    };
    if let Some(index) = header.and_then(|names| names.iter().position(|name| name == key)) {
        return Ok(index);
    }
    key.parse::<usize>()
        .map_err(|_| IoError::missing(path, format!("column '{key}'")))
}

fn read_json_columns(
    path: &Path,
    content: &str,
    x_key: &str,
    y_key: &str,
) -> IoResult<(Vec<f64>, Vec<f64>)> {
    let document: Value = serde_json::from_str(content)
        .map_err(|source| IoError::parse(path, source.to_string()))?;
    let wavelength = json_number_array(path, &document, x_key)?;
    let flux = json_number_array(path, &document, y_key)?;
    Ok((wavelength, flux))
}

fn json_number_array(path: &Path, document: &Value, key: &str) -> IoResult<Vec<f64>> {
    let values = document
        .get(key)
        .ok_or_else(|| IoError::missing(path, format!("key '{key}'")))?
        .as_array()
        .ok_or_else(|| IoError::parse(path, format!("'{key}' is not an array")))?;

    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            value.as_f64().ok_or_else(|| {
                IoError::parse(path, format!("'{key}'[{index}] is not a number: {value}"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{SpectrumFormat, SpectrumRequest, load_spectrum};
    use crate::common::WavelengthUnit;
    use crate::io::IoError;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn format_is_inferred_from_extension() {
        assert_eq!(SpectrumFormat::from_path(Path::new("a.json")), SpectrumFormat::Json);
        assert_eq!(SpectrumFormat::from_path(Path::new("a.FITS")), SpectrumFormat::Fits);
        assert_eq!(SpectrumFormat::from_path(Path::new("a.spec")), SpectrumFormat::Ascii);
        assert!("votable".parse::<SpectrumFormat>().is_err());
    }

    #[test]
    fn ascii_columns_are_selected_by_header_name() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("spectrum.txt");
        fs::write(
            &path,
            "# observed spectrum\nflux, wave, err\n0.5, 578.2, 0.1\n1.0, 578.0, 0.1 # first\n\n0.9 578.4 0.1\n",
        )
        .expect("spectrum should be written");

        let mut request = SpectrumRequest::new(&path);
        request.unit = WavelengthUnit::Nanometer;
        request.x_key = Some("wave".to_string());
        request.y_key = Some("flux".to_string());
        let columns = load_spectrum(&request).expect("spectrum should load");

        assert_eq!(columns.wavelength.len(), 3);
        assert!((columns.wavelength[0] - 5780.0).abs() < 1.0e-9);
        assert!((columns.wavelength[2] - 5784.0).abs() < 1.0e-9);
        assert_eq!(columns.flux, vec![1.0, 0.5, 0.9]);
    }

    #[test]
    fn ascii_defaults_to_first_two_columns_and_reads_fortran_exponents() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("spectrum.dat");
        fs::write(&path, "1.0D2 1.0\n1.01D2 0.5\n").expect("spectrum should be written");

        let columns = load_spectrum(&SpectrumRequest::new(&path)).expect("spectrum should load");
        assert_eq!(columns.wavelength, vec![100.0, 101.0]);
        assert_eq!(columns.flux, vec![1.0, 0.5]);
    }

    #[test]
    fn missing_ascii_column_is_reported() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("spectrum.txt");
        fs::write(&path, "wave flux\n1 2\n").expect("spectrum should be written");

        let mut request = SpectrumRequest::new(&path);
        request.y_key = Some("normalized".to_string());
        let error = load_spectrum(&request).expect_err("unknown column should fail");
        assert!(matches!(error, IoError::MissingData { .. }));
        assert!(error.to_string().contains("column 'normalized'"));
    }

    #[test]
    fn json_spectrum_uses_default_keys() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("spectrum.json");
        fs::write(&path, r#"{"lambda": [6614.0, 6613.0], "flux": [0.8, 1.0]}"#)
            .expect("spectrum should be written");

        let columns = load_spectrum(&SpectrumRequest::new(&path)).expect("spectrum should load");
        assert_eq!(columns.wavelength, vec![6613.0, 6614.0]);
        assert_eq!(columns.flux, vec![1.0, 0.8]);

        let mut request = SpectrumRequest::new(&path);
        request.y_key = Some("error".to_string());
        let error = load_spectrum(&request).expect_err("missing key should fail");
        assert!(matches!(error, IoError::MissingData { .. }));
    }

    #[test]
    fn fits_is_rejected_before_reading() {
        let error = load_spectrum(&SpectrumRequest::new("does-not-exist.fits"))
            .expect_err("fits should be unsupported");
        assert!(matches!(error, IoError::UnsupportedFormat { .. }));
    }
}
