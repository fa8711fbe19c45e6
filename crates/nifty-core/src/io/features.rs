use super::spectrum::{parse_number, split_tokens, strip_comment};
use super::{IoError, IoResult};
use crate::common::WavelengthUnit;
use globset::GlobBuilder;
use std::fs;
use std::path::{Component, Path, PathBuf};

const GLOB_META: [char; 4] = ['*', '?', '[', '{'];

/// Reads feature wavelengths (whitespace/comma separated, `#` comments, or a
/// JSON array), converts them to Angstrom, sorts and deduplicates.
pub fn load_feature_list(path: impl AsRef<Path>, unit: WavelengthUnit) -> IoResult<Vec<f64>> {
    let path = path.as_ref();
    let mut values = read_wavelengths(path)?;
    if values.is_empty() {
        return Err(IoError::missing(path, "feature wavelengths"));
    }
    values = unit.to_angstrom(&values);
    values.sort_unstable_by(f64::total_cmp);
    values.dedup();
    tracing::debug!(path = %path.display(), features = values.len(), "feature list loaded");
    Ok(values)
}

/// Reads every catalog file named by `patterns` (plain paths or globs) and
/// merges the line positions into one sorted sequence.
pub fn load_line_catalog<S: AsRef<str>>(patterns: &[S], unit: WavelengthUnit) -> IoResult<Vec<f64>> {
    let mut lines = Vec::new();
    for path in expand_catalog_patterns(patterns)? {
        lines.extend(unit.to_angstrom(&read_wavelengths(&path)?));
    }
    lines.sort_unstable_by(f64::total_cmp);
    Ok(lines)
}

/// Resolves plain paths as given and glob patterns to the sorted list of
/// matching files. A glob that matches nothing is an error.
pub fn expand_catalog_patterns<S: AsRef<str>>(patterns: &[S]) -> IoResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        if !pattern.contains(GLOB_META) {
            paths.push(PathBuf::from(pattern));
            continue;
        }

        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| IoError::InvalidGlob {
                pattern: pattern.to_string(),
                source,
            })?
            .compile_matcher();

        let (base, remaining_depth) = glob_base(pattern);
        let mut matched = Vec::new();
        collect_files(&base, remaining_depth, &mut matched)?;
        matched.retain(|candidate| matcher.is_match(candidate));
        if matched.is_empty() {
            return Err(IoError::missing(
                pattern,
                "files matching the catalog pattern",
            ));
        }
        matched.sort();
        paths.extend(matched);
    }
    Ok(paths)
}

/// Literal directory prefix of `pattern` and how many path levels below it the
/// pattern can reach (`None` for `**`).
fn glob_base(pattern: &str) -> (PathBuf, Option<usize>) {
    let mut base = PathBuf::new();
    let mut components = Path::new(pattern).components().peekable();
    while let Some(component) = components.peek() {
        let text = component.as_os_str().to_string_lossy();
        if text.contains(GLOB_META) {
            break;
        }
        base.push(component.as_os_str());
        components.next();
    }

    let rest: Vec<Component<'_>> = components.collect();
    let depth = if rest
        .iter()
        .any(|component| component.as_os_str() == "**")
    {
        None
    } else {
        Some(rest.len())
    };

    if base.as_os_str().is_empty() {
        base.push(".");
    }
    (base, depth)
}

fn collect_files(dir: &Path, remaining_depth: Option<usize>, out: &mut Vec<PathBuf>) -> IoResult<()> {
    if remaining_depth == Some(0) {
        return Ok(());
    }
    let entries = fs::read_dir(dir).map_err(|source| IoError::Read {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| IoError::Read {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = normalize_dot_prefix(entry.path());
        if path.is_dir() {
            collect_files(&path, remaining_depth.map(|depth| depth - 1), out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// `./a.txt` becomes `a.txt` so relative globs without a directory still match.
fn normalize_dot_prefix(path: PathBuf) -> PathBuf {
    path.strip_prefix(".")
        .map(Path::to_path_buf)
        .unwrap_or(path)
}

fn read_wavelengths(path: &Path) -> IoResult<Vec<f64>> {
    let content = fs::read_to_string(path).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if content.trim_start().starts_with('[') {
        return serde_json::from_str::<Vec<f64>>(&content)
            .map_err(|source| IoError::parse(path, source.to_string()));
    }

    let mut values = Vec::new();
    for (line_index, raw) in content.lines().enumerate() {
        for token in split_tokens(strip_comment(raw)) {
            let value = parse_number(token).ok_or_else(|| {
                IoError::parse(
                    path,
                    format!("line {}: '{token}' is not a wavelength", line_index + 1),
                )
            })?;
            values.push(value);
        }
    }
    Ok(values)
}
