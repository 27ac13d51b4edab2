use std::path::{Path, PathBuf};

/// Output path for a compressed input: `name<suffix>` becomes `name`.
///
/// Returns `None` when the file name does not end in `suffix` or nothing is
/// left once it is stripped.
pub fn strip_suffix(path: &Path, suffix: &str) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    if suffix.is_empty() {
        return None;
    }
    let stem = name.strip_suffix(suffix)?;
    if stem.is_empty() {
        return None;
    }
    Some(path.with_file_name(stem))
}

/// `.tgz` is shorthand for `.tar.gz`
pub fn output_path(path: &Path, suffix: &str) -> Option<PathBuf> {
    if let Some(stripped) = strip_suffix(path, suffix) {
        return Some(stripped);
    }
    let stem = strip_suffix(path, ".tgz")?;
    let mut name = stem.file_name()?.to_os_string();
    name.push(".tar");
    Some(stem.with_file_name(name))
}

pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{:.0} {}", size, UNITS[unit_idx])
    } else {
        format!("{:.1} {}", size, UNITS[unit_idx])
    }
}

pub fn format_percentage(numerator: u64, denominator: u64) -> String {
    if denominator == 0 {
        "N/A".to_string()
    } else {
        let percentage = (numerator as f64 / denominator as f64) * 100.0;
        format!("{:.1}%", percentage)
    }
}

/// Space saved by compression, as gzip -l reports it
pub fn compression_ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed == 0 {
        return "0.0%".to_string();
    }
    let saved = 100.0 * (1.0 - compressed as f64 / uncompressed as f64);
    format!("{:.1}%", saved)
}
