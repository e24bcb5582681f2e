//! File helpers: saving, size formatting and simple validation

use std::path::{Path, PathBuf};

use super::{paths, Error, Result};

/// Write `content` to `path`, creating parent directories first
pub fn save_file(path: &Path, content: &[u8]) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            paths::ensure_dir(parent).map_err(|e| Error::file_write(path, e))?;
        }
    }
    std::fs::write(path, content).map_err(|e| Error::file_write(path, e))?;
    Ok(path.to_path_buf())
}

/// Human readable size, base 1024 with two decimals
pub fn format_file_size(size: u64) -> String {
    if size == 0 {
        return "0 B".to_string();
    }

    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Lower-cased extension including the dot, or an empty string
pub fn file_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Check that a size is positive and within `max`
pub fn validate_file_size(size: u64, max: u64) -> std::result::Result<(), String> {
    if size == 0 {
        return Err(format!("invalid file size: {}", format_file_size(size)));
    }
    if size > max {
        return Err(format!(
            "file size exceeds limit: {} > {}",
            format_file_size(size),
            format_file_size(max)
        ));
    }
    Ok(())
}

/// Check that a file name carries one of the allowed extensions
///
/// Allowed extensions are compared case-insensitively and include the dot.
pub fn validate_file_extension(file_name: &str, allowed: &[String]) -> std::result::Result<(), String> {
    let ext = file_extension(file_name);
    if ext.is_empty() {
        return Err(format!("file name has no extension: {}", file_name));
    }
    if !allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)) {
        return Err(format!(
            "extension {} not allowed (allowed: {})",
            ext,
            allowed.join(", ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512.00 B");
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("report.XLSX"), ".xlsx");
        assert_eq!(file_extension("archive.tar.gz"), ".gz");
        assert_eq!(file_extension("README"), "");
    }

    #[test]
    fn test_validate_file_size() {
        assert!(validate_file_size(0, 10).is_err());
        assert!(validate_file_size(11, 10).is_err());
        assert!(validate_file_size(10, 10).is_ok());
    }

    #[test]
    fn test_validate_file_extension() {
        let allowed = vec![".xlsx".to_string(), ".xls".to_string()];
        assert!(validate_file_extension("a.xlsx", &allowed).is_ok());
        assert!(validate_file_extension("a.XLS", &allowed).is_ok());
        assert!(validate_file_extension("a.txt", &allowed).is_err());
        assert!(validate_file_extension("noext", &allowed).is_err());
    }

    #[test]
    fn test_save_file_creates_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("file.bin");
        save_file(&path, b"abc").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }
}
