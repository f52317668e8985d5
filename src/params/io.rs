use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::EncoderMapError;

/// Default file name for a saved parameter object
pub const PARAMETERS_FILE: &str = "parameters.json";

/////////////////
// Persistence //
/////////////////

/// JSON persistence for parameter objects
///
/// Provides `save` with backup-on-overwrite and `load` with a repair step
/// for parameter files whose run directory was moved since saving.
pub trait ParamsIo: Serialize + DeserializeOwned + Sized {
    /// The run directory stored in the parameter object
    fn main_path(&self) -> &Path;

    /// Save the parameters as a JSON file with sorted keys
    ///
    /// If the target file already exists it is renamed to a timestamped
    /// backup first, so a save never destroys the previous file.
    ///
    /// ### Params
    ///
    /// * `path` - Target file. Defaults to `main_path/parameters.json`.
    ///
    /// ### Returns
    ///
    /// The path the parameters were written to.
    fn save(&self, path: Option<&Path>) -> Result<PathBuf, EncoderMapError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => self.main_path().join(PARAMETERS_FILE),
        };

        if path.is_file() {
            backup_existing(&path)?;
        }

        // Route through a Value so the object keys come out sorted.
        let value = serde_json::to_value(self)?;
        fs::write(&path, serde_json::to_string_pretty(&value)?)?;

        Ok(path)
    }

    /// Load parameters from a JSON file
    ///
    /// If the stored `main_path` disagrees with the directory the file
    /// actually lives in, the run directory was moved: every occurrence of
    /// the old path in the file is replaced with the new directory and the
    /// repaired file is parsed instead.
    ///
    /// ### Params
    ///
    /// * `path` - Path of the JSON parameter file
    ///
    /// ### Returns
    ///
    /// The loaded parameter object.
    fn load(path: &Path) -> Result<Self, EncoderMapError> {
        let text = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&text)?;

        let stored = value
            .get("main_path")
            .and_then(|v| v.as_str())
            .ok_or(EncoderMapError::MissingField("main_path"))?;

        let actual_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let actual = actual_dir
            .to_str()
            .ok_or_else(|| EncoderMapError::NonUtf8Path(actual_dir.to_path_buf()))?;

        if stored != actual {
            tracing::warn!(
                old = stored,
                new = actual,
                "parameter file directory changed, updating stored paths"
            );
            search_and_replace(path, stored, actual)?;
            let repaired = fs::read_to_string(path)?;
            return Ok(serde_json::from_str(&repaired)?);
        }

        Ok(serde_json::from_value(value)?)
    }
}

/////////////
// Helpers //
/////////////

/// Rename an existing file to `<stem>_back_<YYYY-MM-DD_HH:MM:SS><ext>`
fn backup_existing(path: &Path) -> Result<(), EncoderMapError> {
    let backup = backup_name(path, &Local::now().format("%Y-%m-%d_%H:%M:%S").to_string());
    fs::rename(path, backup)?;
    Ok(())
}

/// Build the backup file name for `path` with the given timestamp
fn backup_name(path: &Path, timestamp: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(PARAMETERS_FILE);
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    path.with_file_name(format!("{}_back_{}{}", stem, timestamp, extension))
}

/// Replace every occurrence of `old` with `new` inside the file at `path`
///
/// Used to repair parameter files after their run directory was moved. The
/// replacement is textual: any unrelated occurrence of `old` is rewritten
/// as well.
pub fn search_and_replace(path: &Path, old: &str, new: &str) -> Result<(), EncoderMapError> {
    let text = fs::read_to_string(path)?;
    fs::write(path, text.replace(old, new))?;
    Ok(())
}

/// Create and return the first free `run{i}` directory under `base`
///
/// ### Params
///
/// * `base` - Parent directory for the run directories
///
/// ### Returns
///
/// The created directory, e.g. `base/run0` on first use.
pub fn run_path(base: &Path) -> Result<PathBuf, EncoderMapError> {
    for i in 0usize.. {
        let candidate = base.join(format!("run{}", i));
        if !candidate.exists() {
            fs::create_dir_all(&candidate)?;
            return Ok(candidate);
        }
    }
    unreachable!("exhausted run directory indices")
}

///////////
// Tests //
///////////

#[cfg(test)]
mod io_tests {
    use super::*;

    #[test]
    fn test_backup_name_format() {
        let backup = backup_name(Path::new("/tmp/run0/parameters.json"), "2024-01-02_03:04:05");
        assert_eq!(
            backup,
            PathBuf::from("/tmp/run0/parameters_back_2024-01-02_03:04:05.json")
        );
    }

    #[test]
    fn test_backup_name_without_extension() {
        let backup = backup_name(Path::new("/tmp/run0/parameters"), "2024-01-02_03:04:05");
        assert_eq!(
            backup,
            PathBuf::from("/tmp/run0/parameters_back_2024-01-02_03:04:05")
        );
    }

    #[test]
    fn test_run_path_increments() {
        let dir = tempfile::tempdir().unwrap();

        let first = run_path(dir.path()).unwrap();
        let second = run_path(dir.path()).unwrap();

        assert_eq!(first, dir.path().join("run0"));
        assert_eq!(second, dir.path().join("run1"));
        assert!(first.is_dir());
        assert!(second.is_dir());
    }

    #[test]
    fn test_search_and_replace() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("parameters.json");
        fs::write(&file, "{\"main_path\": \"/old/run0\", \"analysis_path\": \"/old/run0/analysis\"}").unwrap();

        search_and_replace(&file, "/old/run0", "/new/run0").unwrap();

        let text = fs::read_to_string(&file).unwrap();
        assert!(!text.contains("/old/run0"));
        assert_eq!(text.matches("/new/run0").count(), 2);
    }
}
