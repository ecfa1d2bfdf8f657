use std::fs;
use std::path::{Path, PathBuf};

use framefeed_core::worker::worker_state::WorkerState;

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("framefeed").join("state.json"))
}

/// Reads a worker state file. Missing fields take their defaults.
pub fn load_from(path: &Path) -> Result<WorkerState, Box<dyn std::error::Error>> {
    let json = fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config {}: {e}", path.display()))?;
    let state = serde_json::from_str(&json)
        .map_err(|e| format!("Invalid config {}: {e}", path.display()))?;
    Ok(state)
}

/// The platform config file, or defaults when it is absent or unreadable.
pub fn load() -> WorkerState {
    config_path()
        .and_then(|path| fs::read_to_string(path).ok())
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use framefeed_core::source::domain::frame_source::SourceKind;
    use std::num::NonZeroU32;

    #[test]
    fn test_load_from_reads_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(
            &path,
            r#"{"input_kind": "image_sequence", "input_path": "/frames", "target_width": 320}"#,
        )
        .unwrap();

        let state = load_from(&path).unwrap();
        assert_eq!(state.input_kind, Some(SourceKind::ImageSequence));
        assert_eq!(state.input_path, Some(PathBuf::from("/frames")));
        assert_eq!(state.target_width, NonZeroU32::new(320));
    }

    #[test]
    fn test_load_from_missing_file_names_path() {
        let err = load_from(Path::new("/nonexistent/state.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/state.json"));
    }

    #[test]
    fn test_load_from_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        assert!(load_from(&path).unwrap_err().to_string().starts_with("Invalid config"));
    }
}
