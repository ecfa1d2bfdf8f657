use std::num::NonZeroU32;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::source::domain::frame_source::SourceKind;

/// Host-owned worker configuration, read by the worker at start and on an
/// explicit reconfigure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerState {
    /// Unset means [`SourceKind::VideoFile`].
    pub input_kind: Option<SourceKind>,
    /// Unset means the worker idles.
    pub input_path: Option<PathBuf>,
    /// Unset means frames keep their native size.
    pub target_width: Option<NonZeroU32>,
}

impl WorkerState {
    pub fn new(kind: SourceKind, path: impl Into<PathBuf>) -> Self {
        Self {
            input_kind: Some(kind),
            input_path: Some(path.into()),
            target_width: None,
        }
    }

    pub fn with_target_width(mut self, width: Option<NonZeroU32>) -> Self {
        self.target_width = width;
        self
    }

    pub fn kind(&self) -> SourceKind {
        self.input_kind.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle_video() {
        let state = WorkerState::default();
        assert_eq!(state.kind(), SourceKind::VideoFile);
        assert!(state.input_path.is_none());
        assert!(state.target_width.is_none());
    }

    #[test]
    fn test_builder() {
        let state = WorkerState::new(SourceKind::ImageSequence, "/frames")
            .with_target_width(NonZeroU32::new(640));
        assert_eq!(state.kind(), SourceKind::ImageSequence);
        assert_eq!(state.input_path, Some(PathBuf::from("/frames")));
        assert_eq!(state.target_width.map(NonZeroU32::get), Some(640));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let state: WorkerState = serde_json::from_str(r#"{"input_path": "/clip.mp4"}"#).unwrap();
        assert_eq!(state.kind(), SourceKind::VideoFile);
        assert_eq!(state.input_path, Some(PathBuf::from("/clip.mp4")));
    }

    #[test]
    fn test_zero_target_width_is_rejected() {
        let result: Result<WorkerState, _> = serde_json::from_str(r#"{"target_width": 0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_round_trip() {
        let state = WorkerState::new(SourceKind::VideoFile, "/clip.mp4")
            .with_target_width(NonZeroU32::new(320));
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(serde_json::from_str::<WorkerState>(&json).unwrap(), state);
    }
}
