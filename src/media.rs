//! Media kinds, their size ceilings, and where they are stored.

use std::path::{Path, PathBuf};

use crate::upload::{FilenameConvention, KeyShape, OwningEntityKey};

/// Avatar and thumbnail ceiling: 5 MiB
pub const IMAGE_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Exercise and common mistake video ceiling: 100 MiB
pub const VIDEO_MAX_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// `<trainer_id>.png`
    TrainerAvatar,
    /// `<prefix>_<exercise_id>.mp4`
    ExerciseVideo,
    /// `<prefix>_<trainer_id>_<exercise_id>.png`
    ExerciseThumbnail,
    /// `<prefix>_<exercise_id>_<mistake_id>.mp4`
    CommonMistakeVideo,
}

impl MediaKind {
    pub fn convention(self) -> FilenameConvention {
        match self {
            MediaKind::TrainerAvatar => FilenameConvention::new(".png", KeyShape::Id),
            MediaKind::ExerciseVideo => FilenameConvention::new(".mp4", KeyShape::PrefixedId),
            MediaKind::ExerciseThumbnail => {
                FilenameConvention::new(".png", KeyShape::PrefixedIdPair)
            }
            MediaKind::CommonMistakeVideo => {
                FilenameConvention::new(".mp4", KeyShape::PrefixedIdPair)
            }
        }
    }

    pub fn max_bytes(self) -> u64 {
        match self {
            MediaKind::TrainerAvatar | MediaKind::ExerciseThumbnail => IMAGE_MAX_BYTES,
            MediaKind::ExerciseVideo | MediaKind::CommonMistakeVideo => VIDEO_MAX_BYTES,
        }
    }

    /// Path relative to the media root. Built from the parsed key only, never
    /// from the client's file name.
    pub fn relative_path(self, key: &OwningEntityKey) -> PathBuf {
        let id = key.target_id();
        match self {
            MediaKind::TrainerAvatar => Path::new("avatars").join(format!("{}.png", id)),
            MediaKind::ExerciseVideo => Path::new("videos").join(format!("exercise_{}.mp4", id)),
            MediaKind::ExerciseThumbnail => {
                Path::new("thumbnails").join(format!("exercise_{}.png", id))
            }
            MediaKind::CommonMistakeVideo => Path::new("videos")
                .join("common_mistakes")
                .join(format!("mistake_{}.mp4", id)),
        }
    }

    /// Human readable refusal for an oversized upload.
    pub fn too_large_message(self) -> &'static str {
        match self {
            MediaKind::TrainerAvatar | MediaKind::ExerciseThumbnail => {
                "The file size exceeds the maximum size (5 MB). Please choose another image."
            }
            MediaKind::ExerciseVideo | MediaKind::CommonMistakeVideo => {
                "The file size exceeds the maximum size (100 MB). Please choose another video."
            }
        }
    }
}

/// Root directory that all uploaded media lives under.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, kind: MediaKind, key: &OwningEntityKey) -> PathBuf {
        self.root.join(kind.relative_path(key))
    }
}

/// Relative path as stored in the database, always with `/` separators.
pub fn stored_path(kind: MediaKind, key: &OwningEntityKey) -> String {
    kind.relative_path(key)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
