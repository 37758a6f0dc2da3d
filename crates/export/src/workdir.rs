//! Output layout for one month: `<out>/<YYYY>/<MM>/` with attachment folders.

use crate::error::ExportResult;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use wxdoc_core::ExportWindow;

/// Transcoded voice notes.
pub const VOICE_DIR: &str = "voice_love";
/// Copied file attachments.
pub const FILE_DIR: &str = "file_love";
/// Copied raw voice notes.
pub const TMP_VOICE_DIR: &str = "tmp_voice";
/// Copied video clips.
pub const VIDEO_DIR: &str = "video_love";

/// Folders used while exporting one month.
#[derive(Debug, Clone)]
pub struct WorkDirs {
    month: PathBuf,
    document: PathBuf,
    voice: PathBuf,
    file: PathBuf,
    tmp_voice: PathBuf,
    video: PathBuf,
}

impl WorkDirs {
    /// Create every folder for `window` under `output_root`.
    pub fn create(output_root: &Path, window: &ExportWindow) -> ExportResult<Self> {
        let month = output_root
            .join(window.year_label())
            .join(window.month_label());
        let dirs = Self {
            document: month.join(format!("{}.docx", window.file_stem())),
            voice: month.join(VOICE_DIR),
            file: month.join(FILE_DIR),
            tmp_voice: month.join(TMP_VOICE_DIR),
            video: month.join(VIDEO_DIR),
            month,
        };
        for dir in [&dirs.voice, &dirs.file, &dirs.tmp_voice, &dirs.video] {
            fs::create_dir_all(dir)?;
        }
        Ok(dirs)
    }

    /// `<YYYY-MM>.docx`
    pub fn document_path(&self) -> &Path {
        &self.document
    }

    /// Transcoded voice folder.
    pub fn voice_dir(&self) -> &Path {
        &self.voice
    }

    /// File attachment folder.
    pub fn file_dir(&self) -> &Path {
        &self.file
    }

    /// Raw voice folder.
    pub fn tmp_voice_dir(&self) -> &Path {
        &self.tmp_voice
    }

    /// Video folder.
    pub fn video_dir(&self) -> &Path {
        &self.video
    }

    /// Link target for a file inside the month folder, `/`-separated.
    pub fn link_target(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.month).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Remove attachment folders nothing was copied into.
    ///
    /// The transcoded voice folder goes together with an empty raw voice
    /// folder.
    pub fn remove_unused(&self) {
        remove_if_empty(&self.file);
        if remove_if_empty(&self.tmp_voice) {
            remove_if_empty(&self.voice);
        }
        remove_if_empty(&self.video);
    }
}

fn remove_if_empty(dir: &Path) -> bool {
    let empty = fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if !empty {
        return false;
    }
    match fs::remove_dir(dir) {
        Ok(()) => {
            debug!("removed unused {}", dir.display());
            true
        }
        Err(e) => {
            debug!("could not remove {}: {}", dir.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_follows_window() {
        let dir = tempfile::tempdir().expect("tempdir");
        let window = ExportWindow::month(2021, 3).expect("window");
        let dirs = WorkDirs::create(dir.path(), &window).expect("create");

        assert_eq!(
            dirs.document_path(),
            dir.path().join("2021").join("03").join("2021-03.docx")
        );
        assert!(dirs.voice_dir().is_dir());
        assert!(dirs.video_dir().is_dir());
        assert!(!dir.path().join("tmp").exists());
        assert_eq!(
            dirs.link_target(&dirs.file_dir().join("report.pdf")),
            "file_love/report.pdf"
        );
    }

    #[test]
    fn only_empty_folders_are_removed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let window = ExportWindow::month(2021, 3).expect("window");
        let dirs = WorkDirs::create(dir.path(), &window).expect("create");
        fs::write(dirs.file_dir().join("kept.txt"), b"x").expect("write");

        dirs.remove_unused();

        assert!(dirs.file_dir().is_dir());
        assert!(!dirs.tmp_voice_dir().exists());
        assert!(!dirs.voice_dir().exists());
        assert!(!dirs.video_dir().exists());
        assert!(dir.path().join("2021").join("03").is_dir());
    }

    #[test]
    fn voice_folder_survives_while_raw_notes_exist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let window = ExportWindow::month(2021, 3).expect("window");
        let dirs = WorkDirs::create(dir.path(), &window).expect("create");
        fs::write(dirs.tmp_voice_dir().join("msg_1.amr"), b"x").expect("write");

        dirs.remove_unused();

        assert!(dirs.tmp_voice_dir().is_dir());
        assert!(dirs.voice_dir().is_dir());
    }
}
