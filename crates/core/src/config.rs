use crate::constants::{
    DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_PROGRESS_GAP_SECS, DEFAULT_SEPARATOR_GAP_SECS,
    DEFAULT_SHORT_MESSAGE_CHARS,
};
use crate::Error;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for wxdoc.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WxdocConfig {
    /// Root of the exported app data (holds `avatar/`, `image2/`, `emoji/`, ...).
    pub data_root: PathBuf,

    /// Decrypted message database, relative to `data_root` unless absolute.
    pub message_db: PathBuf,

    /// Decrypted file-index database, relative to `data_root` unless absolute.
    /// Written as `""` when disabled.
    #[serde(with = "disabled_when_empty")]
    pub file_index_db: Option<PathBuf>,

    /// Where monthly documents and their attachment folders are written.
    pub output_dir: PathBuf,

    /// Rendering options.
    pub render: RenderConfig,

    /// Attachment handling options.
    pub media: MediaConfig,
}

/// Layout and sequencing options for transcripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Self-sent text shorter than this many characters is right-aligned.
    pub short_message_chars: usize,

    /// Minimum gap before a timestamp separator is inserted.
    pub separator_gap_secs: i64,

    /// Minimum gap between progress log lines.
    pub progress_gap_secs: i64,
}

/// Side-file options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Fetch missing stickers and card icons over HTTP.
    pub download_missing: bool,

    /// Timeout for a single remote fetch.
    pub download_timeout_secs: u64,

    /// Convert copied voice notes to MP3 with ffmpeg.
    pub transcode_voice: bool,

    /// Explicit ffmpeg binary.
    pub ffmpeg_binary: Option<PathBuf>,
}

impl Default for WxdocConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("."),
            message_db: PathBuf::from("EnMicroMsg-decrypted.db"),
            file_index_db: Some(PathBuf::from("WxFileIndex-decrypted.db")),
            output_dir: PathBuf::from("."),
            render: RenderConfig::default(),
            media: MediaConfig::default(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            short_message_chars: DEFAULT_SHORT_MESSAGE_CHARS,
            separator_gap_secs: DEFAULT_SEPARATOR_GAP_SECS,
            progress_gap_secs: DEFAULT_PROGRESS_GAP_SECS,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            download_missing: true,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            transcode_voice: false,
            ffmpeg_binary: None,
        }
    }
}

impl WxdocConfig {
    /// Default config file location.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::config("Cannot find config directory"))?;
        Ok(config_dir.join("wxdoc").join("config.toml"))
    }

    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content).map_err(|source| Error::ConfigFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject values that would make every export degenerate.
    pub fn validate(&self) -> Result<()> {
        if self.render.separator_gap_secs <= 0 {
            return Err(Error::validation("separator_gap_secs must be positive"));
        }
        if self.render.progress_gap_secs <= 0 {
            return Err(Error::validation("progress_gap_secs must be positive"));
        }
        Ok(())
    }

    /// Message database path resolved against the data root.
    pub fn message_db_path(&self) -> PathBuf {
        self.resolve(&self.message_db)
    }

    /// File-index database path resolved against the data root.
    pub fn file_index_db_path(&self) -> Option<PathBuf> {
        self.file_index_db.as_ref().map(|p| self.resolve(p))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_root.join(path)
        }
    }
}

/// `None` round-trips as an empty string so a disabled path survives a save.
mod disabled_when_empty {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::path::PathBuf;

    pub fn serialize<S: Serializer>(
        path: &Option<PathBuf>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match path {
            Some(path) => path.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<PathBuf>, D::Error> {
        let path = PathBuf::deserialize(deserializer)?;
        Ok((!path.as_os_str().is_empty()).then_some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "data_root = \"/data/wx\"\n\n[render]\nshort_message_chars = 12\n",
        )
        .expect("write config");

        let config = WxdocConfig::load(&path).expect("load config");
        assert_eq!(config.data_root, PathBuf::from("/data/wx"));
        assert_eq!(config.render.short_message_chars, 12);
        assert_eq!(config.render.separator_gap_secs, 180);
        assert!(config.media.download_missing);
        assert_eq!(
            config.message_db_path(),
            PathBuf::from("/data/wx/EnMicroMsg-decrypted.db")
        );
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        let mut config = WxdocConfig::default();
        config.media.transcode_voice = true;
        config.file_index_db = None;
        config.save(&path).expect("save config");

        let loaded = WxdocConfig::load(&path).expect("load config");
        assert!(loaded.media.transcode_voice);
        assert!(loaded.file_index_db.is_none());
        assert!(loaded.file_index_db_path().is_none());
    }

    #[test]
    fn file_index_path_survives_a_save_and_empty_disables_it() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let mut config = WxdocConfig::default();
        config.file_index_db = Some(PathBuf::from("/data/wx/index.db"));
        config.save(&path).expect("save config");
        let loaded = WxdocConfig::load(&path).expect("load config");
        assert_eq!(loaded.file_index_db, Some(PathBuf::from("/data/wx/index.db")));

        std::fs::write(&path, "file_index_db = \"\"\n").expect("write config");
        assert!(WxdocConfig::load(&path).expect("load").file_index_db.is_none());

        std::fs::write(&path, "data_root = \"/data/wx\"\n").expect("write config");
        assert_eq!(
            WxdocConfig::load(&path).expect("load").file_index_db,
            Some(PathBuf::from("WxFileIndex-decrypted.db"))
        );
    }

    #[test]
    fn malformed_toml_is_a_syntax_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "data_root = [").expect("write config");
        assert!(matches!(
            WxdocConfig::load(&path),
            Err(Error::ConfigSyntax(_))
        ));
        assert!(matches!(
            WxdocConfig::load(&dir.path().join("absent.toml")),
            Err(Error::ConfigFile { .. })
        ));
    }

    #[test]
    fn non_positive_gap_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[render]\nseparator_gap_secs = 0\n").expect("write config");
        assert!(matches!(
            WxdocConfig::load(&path),
            Err(Error::Validation(_))
        ));
    }
}
