//! Side-file lookup over the app's conventional media layout.
//!
//! Each media root is walked once and indexed by directory, so per-record
//! lookups are in-memory substring matches instead of directory walks.

use crate::error::{WeChatError, WeChatResult};
use md5::{Digest, Md5};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

const AVATAR_DIR: &str = "avatar";
const IMAGE_DIR: &str = "image2";
const EMOJI_DIR: &str = "emoji";
const VOICE_DIR: &str = "voice2";
const VIDEO_DIR: &str = "video";
const DOWNLOAD_DIR: &str = "Download";

/// Lowercase hex MD5 of `text`.
pub fn md5_hex(text: &str) -> String {
    hex::encode(Md5::digest(text.as_bytes()))
}

/// File names under one root, grouped by their directory relative to it.
#[derive(Debug, Clone, Default)]
pub struct SideFileIndex {
    root: PathBuf,
    buckets: BTreeMap<PathBuf, Vec<String>>,
}

impl SideFileIndex {
    /// Walk `root`; a missing root yields an empty index.
    pub fn build(root: &Path) -> Self {
        let mut index = Self {
            root: root.to_path_buf(),
            buckets: BTreeMap::new(),
        };
        if !root.is_dir() {
            debug!("side-file root {} not present", root.display());
            return index;
        }

        for entry in WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            index.insert(entry.path());
        }
        for names in index.buckets.values_mut() {
            names.sort();
        }
        index
    }

    /// Number of indexed files.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Whether nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a file that appeared after the walk.
    pub fn insert(&mut self, path: &Path) {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return;
        };
        let Some(name) = relative.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return;
        };
        let dir = relative.parent().map(Path::to_path_buf).unwrap_or_default();
        let names = self.buckets.entry(dir).or_default();
        if let Err(pos) = names.binary_search(&name) {
            names.insert(pos, name);
        }
    }

    /// First name in `dir` accepted by `pred`.
    pub fn find_in(&self, dir: &Path, pred: impl Fn(&str) -> bool) -> Option<PathBuf> {
        let names = self.buckets.get(dir)?;
        names
            .iter()
            .find(|name| pred(name))
            .map(|name| self.root.join(dir).join(name))
    }

    /// First name anywhere under the root accepted by `pred`.
    pub fn find_any(&self, pred: impl Fn(&str) -> bool) -> Option<PathBuf> {
        self.buckets.iter().find_map(|(dir, names)| {
            names
                .iter()
                .find(|name| pred(name))
                .map(|name| self.root.join(dir).join(name))
        })
    }
}

/// Resolved video side-files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoFiles {
    /// Cover still.
    pub cover: Option<PathBuf>,
    /// The clip itself.
    pub clip: Option<PathBuf>,
}

/// All media roots under one data directory.
#[derive(Debug, Clone)]
pub struct MediaLibrary {
    data_root: PathBuf,
    avatars: SideFileIndex,
    images: SideFileIndex,
    stickers: SideFileIndex,
    videos: SideFileIndex,
}

impl MediaLibrary {
    /// Index every media root under `data_root`.
    pub fn open(data_root: &Path) -> Self {
        let library = Self {
            data_root: data_root.to_path_buf(),
            avatars: SideFileIndex::build(&data_root.join(AVATAR_DIR)),
            images: SideFileIndex::build(&data_root.join(IMAGE_DIR)),
            stickers: SideFileIndex::build(&data_root.join(EMOJI_DIR)),
            videos: SideFileIndex::build(&data_root.join(VIDEO_DIR)),
        };
        debug!(
            "indexed media: {} avatars, {} images, {} stickers, {} videos",
            library.avatars.len(),
            library.images.len(),
            library.stickers.len(),
            library.videos.len()
        );
        library
    }

    /// Avatar for a username, stored under `avatar/<h0h1>/<h2h3>/`.
    pub fn avatar_path(&self, username: &str) -> Option<PathBuf> {
        let hash = md5_hex(username);
        self.avatars
            .find_in(&hash_bucket(&hash), |name| name.contains(&hash))
    }

    /// Picture for an image record.
    ///
    /// Self-sent pictures prefer the `hd` original. HEVC variants are never
    /// used, nor are names containing `jpg`.
    pub fn image_path(&self, img_path: &str, sent_by_self: bool) -> Option<PathBuf> {
        let key = image_key(img_path);
        if key.len() < 4 {
            return None;
        }
        let bucket = hash_bucket(key);
        if sent_by_self {
            let hd = format!("{}hd", key);
            if let Some(found) = self
                .images
                .find_in(&bucket, |name| name.contains(&hd) && !name.contains("_hevc"))
            {
                return Some(found);
            }
        }
        self.images.find_in(&bucket, |name| {
            name.contains(key) && !name.contains("_hevc") && !name.contains("jpg")
        })
    }

    /// Sticker by hash, preferring its `_cover` rendition.
    pub fn sticker_path(&self, md5: &str) -> Option<PathBuf> {
        if md5.is_empty() {
            return None;
        }
        let cover = format!("{}_cover", md5);
        self.stickers
            .find_any(|name| name.contains(&cover))
            .or_else(|| self.stickers.find_any(|name| name.contains(md5)))
    }

    /// Store a downloaded sticker as `emoji/<md5>` and index it.
    pub fn register_sticker(&mut self, md5: &str, bytes: &[u8]) -> WeChatResult<PathBuf> {
        if md5.is_empty() || md5.contains(['/', '\\']) {
            return Err(WeChatError::SideFileMissing(format!(
                "invalid sticker name '{}'",
                md5
            )));
        }
        let dir = self.data_root.join(EMOJI_DIR);
        fs::create_dir_all(&dir)?;
        let path = dir.join(md5);
        fs::write(&path, bytes)?;
        self.stickers.insert(&path);
        Ok(path)
    }

    /// Voice note path, `voice2/<h0h1>/<h2h3>/msg_<id>.amr` with `h = md5(id)`.
    pub fn voice_path(&self, img_path: &str) -> PathBuf {
        let hash = md5_hex(img_path);
        self.data_root
            .join(VOICE_DIR)
            .join(hash_bucket(&hash))
            .join(voice_file_name(img_path))
    }

    /// Cover and clip for a video record.
    pub fn video_files(&self, img_path: &str) -> VideoFiles {
        if img_path.is_empty() {
            return VideoFiles::default();
        }
        VideoFiles {
            cover: self
                .videos
                .find_any(|name| name.contains(img_path) && name.contains(".jpg")),
            clip: self
                .videos
                .find_any(|name| name.contains(img_path) && name.contains(".mp4")),
        }
    }

    /// Received file by title, `Download/<title>`.
    pub fn download_path(&self, title: &str) -> PathBuf {
        self.data_root.join(DOWNLOAD_DIR).join(title)
    }
}

/// `msg_<id>.amr`
pub fn voice_file_name(img_path: &str) -> String {
    format!("msg_{}.amr", img_path)
}

fn image_key(img_path: &str) -> &str {
    img_path.rsplit("//th_").next().unwrap_or(img_path)
}

fn hash_bucket(key: &str) -> PathBuf {
    let first = key.get(0..2).unwrap_or_default();
    let second = key.get(2..4).unwrap_or_default();
    PathBuf::from(first).join(second)
}
