use crate::error::PlacementError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Serialize;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

const IMAGE_GLOBS: &[&str] = &["*.jpg", "*.jpeg", "*.png"];
const VIDEO_GLOBS: &[&str] = &["*.mp4", "*.mov", "*.3gp"];

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Video,
    Other,
}

/// Stat snapshot taken once when the entry is discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub mode: u32,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl FileStat {
    pub fn from_metadata(meta: &fs::Metadata) -> Self {
        Self {
            mode: permission_bits(meta),
            len: meta.len(),
            modified: meta.modified().ok(),
        }
    }

    pub fn read(path: &Path) -> Result<Self, PlacementError> {
        let meta =
            fs::metadata(path).map_err(|err| PlacementError::filesystem(path, "stat", err))?;
        Ok(Self::from_metadata(&meta))
    }
}

#[cfg(unix)]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    /// Directory of the file relative to the scan root it was found under.
    /// Empty for files passed explicitly.
    pub rel_dir: PathBuf,
    pub kind: FileKind,
    pub stat: FileStat,
}

impl FileEntry {
    pub fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    pub fn file_name(&self) -> &OsStr {
        self.path.file_name().unwrap_or_default()
    }

    /// Same rule as [`file_stem`], kept in the platform encoding.
    pub fn stem(&self) -> &OsStr {
        self.path.file_stem().unwrap_or_else(|| self.file_name())
    }

    pub fn is_image(&self) -> bool {
        self.kind == FileKind::Image
    }
}

/// Filename without its final extension. `"a.b.jpg"` gives `"a.b"`, `".bashrc"` stays whole.
pub fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|v| v.to_str())
        .unwrap_or(name)
}

/// Lower-cased extension including the leading dot, or an empty string.
pub fn lowercase_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct FileClassifier {
    images: GlobSet,
    videos: GlobSet,
}

impl FileClassifier {
    pub fn new() -> Result<Self, globset::Error> {
        Ok(Self {
            images: build_glob_set(IMAGE_GLOBS)?,
            videos: build_glob_set(VIDEO_GLOBS)?,
        })
    }

    pub fn classify(&self, file_name: &str) -> FileKind {
        if self.images.is_match(file_name) {
            FileKind::Image
        } else if self.videos.is_match(file_name) {
            FileKind::Video
        } else {
            FileKind::Other
        }
    }
}

fn build_glob_set(patterns: &[&str]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).case_insensitive(true).build()?);
    }
    builder.build()
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScanStats {
    pub scanned_files: usize,
    pub images: usize,
    pub videos: usize,
    pub others: usize,
    pub skipped_hidden: usize,
    pub discovery_errors: usize,
}

#[derive(Debug, Default)]
pub struct ScanResult {
    pub entries: Vec<FileEntry>,
    pub failures: Vec<PlacementError>,
    pub stats: ScanStats,
}

impl ScanResult {
    fn push(&mut self, entry: FileEntry) {
        match entry.kind {
            FileKind::Image => self.stats.images += 1,
            FileKind::Video => self.stats.videos += 1,
            FileKind::Other => self.stats.others += 1,
        }
        self.entries.push(entry);
    }

    fn fail(&mut self, err: PlacementError) {
        if matches!(err, PlacementError::Discovery { .. }) {
            self.stats.discovery_errors += 1;
        }
        self.failures.push(err);
    }
}

/// Walks every input. Files are taken as-is; directories are listed (and
/// descended into when `recursive`). Errors abandon only the affected path.
pub fn scan_inputs(
    inputs: &[PathBuf],
    recursive: bool,
    include_hidden: bool,
    classifier: &FileClassifier,
) -> ScanResult {
    let mut result = ScanResult::default();

    for input in inputs {
        let meta = match fs::metadata(input) {
            Ok(meta) => meta,
            Err(err) => {
                result.fail(PlacementError::Discovery {
                    path: input.clone(),
                    source: err,
                });
                continue;
            }
        };

        if meta.is_dir() {
            walk_root(input, recursive, include_hidden, classifier, &mut result);
        } else {
            result.stats.scanned_files += 1;
            let name = input
                .file_name()
                .map(|v| v.to_string_lossy().to_string())
                .unwrap_or_default();
            result.push(FileEntry {
                path: input.clone(),
                rel_dir: PathBuf::new(),
                kind: classifier.classify(&name),
                stat: FileStat::from_metadata(&meta),
            });
        }
    }

    debug!(
        scanned = result.stats.scanned_files,
        images = result.stats.images,
        videos = result.stats.videos,
        "scan finished"
    );
    result
}

fn walk_root(
    root: &Path,
    recursive: bool,
    include_hidden: bool,
    classifier: &FileClassifier,
    result: &mut ScanResult,
) {
    let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                result.fail(PlacementError::from(err));
                continue;
            }
        };
        let path = entry.path();
        if entry.file_type().is_dir() || !path.is_file() {
            continue;
        }
        result.stats.scanned_files += 1;

        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') && !include_hidden {
            result.stats.skipped_hidden += 1;
            continue;
        }

        let stat = match FileStat::read(path) {
            Ok(stat) => stat,
            Err(err) => {
                result.fail(err);
                continue;
            }
        };

        let rel_dir = path
            .parent()
            .and_then(|parent| parent.strip_prefix(root).ok())
            .map(PathBuf::from)
            .unwrap_or_default();

        result.push(FileEntry {
            path: path.to_path_buf(),
            rel_dir,
            kind: classifier.classify(&name),
            stat,
        });
    }
}
