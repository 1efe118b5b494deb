use serde::Serialize;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UnavailableReason {
    /// Extension is not one the EXIF reader handles.
    NotApplicable,
    /// No EXIF block, or the container could not be decoded.
    NoExifData(String),
    /// `DateTimeOriginal` is absent.
    MissingTag,
    /// The tag was present but did not parse as `YYYY:MM:DD HH:MM:SS.fff`.
    Malformed(String),
    Io(String),
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotApplicable => f.write_str("not an image with EXIF support"),
            Self::NoExifData(detail) => write!(f, "no usable EXIF data ({detail})"),
            Self::MissingTag => f.write_str("could not find DateTimeOriginal EXIF tag"),
            Self::Malformed(raw) => write!(f, "malformed DateTimeOriginal value {raw:?}"),
            Self::Io(detail) => write!(f, "could not read file: {detail}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("{}: {reason}", .path.display())]
    MetadataUnavailable {
        path: PathBuf,
        reason: UnavailableReason,
    },
    #[error("{}: not overwriting existing file {}", .source_path.display(), .destination.display())]
    DestinationConflict {
        source_path: PathBuf,
        destination: PathBuf,
    },
    #[error("{}: {op} failed: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        op: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("{}: could not be listed: {source}", .path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: not claimed by any group yet missing from its directory pool", .path.display())]
    GroupingInvariant { path: PathBuf },
}

impl PlacementError {
    pub fn filesystem(path: impl Into<PathBuf>, op: &'static str, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            op,
            source,
        }
    }

    /// Path the failure is reported against.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::MetadataUnavailable { path, .. }
            | Self::Filesystem { path, .. }
            | Self::Discovery { path, .. }
            | Self::GroupingInvariant { path } => path,
            Self::DestinationConflict { source_path, .. } => source_path,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MetadataUnavailable { .. } => FailureKind::MetadataUnavailable,
            Self::DestinationConflict { .. } => FailureKind::DestinationConflict,
            Self::Filesystem { .. } => FailureKind::Filesystem,
            Self::Discovery { .. } => FailureKind::Discovery,
            Self::GroupingInvariant { .. } => FailureKind::GroupingInvariant,
        }
    }
}

impl From<walkdir::Error> for PlacementError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(PathBuf::from).unwrap_or_default();
        let source = err
            .into_io_error()
            .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
        Self::Discovery { path, source }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    MetadataUnavailable,
    DestinationConflict,
    Filesystem,
    Discovery,
    GroupingInvariant,
}

/// One per-file failure, kept so the batch can continue.
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

impl From<&PlacementError> for FileFailure {
    fn from(err: &PlacementError) -> Self {
        Self {
            path: err.path().to_path_buf(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
