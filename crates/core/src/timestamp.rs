use crate::error::{PlacementError, UnavailableReason};
use crate::exif_reader::{read_original_timestamp, OriginalTimestamp};
use crate::scan::FileEntry;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S%.f";
const DEFAULT_SUBSEC: &str = "000";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimestampSource {
    Exif,
    FileModified,
}

/// Capture time of a group, truncated to milliseconds. Naive because EXIF
/// carries no zone; it is interpreted as local time when written back.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ResolvedTimestamp {
    pub datetime: NaiveDateTime,
    pub source: TimestampSource,
}

impl ResolvedTimestamp {
    pub fn millis(&self) -> u32 {
        self.datetime.nanosecond() / 1_000_000
    }

    /// `YYYYMMDD_HHMMSS_mmm`
    pub fn base_name(&self) -> String {
        format!("{}_{:03}", self.datetime.format("%Y%m%d_%H%M%S"), self.millis())
    }

    pub fn system_time(&self) -> SystemTime {
        match Local.from_local_datetime(&self.datetime).earliest() {
            Some(local) => SystemTime::from(local),
            None => SystemTime::from(self.datetime.and_utc()),
        }
    }
}

pub fn parse_original_timestamp(raw: &OriginalTimestamp) -> Result<NaiveDateTime, UnavailableReason> {
    let subsec = raw.subsec.as_deref().unwrap_or(DEFAULT_SUBSEC);
    let joined = format!("{}.{}", raw.datetime.trim(), subsec);
    let parsed = NaiveDateTime::parse_from_str(&joined, EXIF_DATETIME_FORMAT)
        .map_err(|_| UnavailableReason::Malformed(joined.clone()))?;
    truncate_to_millis(parsed).ok_or(UnavailableReason::Malformed(joined))
}

fn truncate_to_millis(value: NaiveDateTime) -> Option<NaiveDateTime> {
    let millis = value.nanosecond() / 1_000_000;
    value.with_nanosecond(millis * 1_000_000)
}

pub fn exif_timestamp(entry: &FileEntry) -> Result<NaiveDateTime, UnavailableReason> {
    if !entry.is_image() {
        return Err(UnavailableReason::NotApplicable);
    }
    let raw = read_original_timestamp(&entry.path)?;
    parse_original_timestamp(&raw)
}

/// Modification time in local time, whole seconds.
pub fn modified_timestamp(entry: &FileEntry) -> Option<NaiveDateTime> {
    let modified = entry.stat.modified?;
    let local: DateTime<Local> = DateTime::from(modified);
    local.naive_local().with_nanosecond(0)
}

pub fn resolve_timestamp(
    entry: &FileEntry,
    use_modtime: bool,
) -> Result<ResolvedTimestamp, PlacementError> {
    match exif_timestamp(entry) {
        Ok(datetime) => Ok(ResolvedTimestamp {
            datetime,
            source: TimestampSource::Exif,
        }),
        Err(reason) if use_modtime => match modified_timestamp(entry) {
            Some(datetime) => {
                tracing::debug!(path = %entry.path.display(), %reason, "falling back to modification time");
                Ok(ResolvedTimestamp {
                    datetime,
                    source: TimestampSource::FileModified,
                })
            }
            None => Err(PlacementError::MetadataUnavailable {
                path: entry.path.clone(),
                reason,
            }),
        },
        Err(reason) => Err(PlacementError::MetadataUnavailable {
            path: entry.path.clone(),
            reason,
        }),
    }
}
