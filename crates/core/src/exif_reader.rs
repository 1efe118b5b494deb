use crate::error::UnavailableReason;
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::Path;
use std::str;

/// Raw `DateTimeOriginal` / `SubSecTimeOriginal` pair as stored in the EXIF block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalTimestamp {
    pub datetime: String,
    pub subsec: Option<String>,
}

pub fn read_original_timestamp(path: &Path) -> Result<OriginalTimestamp, UnavailableReason> {
    let file = File::open(path).map_err(|err| UnavailableReason::Io(err.to_string()))?;
    let mut buf = BufReader::new(file);
    extract_original_timestamp(&mut buf)
}

/// Decodes the EXIF container from `reader`. Every decoding failure, including
/// truncated or corrupt blocks, comes back as an `UnavailableReason`.
pub fn extract_original_timestamp<R: BufRead + Seek>(
    reader: &mut R,
) -> Result<OriginalTimestamp, UnavailableReason> {
    let exif = Reader::new()
        .read_from_container(reader)
        .map_err(|err| match err {
            exif::Error::Io(io) => UnavailableReason::Io(io.to_string()),
            other => UnavailableReason::NoExifData(other.to_string()),
        })?;

    let datetime = ascii_field(&exif, Tag::DateTimeOriginal).ok_or(UnavailableReason::MissingTag)?;
    let subsec = ascii_field(&exif, Tag::SubSecTimeOriginal);

    Ok(OriginalTimestamp { datetime, subsec })
}

fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match field.value {
        Value::Ascii(ref vec) if !vec.is_empty() => str::from_utf8(&vec[0])
            .ok()
            .map(|v| v.trim_matches(|c: char| c == '\0' || c.is_whitespace()).to_string())
            .filter(|v| !v.is_empty()),
        _ => None,
    }
}
