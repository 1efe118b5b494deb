//! Minimal JPEG/EXIF byte builders for unit tests.

const TAG_EXIF_IFD_POINTER: u16 = 0x8769;
const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
const TAG_SUB_SEC_TIME_ORIGINAL: u16 = 0x9291;
const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;

pub(crate) fn jpeg_with_exif(datetime: Option<&str>, subsec: Option<&str>) -> Vec<u8> {
    let tiff = tiff_block(datetime, subsec);
    let mut out = vec![0xff, 0xd8, 0xff, 0xe1];
    let len = u16::try_from(2 + 6 + tiff.len()).expect("app1 segment fits");
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&[0xff, 0xd9]);
    out
}

pub(crate) fn jpeg_without_exif() -> Vec<u8> {
    vec![0xff, 0xd8, 0xff, 0xd9]
}

fn tiff_block(datetime: Option<&str>, subsec: Option<&str>) -> Vec<u8> {
    let mut entries = Vec::new();
    if let Some(value) = datetime {
        entries.push((TAG_DATE_TIME_ORIGINAL, ascii(value)));
    }
    if let Some(value) = subsec {
        entries.push((TAG_SUB_SEC_TIME_ORIGINAL, ascii(value)));
    }

    let ifd0_offset = 8u32;
    let exif_ifd_offset = ifd0_offset + 2 + 12 + 4;
    let exif_ifd_len = 2 + 12 * entries.len() as u32 + 4;
    let mut data_offset = exif_ifd_offset + exif_ifd_len;

    let mut out = Vec::new();
    out.extend_from_slice(b"MM\0\x2a");
    out.extend_from_slice(&ifd0_offset.to_be_bytes());

    out.extend_from_slice(&1u16.to_be_bytes());
    push_entry(&mut out, TAG_EXIF_IFD_POINTER, TYPE_LONG, 1, exif_ifd_offset.to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes());

    let mut data = Vec::new();
    out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    for (tag, bytes) in &entries {
        let count = bytes.len() as u32;
        if bytes.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..bytes.len()].copy_from_slice(bytes);
            push_entry(&mut out, *tag, TYPE_ASCII, count, inline);
        } else {
            push_entry(&mut out, *tag, TYPE_ASCII, count, data_offset.to_be_bytes());
            data.extend_from_slice(bytes);
            data_offset += count;
        }
    }
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(&data);
    out
}

fn push_entry(out: &mut Vec<u8>, tag: u16, typ: u16, count: u32, value: [u8; 4]) {
    out.extend_from_slice(&tag.to_be_bytes());
    out.extend_from_slice(&typ.to_be_bytes());
    out.extend_from_slice(&count.to_be_bytes());
    out.extend_from_slice(&value);
}

fn ascii(value: &str) -> Vec<u8> {
    let mut bytes = value.as_bytes().to_vec();
    bytes.push(0);
    bytes
}
