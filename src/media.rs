//! Content-based media classification.
//!
//! File extensions are never consulted: the type of a file is decided by
//! its leading bytes alone, so a mislabelled `.jpg` that is really an MP4
//! still plays as a video.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use image::ImageFormat;

/// Number of leading bytes inspected when sniffing a file.
pub const SNIFF_LEN: u64 = 3072;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain";

/// Top-level media class of a playable file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a MIME type by its top-level component.
    #[must_use]
    pub fn of(mime: &str) -> Option<Self> {
        match mime.split('/').next() {
            Some("image") => Some(Self::Image),
            Some("video") => Some(Self::Video),
            _ => None,
        }
    }
}

/// Detect the MIME type of the file at `path` from its content.
///
/// # Errors
/// Propagates any failure to open or read the file.
pub fn classify(path: &Path) -> io::Result<&'static str> {
    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    File::open(path)?.take(SNIFF_LEN).read_to_end(&mut head)?;
    Ok(sniff(&head))
}

/// Detect a MIME type from the leading bytes of a file.
#[must_use]
pub fn sniff(data: &[u8]) -> &'static str {
    if let Ok(format) = image::guess_format(data)
        && plausible_image_header(format, data)
    {
        let mime = format.to_mime_type();
        if mime.starts_with("image/") {
            return mime;
        }
    }
    if let Some(mime) = sniff_iso_bmff(data) {
        return mime;
    }
    if let Some(mime) = sniff_video(data) {
        return mime;
    }
    if is_svg(data) {
        return "image/svg+xml";
    }
    if is_text(data) {
        return TEXT_PLAIN;
    }
    OCTET_STREAM
}

/// PNM and BMP magic is two bytes long, so plain text like "P2 agenda" or
/// "BMW notes" matches it. Those formats must also carry a sane header.
fn plausible_image_header(format: ImageFormat, data: &[u8]) -> bool {
    match format {
        ImageFormat::Pnm => plausible_pnm(data),
        ImageFormat::Bmp => plausible_bmp(data),
        _ => true,
    }
}

fn plausible_pnm(data: &[u8]) -> bool {
    let Some((&variant, rest)) = data.get(1..).and_then(<[u8]>::split_first) else {
        return false;
    };
    if !rest.first().is_some_and(u8::is_ascii_whitespace) {
        return false;
    }
    let mut rest = rest;
    loop {
        rest = &rest[rest.iter().take_while(|b| b.is_ascii_whitespace()).count()..];
        if rest.first() != Some(&b'#') {
            break;
        }
        let comment = rest.iter().take_while(|&&b| b != b'\n').count();
        rest = &rest[comment..];
    }
    if variant == b'7' {
        // PAM headers are keyword based.
        ["WIDTH", "HEIGHT", "DEPTH", "MAXVAL", "TUPLTYPE"]
            .iter()
            .any(|key| rest.starts_with(key.as_bytes()))
    } else {
        rest.first().is_some_and(u8::is_ascii_digit)
    }
}

fn plausible_bmp(data: &[u8]) -> bool {
    let Some(dib) = data.get(14..18) else {
        return false;
    };
    let size = u32::from_le_bytes([dib[0], dib[1], dib[2], dib[3]]);
    matches!(size, 12 | 40 | 52 | 56 | 108 | 124)
}

/// ISO base media files (`....ftyp<brand>`): MP4 and friends, plus HEIF stills.
fn sniff_iso_bmff(data: &[u8]) -> Option<&'static str> {
    if data.len() < 12 || &data[4..8] != b"ftyp" {
        return None;
    }
    let brand = &data[8..12];
    let mime = match brand {
        b"avif" | b"avis" => "image/avif",
        b"heic" | b"heix" | b"heim" | b"heis" => "image/heic",
        b"mif1" | b"msf1" => "image/heif",
        b"qt  " => "video/quicktime",
        b"M4V " | b"M4VH" | b"M4VP" => "video/x-m4v",
        b"M4A " | b"M4B " | b"M4P " | b"F4A " | b"F4B " => "audio/mp4",
        _ if brand.starts_with(b"3g2") => "video/3gpp2",
        _ if brand.starts_with(b"3gp") => "video/3gpp",
        _ => "video/mp4",
    };
    Some(mime)
}

fn sniff_video(data: &[u8]) -> Option<&'static str> {
    // Matroska/WebM: EBML header, doctype names the flavour.
    if data.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return Some(if contains(data, b"webm") {
            "video/webm"
        } else {
            "video/x-matroska"
        });
    }
    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"AVI " {
        return Some("video/x-msvideo");
    }
    if data.starts_with(b"FLV\x01") {
        return Some("video/x-flv");
    }
    if data.starts_with(&[0x00, 0x00, 0x01, 0xBA]) || data.starts_with(&[0x00, 0x00, 0x01, 0xB3]) {
        return Some("video/mpeg");
    }
    // Transport stream: sync byte repeats every 188-byte packet.
    if data.len() > 188 && data[0] == 0x47 && data[188] == 0x47 {
        return Some("video/mp2t");
    }
    if data.starts_with(&[
        0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11, 0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62, 0xCE, 0x6C,
    ]) {
        return Some("video/x-ms-asf");
    }
    if data.starts_with(b"OggS") && contains(data, b"\x80theora") {
        return Some("video/ogg");
    }
    None
}

fn is_svg(data: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(trim_utf8_tail(data)) else {
        return false;
    };
    let text = text.trim_start_matches('\u{feff}').trim_start();
    if text.starts_with("<svg") {
        return true;
    }
    (text.starts_with("<?xml") || text.starts_with("<!--") || text.starts_with("<!DOCTYPE"))
        && text.contains("<svg")
}

fn is_text(data: &[u8]) -> bool {
    if data.is_empty() {
        return true;
    }
    std::str::from_utf8(trim_utf8_tail(data)).is_ok_and(|s| {
        !s.chars()
            .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t' | '\u{c}'))
    })
}

/// A bounded read may cut a multi-byte character in half; drop the partial tail.
fn trim_utf8_tail(data: &[u8]) -> &[u8] {
    match std::str::from_utf8(data) {
        Ok(_) => data,
        Err(err) if err.error_len().is_none() => &data[..err.valid_up_to()],
        Err(_) => data,
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
