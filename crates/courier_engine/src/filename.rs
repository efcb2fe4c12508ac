use sha2::{Digest, Sha256};
use url::Url;

/// Filename a download should be known by: the `Content-Disposition` filename,
/// else the last path segment of the final URL, else `document-{short_hash(url)}.pdf`.
pub fn suggested_filename(content_disposition: Option<&str>, url: &str) -> String {
    let candidate = content_disposition
        .and_then(disposition_filename)
        .or_else(|| last_segment(url));
    match candidate.map(|name| sanitize_component(&name)) {
        Some(name) if !name.is_empty() => name,
        _ => format!("document-{}.pdf", short_hash(url)),
    }
}

fn disposition_filename(header: &str) -> Option<String> {
    let mut plain = None;
    for part in header.split(';').map(str::trim) {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            // RFC 5987: charset'lang'percent-encoded
            "filename*" => {
                let encoded = value.trim().rsplit('\'').next().unwrap_or_default();
                let decoded = url::form_urlencoded::parse(format!("v={encoded}").as_bytes())
                    .next()
                    .map(|(_, v)| v.into_owned());
                if let Some(name) = decoded.filter(|n| !n.is_empty()) {
                    return Some(name);
                }
            }
            "filename" => {
                let name = value.trim().trim_matches('"').to_string();
                if !name.is_empty() {
                    plain = Some(name);
                }
            }
            _ => {}
        }
    }
    plain
}

fn last_segment(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?.to_string();
    let decoded = url::form_urlencoded::parse(format!("v={segment}").as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or(segment);
    Some(decoded).filter(|s| !s.is_empty())
}

/// Makes a single path component safe on every platform we write to.
pub(crate) fn sanitize_component(input: &str) -> String {
    let base = input.rsplit(['/', '\\']).next().unwrap_or(input);
    let mut cleaned: String = base
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]).to_string();
    if cleaned.chars().count() > 120 {
        cleaned = cleaned.chars().take(120).collect();
    }
    let stem = cleaned.split('.').next().unwrap_or_default();
    if is_reserved_windows_name(stem) {
        cleaned.insert(stem.len(), '_');
    }
    cleaned
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

pub(crate) fn short_hash(input: impl AsRef<[u8]>) -> String {
    let digest = Sha256::digest(input.as_ref());
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
