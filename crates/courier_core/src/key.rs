/// Content type of every stored object.
pub const DOCUMENT_CONTENT_TYPE: &str = "application/pdf";
/// Extension appended to keys derived from a title.
pub const DOCUMENT_EXTENSION: &str = ".pdf";
/// Maximum number of characters kept from a sanitized title.
pub const MAX_STEM_CHARS: usize = 100;

/// Keep alphanumerics, space, hyphen and underscore; spaces become underscores;
/// truncated to [`MAX_STEM_CHARS`] characters. Applying it twice is a no-op.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .map(|c| if c == ' ' { '_' } else { c })
        .take(MAX_STEM_CHARS)
        .collect()
}

/// Storage key for a document: `{sanitized_title}.pdf`, or the base name of the
/// suggested filename when the title is empty (or sanitizes to nothing).
pub fn derive_key(title: &str, suggested_name: &str) -> String {
    let stem = sanitize_title(title);
    if !stem.is_empty() {
        return format!("{stem}{DOCUMENT_EXTENSION}");
    }
    base_name(suggested_name).to_string()
}

fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
