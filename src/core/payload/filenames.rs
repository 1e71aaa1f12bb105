//! Document filenames

use std::collections::HashSet;

/// File extension, with leading dot, for a content type
pub fn extension_for_content_type(content_type: Option<&str>) -> &'static str {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match mime.as_str() {
        "application/xml" | "text/xml" => ".xml",
        "application/pdf" => ".pdf",
        "application/json" => ".json",
        "text/plain" => ".txt",
        "image/png" => ".png",
        "image/jpeg" | "image/jpg" => ".jpg",
        _ => "",
    }
}

/// Filename for a document
///
/// An explicit override wins over the stored filename, which wins over a
/// name built from the data type and content type.
pub fn resolve_filename(
    override_name: Option<&str>,
    existing: Option<&str>,
    data_type: &str,
    content_type: Option<&str>,
) -> String {
    present(override_name)
        .or_else(|| present(existing))
        .map(str::to_string)
        .unwrap_or_else(|| format!("{data_type}{}", extension_for_content_type(content_type)))
}

fn present(name: Option<&str>) -> Option<&str> {
    name.map(str::trim).filter(|n| !n.is_empty())
}

/// Extension without the dot, empty if there is none
pub fn dotless_extension(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext,
        _ => "",
    }
}

fn with_counter(filename: &str, counter: usize) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}({counter}).{ext}"),
        _ => format!("{filename}({counter})"),
    }
}

/// Makes filenames unique, ignoring case
///
/// The first occurrence keeps its name; later ones get `(1)`, `(2)`, ...
/// before the extension. Names in `reserved` are treated as already taken.
pub fn deduplicate<'a>(filenames: impl IntoIterator<Item = &'a mut String>, reserved: &[&str]) {
    let mut taken: HashSet<String> = reserved.iter().map(|r| r.to_lowercase()).collect();

    for filename in filenames {
        if taken.insert(filename.to_lowercase()) {
            continue;
        }

        let mut counter = 1;
        let unique = loop {
            let candidate = with_counter(filename, counter);
            if taken.insert(candidate.to_lowercase()) {
                break candidate;
            }
            counter += 1;
        };
        *filename = unique;
    }
}
