use sanitize_filename::sanitize;

/// Picks the output filename from a `Content-Disposition` value.
///
/// Only the plain `filename=` parameter is honoured, quoted or bare. Anything
/// missing, malformed, or empty after sanitising yields `default`; resolution
/// never fails.
pub fn resolve_filename(disposition: Option<&str>, default: &str) -> String {
    disposition
        .and_then(filename_param)
        .map(|raw| sanitize(raw.trim()))
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn filename_param(header: &str) -> Option<&str> {
    const KEY: &str = "filename=";
    let idx = header.to_ascii_lowercase().find(KEY)?;
    let rest = header[idx + KEY.len()..].trim_start();

    if let Some(quoted) = rest.strip_prefix('"') {
        return Some(match quoted.find('"') {
            Some(end) => &quoted[..end],
            None => quoted,
        });
    }

    let end = rest.find(';').unwrap_or(rest.len());
    Some(rest[..end].trim_end())
}
