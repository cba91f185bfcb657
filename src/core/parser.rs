//! Blocklist body parsing.
//!
//! Entries are kept as opaque strings: no address or prefix validation happens here.

/// Returns the trimmed line if it is an entry, `None` for blanks and `#` comments.
pub fn parse_line(line: &str) -> Option<&str> {
    let line = line.trim();

    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    Some(line)
}

/// Extracts entries from a list body in file order, keeping duplicates.
pub fn parse_entries(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(parse_line)
        .map(str::to_string)
        .collect()
}
