//! Pairing code presentation.

/// Format a raw transport pairing code for human entry.
///
/// Strips anything that is not alphanumeric and inserts a `-` separator
/// every four characters, e.g. `ABCD1234` becomes `ABCD-1234`.
pub fn format_pairing_code(raw: &str) -> String {
    let cleaned: Vec<char> = raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    cleaned
        .chunks(4)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("-")
}
