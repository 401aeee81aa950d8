//! Checksum and free-space helpers for remote staging.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Extract a SHA-256 digest from `sha256sum`-style output.
///
/// The digest is the first whitespace-separated token, provided it is 64
/// hex characters.
pub fn parse_checksum_output(output: &str) -> Option<String> {
    let token = output.split_whitespace().next()?;
    if token.len() == 64 && token.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(token.to_ascii_lowercase())
    } else {
        None
    }
}

/// Available bytes from `df -k` output.
///
/// The column is located by its header (`Avail` or `Available`). Long
/// filesystem names make `df` wrap the data row, so the row is read as every
/// token after the header. Only the trailing mount point may contain spaces,
/// so indexing from the front stays aligned.
pub fn parse_df_available(output: &str) -> Option<u64> {
    let mut lines = output.lines().skip_while(|l| !l.contains("Avail"));
    let column = lines
        .next()?
        .split_whitespace()
        .position(|h| h.starts_with("Avail"))?;

    let kib: u64 = lines
        .flat_map(str::split_whitespace)
        .nth(column)?
        .parse()
        .ok()?;
    Some(kib.saturating_mul(1024))
}

/// Single-quote `value` for a POSIX shell.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Substitute `{path}` and `{dir}` in a command template.
pub fn render_command(template: &str, path: &str) -> String {
    let dir = match path.rsplit_once('/') {
        Some(("", _)) => "/",
        Some((dir, _)) => dir,
        None => ".",
    };
    template
        .replace("{path}", &shell_quote(path))
        .replace("{dir}", &shell_quote(dir))
}
