use std::sync::LazyLock;

use regex::Regex;

/// `Host key fingerprint is SHA256:...`, `ED25519 key fingerprint is ...`.
static FINGERPRINT_ANNOUNCEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bkey fingerprint is\b").unwrap());

/// Strip SSH host-key noise from captured command output.
///
/// Drops fingerprint announcements and the border and side lines of
/// randomart blocks (`+---[ED25519 256]--+`, `|  .o=.  |`). Every other line
/// is kept in order.
pub fn sanitize(text: &str) -> String {
    let mut kept = String::with_capacity(text.len());
    for line in text.lines() {
        if is_noise(line) {
            continue;
        }
        kept.push_str(line);
        kept.push('\n');
    }
    kept
}

fn is_noise(line: &str) -> bool {
    FINGERPRINT_ANNOUNCEMENT.is_match(line) || is_art_border(line.trim())
}

fn is_art_border(line: &str) -> bool {
    line.len() >= 2
        && ((line.starts_with('+') && line.ends_with('+'))
            || (line.starts_with('|') && line.ends_with('|')))
}
