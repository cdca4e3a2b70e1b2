//! Live-reload client injection into HTML responses.

use std::sync::LazyLock;

use super::message::EVENTS_PATH;

const CLIENT_JS: &str = include_str!("livereload.js");

/// Inline `<script>` that subscribes to the event stream.
static CLIENT_TAG: LazyLock<String> = LazyLock::new(|| {
    format!(
        "<script>{}</script>",
        CLIENT_JS.replace("__EVENTS_PATH__", EVENTS_PATH).trim_end()
    )
});

/// Insert the client script before the last `</body>` outside an HTML
/// comment, or append it.
pub fn inject_client(content: &[u8]) -> Vec<u8> {
    let script = CLIENT_TAG.as_bytes();

    let mut result = Vec::with_capacity(content.len() + script.len());
    match body_close(content) {
        Some(pos) => {
            result.extend_from_slice(&content[..pos]);
            result.extend_from_slice(script);
            result.extend_from_slice(&content[pos..]);
        }
        // No </body>: browsers still run a trailing script
        None => {
            result.extend_from_slice(content);
            result.extend_from_slice(script);
        }
    }
    result
}

/// Position of the last `</body>` (any case) that is not commented out.
fn body_close(content: &[u8]) -> Option<usize> {
    const PATTERN: &[u8] = b"</body>";
    const COMMENT_OPEN: &[u8] = b"<!--";
    const COMMENT_CLOSE: &[u8] = b"-->";

    let mut found = None;
    let mut pos = 0;
    while pos < content.len() {
        let rest = &content[pos..];
        if rest.starts_with(COMMENT_OPEN) {
            // An unterminated comment runs to the end of the document
            match find(&rest[COMMENT_OPEN.len()..], COMMENT_CLOSE) {
                Some(end) => pos += COMMENT_OPEN.len() + end + COMMENT_CLOSE.len(),
                None => break,
            }
            continue;
        }
        if rest.len() >= PATTERN.len() && rest[..PATTERN.len()].eq_ignore_ascii_case(PATTERN) {
            found = Some(pos);
            pos += PATTERN.len();
            continue;
        }
        pos += 1;
    }
    found
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
