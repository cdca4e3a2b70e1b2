//! Light HTML tidying for rendered pages.

/// Strip zero-width characters, trim trailing whitespace, collapse runs of
/// blank lines into one and end with exactly one newline.
pub fn format_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut blank_run = false;

    for line in html.lines() {
        let line: String = line.chars().filter(|c| !is_zero_width(*c)).collect();
        let line = line.trim_end();

        if line.is_empty() {
            // Leading blank lines are dropped entirely
            if !out.is_empty() {
                blank_run = true;
            }
            continue;
        }

        if blank_run {
            out.push('\n');
            blank_run = false;
        }
        out.push_str(line);
        out.push('\n');
    }

    out
}

#[inline]
fn is_zero_width(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200D}' | '\u{FEFF}')
}
