use std::borrow::Cow;

use chrono::NaiveDateTime;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Terminal columns occupied by `s` (CJK and emoji count as 2).
///
/// ```
/// use webrss_client::util::display_width;
///
/// assert_eq!(display_width("Hello"), 5);
/// assert_eq!(display_width("日本"), 4);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Cut `s` so it fits in `max_width` columns, ending in "..." when cut.
///
/// Widths of 3 or less have no room for an ellipsis and just keep the
/// characters that fit. Returns `Cow::Borrowed` when nothing was cut.
///
/// ```
/// use webrss_client::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Short", 10), "Short");
/// assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
/// assert_eq!(truncate_to_width("Test", 2), "Te");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let (budget, suffix) = if max_width <= ELLIPSIS_WIDTH {
        (max_width, "")
    } else {
        (max_width - ELLIPSIS_WIDTH, ELLIPSIS)
    };

    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    Cow::Owned(format!("{}{}", &s[..end], suffix))
}

fn is_stripped_control(b: u8) -> bool {
    b == 0x7f || (b < 0x20 && b != b'\t' && b != b'\n' && b != b'\r')
}

/// Remove terminal control characters and ANSI escape sequences.
///
/// Feed titles and entry bodies come from third-party feeds and are drawn
/// straight into the terminal. CSI (`ESC [` ... final byte) and OSC
/// (`ESC ]` ... BEL or `ESC \`) sequences are dropped whole; tab, newline
/// and carriage return are kept.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    if !bytes.iter().any(|&b| b == 0x1b || is_stripped_control(b)) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            0x1b => {
                i += 1;
                match bytes.get(i) {
                    Some(b'[') => {
                        i += 1;
                        while i < bytes.len() {
                            let c = bytes[i];
                            i += 1;
                            if (0x40..=0x7e).contains(&c) {
                                break;
                            }
                        }
                    }
                    Some(b']') => {
                        i += 1;
                        while i < bytes.len() {
                            if bytes[i] == 0x07 {
                                i += 1;
                                break;
                            }
                            if bytes[i] == 0x1b && bytes.get(i + 1) == Some(&b'\\') {
                                i += 2;
                                break;
                            }
                            i += 1;
                        }
                    }
                    _ => {}
                }
            }
            b if is_stripped_control(b) => i += 1,
            _ => {
                let start = i;
                while i < bytes.len() && bytes[i] != 0x1b && !is_stripped_control(bytes[i]) {
                    i += 1;
                }
                // Only ASCII bytes end a run, so the slice is on char boundaries.
                out.push_str(&s[start..i]);
            }
        }
    }
    Cow::Owned(out)
}

/// Column width handed to the HTML renderer. The reader pane re-wraps, so
/// this only has to be wide enough never to wrap itself.
const HTML_RENDER_WIDTH: usize = 10_000;

/// Plain-text rendering of an entry body for the reader pane.
///
/// Entities are decoded and block elements become line breaks (via
/// `html2text`), then control characters are removed and runs of blank
/// lines collapsed. Input the renderer rejects is shown as-is.
///
/// ```
/// use webrss_client::util::html_to_text;
///
/// assert_eq!(html_to_text("<p>Fish &amp; chips</p>"), "Fish & chips");
/// ```
pub fn html_to_text(html: &str) -> String {
    let rendered = match html2text::config::plain().string_from_read(html.as_bytes(), HTML_RENDER_WIDTH) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "Could not render entry HTML, showing source");
            html.to_string()
        }
    };
    let clean = strip_control_chars(&rendered);

    let mut out = String::with_capacity(clean.len());
    let mut blank_run = 0;
    for line in clean.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 || out.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim_end().to_string()
}

/// Short age of a timestamp relative to `now`: "5m", "3h", "2d", or a date.
pub fn relative_time(then: NaiveDateTime, now: NaiveDateTime) -> String {
    let secs = (now - then).num_seconds();
    match secs {
        s if s < 60 => "now".to_string(),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3600),
        s if s < 7 * 86_400 => format!("{}d", s / 86_400),
        _ => then.format("%Y-%m-%d").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ascii_truncation() {
        assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
        assert_eq!(truncate_to_width("Short", 10), "Short");
        assert_eq!(truncate_to_width("12345", 5), "12345");
    }

    #[test]
    fn test_wide_char_truncation() {
        assert_eq!(truncate_to_width("日本語です", 7), "日本...");
        assert_eq!(truncate_to_width("日本語です", 5), "日...");
        assert_eq!(truncate_to_width("日本", 3), "日");
        assert_eq!(truncate_to_width("日本", 1), "");
    }

    #[test]
    fn test_narrow_widths() {
        assert_eq!(truncate_to_width("Test", 0), "");
        assert_eq!(truncate_to_width("Test", 3), "Tes");
        assert_eq!(truncate_to_width("Testing", 4), "T...");
    }

    #[test]
    fn test_strip_control_clean_is_borrowed() {
        let input = "line1\nline2\ttabbed\r\n";
        assert!(matches!(strip_control_chars(input), Cow::Borrowed(_)));
    }

    #[test]
    fn test_strip_control_sequences() {
        assert_eq!(strip_control_chars("he\x00ll\x07o\x7f"), "hello");
        assert_eq!(strip_control_chars("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(strip_control_chars("\x1b]0;title\x07safe"), "safe");
        assert_eq!(strip_control_chars("\x1b]0;title\x1b\\safe"), "safe");
        assert_eq!(strip_control_chars("a\x1bb"), "ab");
        assert_eq!(strip_control_chars("日本 \x1b[1m語\x1b[0m"), "日本 語");
    }

    #[test]
    fn test_html_to_text_breaks_blocks() {
        let html = "<p>First</p><p>Second<br>line</p>\n\n\n<div>Third</div>";
        let text = html_to_text(html);
        let words: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        assert_eq!(words, vec!["First", "Second", "line", "Third"]);
        assert!(!text.contains("\n\n\n"));
    }

    #[test]
    fn test_html_to_text_decodes_entities() {
        let text = html_to_text("<p>Fish &amp; chips &#8217;n AT&T rocks; yes</p>");
        assert_eq!(text, "Fish & chips \u{2019}n AT&T rocks; yes");
        assert_eq!(html_to_text("<p>1 &lt; 2 &gt; 0</p>"), "1 < 2 > 0");
    }

    #[test]
    fn test_html_to_text_keeps_bare_angle_brackets() {
        assert_eq!(html_to_text("<p>if a < b and c > d</p>"), "if a < b and c > d");
    }

    #[test]
    fn test_html_to_text_strips_escapes() {
        let text = html_to_text("<p>\x1b[31mred</p>");
        assert!(!text.contains('\x1b'));
        assert!(text.ends_with("red"));
    }

    #[test]
    fn test_relative_time() {
        let now = NaiveDateTime::parse_from_str("2024-03-10 12:00", "%Y-%m-%d %H:%M").unwrap();
        let at = |s: &str| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap();
        assert_eq!(relative_time(at("2024-03-10 11:59"), now), "1m");
        assert_eq!(relative_time(at("2024-03-10 09:00"), now), "3h");
        assert_eq!(relative_time(at("2024-03-08 12:00"), now), "2d");
        assert_eq!(relative_time(at("2024-01-01 00:00"), now), "2024-01-01");
        assert_eq!(relative_time(now, now), "now");
    }
}
