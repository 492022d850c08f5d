use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: char = '…';

/// Terminal columns occupied by `s`.
///
/// ```
/// use notifeed::util::display_width;
///
/// assert_eq!(display_width("Hello"), 5);
/// assert_eq!(display_width("你好"), 4);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Cut `s` to at most `max_width` columns, ending in `…` when shortened.
///
/// Borrowed when the input already fits.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    let budget = max_width - 1; // room for the ellipsis
    let mut used = 0;
    let mut out = String::new();
    for c in s.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push(ELLIPSIS);
    Cow::Owned(out)
}

/// Drop control characters and ANSI escape sequences from server-provided text.
///
/// Newlines and tabs become single spaces; notification text is always shown
/// on one line.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(|c| c.is_control()) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => match chars.peek() {
                // CSI: parameters until a final byte in 0x40..=0x7e
                Some('[') => {
                    chars.next();
                    for n in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&n) {
                            break;
                        }
                    }
                }
                // OSC: until BEL or ESC '\'
                Some(']') => {
                    chars.next();
                    while let Some(n) = chars.next() {
                        if n == '\u{07}' {
                            break;
                        }
                        if n == '\u{1b}' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            '\n' | '\r' | '\t' => {
                if !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_is_borrowed() {
        assert!(matches!(truncate_to_width("short", 10), Cow::Borrowed("short")));
    }

    #[test]
    fn test_truncates_with_ellipsis() {
        assert_eq!(truncate_to_width("Hello, world", 6), "Hello…");
        assert_eq!(display_width(&truncate_to_width("Hello, world", 6)), 6);
    }

    #[test]
    fn test_truncates_wide_chars_on_boundary() {
        // Each CJK char is 2 columns; 5 columns fits two chars plus the ellipsis
        assert_eq!(truncate_to_width("你好世界", 5), "你好…");
    }

    #[test]
    fn test_zero_width_budget() {
        assert_eq!(truncate_to_width("anything", 0), "");
    }

    #[test]
    fn test_strip_clean_text_is_borrowed() {
        assert!(matches!(strip_control_chars("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_strip_ansi_sequences() {
        assert_eq!(strip_control_chars("\u{1b}[31mred\u{1b}[0m"), "red");
        assert_eq!(
            strip_control_chars("\u{1b}]0;title\u{07}after"),
            "after"
        );
    }

    #[test]
    fn test_newlines_collapse_to_space() {
        assert_eq!(strip_control_chars("line one\r\nline two"), "line one line two");
    }
}
