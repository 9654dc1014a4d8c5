use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Display width of a string in terminal columns (CJK and emoji count as 2).
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncates a string to fit within `max_width` terminal columns.
///
/// Appends "..." when text is cut. Widths of 3 columns or fewer get as many
/// characters as fit, without an ellipsis. Returns `Cow::Borrowed` when the
/// string already fits.
///
/// ```
/// use taxon::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Web Development", 8), "Web D...");
/// assert_eq!(truncate_to_width("Design", 10), "Design");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let budget = if max_width <= ELLIPSIS_WIDTH {
        max_width
    } else {
        max_width - ELLIPSIS_WIDTH
    };

    let mut used = 0;
    let mut cut = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        cut = idx + c.len_utf8();
    }

    if max_width <= ELLIPSIS_WIDTH {
        Cow::Owned(s[..cut].to_string())
    } else {
        Cow::Owned(format!("{}{}", &s[..cut], ELLIPSIS))
    }
}

/// Strip terminal control characters and ANSI escape sequences.
///
/// Category names and descriptions come from the storage backend and are
/// rendered straight into the terminal, so CSI (`ESC [ ... final`) and OSC
/// (`ESC ] ... BEL|ST`) sequences, bare ESC, DEL and C0 controls other than
/// tab/newline/CR are removed.
///
/// Returns `Cow::Borrowed` when there is nothing to strip.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    fn is_control(c: char) -> bool {
        c == '\x7f' || (c < '\x20' && !matches!(c, '\t' | '\n' | '\r'))
    }

    if !s.chars().any(is_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            match chars.peek() {
                Some('[') => {
                    chars.next();
                    for n in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&n) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    while let Some(n) = chars.next() {
                        if n == '\x07' {
                            break;
                        }
                        if n == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            }
        } else if !is_control(c) {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Derive a URL-safe slug from a display name.
///
/// Lowercases, collapses every run of non-alphanumeric characters into a
/// single hyphen and trims hyphens from both ends. Only ASCII letters and
/// digits survive. Applying it to its own output is a no-op.
///
/// ```
/// use taxon::util::slugify;
///
/// assert_eq!(slugify("Web Development!"), "web-development");
/// assert_eq!(slugify("web-development"), "web-development");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}
