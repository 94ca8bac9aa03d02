//! ANSI-aware width, truncation and padding over flattened strings.
//!
//! These functions operate on the *flattened* form of markup text: a plain
//! string that may contain terminal escape sequences. Escape sequences count
//! as zero display columns, and visible characters are measured with
//! Unicode width rules (CJK characters take two columns).
//!
//! ```rust
//! use colview_markup::width::{display_width, truncate, make_fixed_width};
//! use colview_markup::{Align, TruncateAt};
//!
//! assert_eq!(display_width("\x1b[31mred\x1b[0m"), 3);
//! assert_eq!(truncate("Hello World", 6, true, TruncateAt::End), "Hello…");
//! assert_eq!(truncate("Hello World", 6, true, TruncateAt::Start), "…World");
//! assert_eq!(make_fixed_width("ab", 5, true, Align::Center, TruncateAt::End), " ab  ");
//! ```

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthChar;

/// The marker substituted at a trimmed edge.
pub const ELLIPSIS: char = '…';

/// Text alignment within a fixed width.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    /// Pad on the right.
    #[default]
    Left,
    /// Pad on the left.
    Right,
    /// Pad on both sides; an odd leftover space goes to the right.
    Center,
}

/// Which edge is trimmed when content exceeds its width.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncateAt {
    /// Keep the start: "Hello W…"
    #[default]
    End,
    /// Keep the end: "…o World"
    Start,
    /// Keep both ends: "Hel…orld"
    Middle,
}

/// A piece of a flattened string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    /// A complete escape sequence (zero width).
    Escape(&'a str),
    /// A visible character with its display width.
    Char(char, usize),
}

/// Splits a flattened string into escape sequences and visible characters.
///
/// Recognizes CSI sequences (`ESC [ ... final`), OSC sequences terminated by
/// BEL or `ESC \`, and two-byte escapes. A dangling `ESC` is treated as a
/// zero-width escape of its own.
pub(crate) fn segments(s: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut chars = s.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if c != '\x1b' {
            out.push(Segment::Char(c, c.width().unwrap_or(0)));
            continue;
        }

        let end = match chars.peek().copied() {
            Some((_, '[')) => {
                chars.next();
                let mut end = s.len();
                for (i, c) in chars.by_ref() {
                    if ('\x40'..='\x7e').contains(&c) {
                        end = i + c.len_utf8();
                        break;
                    }
                }
                end
            }
            Some((_, ']')) => {
                chars.next();
                let mut end = s.len();
                while let Some((i, c)) = chars.next() {
                    if c == '\x07' {
                        end = i + 1;
                        break;
                    }
                    if c == '\x1b' {
                        if let Some((j, '\\')) = chars.peek().copied() {
                            chars.next();
                            end = j + 1;
                            break;
                        }
                    }
                }
                end
            }
            Some((i, next)) => {
                chars.next();
                i + next.len_utf8()
            }
            None => start + 1,
        };
        out.push(Segment::Escape(&s[start..end]));
    }

    out
}

/// Returns the display width of a string, ignoring escape sequences.
pub fn display_width(s: &str) -> usize {
    segments(s)
        .iter()
        .map(|seg| match seg {
            Segment::Char(_, w) => *w,
            Segment::Escape(_) => 0,
        })
        .sum()
}

/// Removes every escape sequence, leaving only visible characters.
pub fn strip_escapes(s: &str) -> String {
    console::strip_ansi_codes(s).into_owned()
}

/// Truncates a flattened string to at most `max_width` display columns.
///
/// Escape sequences are never removed, only visible characters, so color
/// scopes opened before the cut stay closed after it. When `use_ellipsis` is
/// set and `max_width > 0`, one column is spent on `…` placed at the trimmed
/// edge. A string that already fits is returned unchanged.
pub fn truncate(s: &str, max_width: usize, use_ellipsis: bool, at: TruncateAt) -> String {
    if display_width(s) <= max_width {
        return s.to_string();
    }

    let segs = segments(s);
    let marker_width = usize::from(use_ellipsis && max_width > 0);
    let budget = max_width - marker_width;

    let char_widths: Vec<usize> = segs
        .iter()
        .filter_map(|seg| match seg {
            Segment::Char(_, w) => Some(*w),
            Segment::Escape(_) => None,
        })
        .collect();
    let keep = keep_mask(&char_widths, budget, at);

    let mut out = String::with_capacity(s.len());
    let mut char_index = 0;
    let mut marker_pending = marker_width > 0;
    for seg in segs {
        match seg {
            Segment::Escape(esc) => out.push_str(esc),
            Segment::Char(c, _) => {
                if keep[char_index] {
                    out.push(c);
                } else if marker_pending {
                    out.push(ELLIPSIS);
                    marker_pending = false;
                }
                char_index += 1;
            }
        }
    }
    out
}

/// Decides which visible characters survive truncation.
///
/// The dropped characters always form one contiguous run, which is where the
/// ellipsis goes.
fn keep_mask(widths: &[usize], budget: usize, at: TruncateAt) -> Vec<bool> {
    let mut keep = vec![false; widths.len()];

    let keep_prefix = |keep: &mut [bool], budget: usize| {
        let mut used = 0;
        for (i, w) in widths.iter().enumerate() {
            if used + w > budget {
                break;
            }
            used += w;
            keep[i] = true;
        }
    };
    let keep_suffix = |keep: &mut [bool], budget: usize| {
        let mut used = 0;
        for (i, w) in widths.iter().enumerate().rev() {
            if used + w > budget {
                break;
            }
            used += w;
            keep[i] = true;
        }
    };

    match at {
        TruncateAt::End => keep_prefix(&mut keep, budget),
        TruncateAt::Start => keep_suffix(&mut keep, budget),
        TruncateAt::Middle => {
            let left = budget.div_ceil(2);
            keep_prefix(&mut keep, left);
            keep_suffix(&mut keep, budget - left);
        }
    }
    keep
}

/// Pads on the left to `width` columns (right-aligns).
pub fn pad_left(s: &str, width: usize) -> String {
    let current = display_width(s);
    if current >= width {
        return s.to_string();
    }
    format!("{}{}", " ".repeat(width - current), s)
}

/// Pads on the right to `width` columns (left-aligns).
pub fn pad_right(s: &str, width: usize) -> String {
    let current = display_width(s);
    if current >= width {
        return s.to_string();
    }
    format!("{}{}", s, " ".repeat(width - current))
}

/// Centers within `width` columns; an odd leftover space goes to the right.
pub fn pad_center(s: &str, width: usize) -> String {
    let current = display_width(s);
    if current >= width {
        return s.to_string();
    }
    let total = width - current;
    let left = total / 2;
    format!("{}{}{}", " ".repeat(left), s, " ".repeat(total - left))
}

/// Pads according to `align`.
pub fn pad(s: &str, width: usize, align: Align) -> String {
    match align {
        Align::Left => pad_right(s, width),
        Align::Right => pad_left(s, width),
        Align::Center => pad_center(s, width),
    }
}

/// Forces a flattened string to exactly `width` display columns.
///
/// Shorter input is padded per `align`, longer input is truncated per
/// [`truncate`], and input of exactly `width` columns is returned as is. If
/// truncation lands short of `width` (a wide character did not fit), the
/// result is padded back up.
pub fn make_fixed_width(
    s: &str,
    width: usize,
    use_ellipsis: bool,
    align: Align,
    at: TruncateAt,
) -> String {
    let current = display_width(s);
    match current.cmp(&width) {
        std::cmp::Ordering::Equal => s.to_string(),
        std::cmp::Ordering::Less => pad(s, width, align),
        std::cmp::Ordering::Greater => {
            let truncated = truncate(s, width, use_ellipsis, at);
            pad(&truncated, width, align)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: &str = "\x1b[31m";
    const RESET: &str = "\x1b[0m";

    #[test]
    fn test_display_width_plain_and_wide() {
        assert_eq!(display_width("hello"), 5);
        assert_eq!(display_width("日本"), 4);
        assert_eq!(display_width(""), 0);
    }

    #[test]
    fn test_display_width_ignores_escapes() {
        let s = format!("{}red{}", RED, RESET);
        assert_eq!(display_width(&s), 3);
        assert_eq!(display_width("\x1b]0;title\x07x"), 1);
    }

    #[test]
    fn test_segments_dangling_escape() {
        assert_eq!(segments("a\x1b"), vec![Segment::Char('a', 1), Segment::Escape("\x1b")]);
    }

    #[test]
    fn test_strip_escapes() {
        assert_eq!(strip_escapes(&format!("{}red{}", RED, RESET)), "red");
    }

    #[test]
    fn test_truncate_fits_unchanged() {
        assert_eq!(truncate("Hello", 10, true, TruncateAt::End), "Hello");
        assert_eq!(truncate("Hello", 5, true, TruncateAt::End), "Hello");
    }

    #[test]
    fn test_truncate_end() {
        assert_eq!(truncate("Hello World", 6, true, TruncateAt::End), "Hello…");
        assert_eq!(truncate("Hello World", 5, false, TruncateAt::End), "Hello");
    }

    #[test]
    fn test_truncate_start() {
        assert_eq!(truncate("Hello World", 6, true, TruncateAt::Start), "…World");
    }

    #[test]
    fn test_truncate_middle() {
        assert_eq!(truncate("Hello World", 8, true, TruncateAt::Middle), "Hell…rld");
        assert_eq!(truncate("abcdefgh", 4, false, TruncateAt::Middle), "abgh");
    }

    #[test]
    fn test_truncate_zero_and_one() {
        assert_eq!(truncate("Hello", 0, true, TruncateAt::End), "");
        assert_eq!(truncate("Hello", 1, true, TruncateAt::End), "…");
    }

    #[test]
    fn test_truncate_keeps_escape_sequences() {
        let s = format!("{}Hello World{}", RED, RESET);
        let out = truncate(&s, 6, true, TruncateAt::End);
        assert_eq!(out, format!("{}Hello…{}", RED, RESET));
        assert_eq!(display_width(&out), 6);
    }

    #[test]
    fn test_truncate_wide_char_does_not_split() {
        let out = truncate("日本語", 3, false, TruncateAt::End);
        assert_eq!(out, "日");
    }

    #[test]
    fn test_pad_variants() {
        assert_eq!(pad_left("ab", 4), "  ab");
        assert_eq!(pad_right("ab", 4), "ab  ");
        assert_eq!(pad_center("ab", 5), " ab  ");
        assert_eq!(pad_center("ab", 6), "  ab  ");
        assert_eq!(pad_left("abcdef", 4), "abcdef");
    }

    #[test]
    fn test_make_fixed_width() {
        assert_eq!(make_fixed_width("abc", 3, true, Align::Right, TruncateAt::End), "abc");
        assert_eq!(make_fixed_width("abc", 5, true, Align::Right, TruncateAt::End), "  abc");
        assert_eq!(make_fixed_width("abcdef", 4, true, Align::Left, TruncateAt::End), "abc…");
        assert_eq!(make_fixed_width("日本語", 3, false, Align::Left, TruncateAt::End), "日 ");
    }
}
