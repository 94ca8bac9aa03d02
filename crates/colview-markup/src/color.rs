//! Color values carried by control elements.
//!
//! Supports the same color formats as the stylesheet parser it grew out of:
//!
//! - Named colors: `red`, `green`, `blue`, etc. (8 ANSI colors)
//! - Bright variants: `bright_red`, `bright_green`, etc.
//! - 256-color palette: `0` through `255`
//! - RGB hex: `"#ff6b35"` or `"#fff"` (3 or 6 digit)
//!
//! # Example
//!
//! ```rust
//! use colview_markup::Color;
//!
//! assert_eq!(Color::parse("red").unwrap(), Color::Red);
//! assert_eq!(Color::parse("bright_blue").unwrap(), Color::BrightBlue);
//! assert_eq!(Color::parse("208").unwrap(), Color::Palette(208));
//! assert_eq!(Color::parse("#ff0000").unwrap(), Color::Rgb(255, 0, 0));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A terminal color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
    /// 256-color palette index.
    Palette(u8),
    /// True color RGB.
    Rgb(u8, u8, u8),
}

const NAMED: [(&str, Color); 16] = [
    ("black", Color::Black),
    ("red", Color::Red),
    ("green", Color::Green),
    ("yellow", Color::Yellow),
    ("blue", Color::Blue),
    ("magenta", Color::Magenta),
    ("cyan", Color::Cyan),
    ("white", Color::White),
    ("bright_black", Color::BrightBlack),
    ("bright_red", Color::BrightRed),
    ("bright_green", Color::BrightGreen),
    ("bright_yellow", Color::BrightYellow),
    ("bright_blue", Color::BrightBlue),
    ("bright_magenta", Color::BrightMagenta),
    ("bright_cyan", Color::BrightCyan),
    ("bright_white", Color::BrightWhite),
];

impl Color {
    /// Parses a color from a name, palette index or hex code.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();

        if let Some(hex) = s.strip_prefix('#') {
            return Self::parse_hex(hex);
        }

        if let Ok(index) = s.parse::<u16>() {
            return u8::try_from(index)
                .map(Color::Palette)
                .map_err(|_| format!("Color palette index {} out of range (0-255)", index));
        }

        let normalized = s.to_ascii_lowercase().replace(['-', ' '], "_");
        let normalized = match normalized.as_str() {
            "gray" | "grey" => "bright_black".to_string(),
            _ => normalized,
        };
        NAMED
            .iter()
            .find(|(name, _)| *name == normalized)
            .map(|(_, color)| *color)
            .ok_or_else(|| format!("Unknown color name: {}", s))
    }

    fn parse_hex(hex: &str) -> Result<Self, String> {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("Invalid hex: {}", hex));
        }
        let component = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| format!("Invalid hex: {}", hex))
        };
        match hex.len() {
            3 => Ok(Color::Rgb(
                component(0..1)? * 17,
                component(1..2)? * 17,
                component(2..3)? * 17,
            )),
            6 => Ok(Color::Rgb(component(0..2)?, component(2..4)?, component(4..6)?)),
            _ => Err(format!("Invalid hex color length: {}", hex)),
        }
    }

    /// SGR parameters selecting this color as foreground.
    pub fn fg_params(self) -> String {
        match self.basic_index() {
            Some((index, false)) => format!("{}", 30 + index),
            Some((index, true)) => format!("{}", 90 + index),
            None => match self {
                Color::Palette(n) => format!("38;5;{}", n),
                Color::Rgb(r, g, b) => format!("38;2;{};{};{}", r, g, b),
                _ => unreachable!("basic colors handled above"),
            },
        }
    }

    /// SGR parameters selecting this color as background.
    pub fn bg_params(self) -> String {
        match self.basic_index() {
            Some((index, false)) => format!("{}", 40 + index),
            Some((index, true)) => format!("{}", 100 + index),
            None => match self {
                Color::Palette(n) => format!("48;5;{}", n),
                Color::Rgb(r, g, b) => format!("48;2;{};{};{}", r, g, b),
                _ => unreachable!("basic colors handled above"),
            },
        }
    }

    /// Index into the 8-color table plus the bright flag, for basic colors.
    fn basic_index(self) -> Option<(u8, bool)> {
        let index = match self {
            Color::Black | Color::BrightBlack => 0,
            Color::Red | Color::BrightRed => 1,
            Color::Green | Color::BrightGreen => 2,
            Color::Yellow | Color::BrightYellow => 3,
            Color::Blue | Color::BrightBlue => 4,
            Color::Magenta | Color::BrightMagenta => 5,
            Color::Cyan | Color::BrightCyan => 6,
            Color::White | Color::BrightWhite => 7,
            Color::Palette(_) | Color::Rgb(..) => return None,
        };
        let bright = matches!(
            self,
            Color::BrightBlack
                | Color::BrightRed
                | Color::BrightGreen
                | Color::BrightYellow
                | Color::BrightBlue
                | Color::BrightMagenta
                | Color::BrightCyan
                | Color::BrightWhite
        );
        Some((index, bright))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((name, _)) = NAMED.iter().find(|(_, color)| color == self) {
            return f.write_str(name);
        }
        match self {
            Color::Palette(n) => write!(f, "{}", n),
            Color::Rgb(r, g, b) => write!(f, "#{:02x}{:02x}{:02x}", r, g, b),
            _ => unreachable!("named colors handled above"),
        }
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::parse(s)
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named() {
        assert_eq!(Color::parse("red").unwrap(), Color::Red);
        assert_eq!(Color::parse("Bright-Cyan").unwrap(), Color::BrightCyan);
        assert_eq!(Color::parse("grey").unwrap(), Color::BrightBlack);
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(Color::parse("#fff").unwrap(), Color::Rgb(255, 255, 255));
        assert_eq!(Color::parse("#ff6b35").unwrap(), Color::Rgb(255, 107, 53));
        assert!(Color::parse("#ff6b3").is_err());
        assert!(Color::parse("#zzz").is_err());
    }

    #[test]
    fn test_parse_hex_non_ascii() {
        assert!(Color::parse("#é1").is_err());
        assert!(Color::parse("#aé").is_err());
        assert!(Color::parse("#ff6b3€").is_err());
    }

    #[test]
    fn test_parse_palette() {
        assert_eq!(Color::parse("208").unwrap(), Color::Palette(208));
        assert!(Color::parse("256").is_err());
    }

    #[test]
    fn test_parse_unknown() {
        assert!(Color::parse("chartreuse").is_err());
    }

    #[test]
    fn test_sgr_params() {
        assert_eq!(Color::Red.fg_params(), "31");
        assert_eq!(Color::BrightRed.fg_params(), "91");
        assert_eq!(Color::Blue.bg_params(), "44");
        assert_eq!(Color::BrightWhite.bg_params(), "107");
        assert_eq!(Color::Palette(208).fg_params(), "38;5;208");
        assert_eq!(Color::Rgb(1, 2, 3).bg_params(), "48;2;1;2;3");
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        for color in [Color::Yellow, Color::BrightMagenta, Color::Palette(17), Color::Rgb(10, 20, 30)] {
            assert_eq!(Color::parse(&color.to_string()).unwrap(), color);
        }
    }
}
