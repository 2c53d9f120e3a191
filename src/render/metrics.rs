//! The embedded DejaVu Sans faces: glyph coverage and advance widths, used to
//! center and wrap text and to keep characters without a glyph visible.

use std::io;

use ttf_parser::{Face, GlyphId};

pub const REGULAR_TTF: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
pub const BOLD_TTF: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

/// Drawn in place of any character the faces have no glyph for.
pub const REPLACEMENT: char = '?';

pub struct Metrics {
    regular: Face<'static>,
    bold: Face<'static>,
}

fn parse(data: &'static [u8]) -> io::Result<Face<'static>> {
    Face::parse(data, 0).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("font: {e}")))
}

impl Metrics {
    pub fn load() -> io::Result<Self> {
        Ok(Self {
            regular: parse(REGULAR_TTF)?,
            bold: parse(BOLD_TTF)?,
        })
    }

    fn face(&self, bold: bool) -> &Face<'static> {
        if bold { &self.bold } else { &self.regular }
    }

    pub fn glyph_id(&self, c: char, bold: bool) -> Option<u16> {
        self.face(bold).glyph_index(c).map(|GlyphId(id)| id)
    }

    /// `text` as it will be drawn: control characters and characters without
    /// a glyph become [`REPLACEMENT`].
    pub fn printable(&self, text: &str, bold: bool) -> String {
        text.chars()
            .map(|c| {
                if c.is_control() || self.glyph_id(c, bold).is_none() {
                    REPLACEMENT
                } else {
                    c
                }
            })
            .collect()
    }

    /// Advance of `c` in ems, measured on the glyph actually drawn.
    fn advance(&self, c: char, bold: bool) -> f32 {
        let face = self.face(bold);
        let glyph = face
            .glyph_index(c)
            .filter(|_| !c.is_control())
            .or_else(|| face.glyph_index(REPLACEMENT));
        let units = glyph
            .and_then(|g| face.glyph_hor_advance(g))
            .unwrap_or(face.units_per_em() / 2);
        f32::from(units) / f32::from(face.units_per_em())
    }

    /// Width of `text` in points at `size`.
    pub fn text_width(&self, text: &str, size: f32, bold: bool) -> f32 {
        text.chars().map(|c| self.advance(c, bold)).sum::<f32>() * size
    }

    /// Greedy word wrap to `max_width` points. Explicit newlines are kept and
    /// words wider than a whole line are split by character.
    pub fn wrap(&self, text: &str, size: f32, bold: bool, max_width: f32) -> Vec<String> {
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let mut line = String::new();
            for word in paragraph.split_whitespace() {
                let candidate = if line.is_empty() { word.to_string() } else { format!("{line} {word}") };
                if self.text_width(&candidate, size, bold) <= max_width {
                    line = candidate;
                    continue;
                }
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                for c in word.chars() {
                    line.push(c);
                    if self.text_width(&line, size, bold) > max_width && line.chars().count() > 1 {
                        line.pop();
                        lines.push(std::mem::take(&mut line));
                        line.push(c);
                    }
                }
            }
            lines.push(line);
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> Metrics {
        Metrics::load().unwrap()
    }

    #[test]
    fn bold_is_wider() {
        let m = metrics();
        assert!(m.text_width("Experience", 12.0, true) > m.text_width("Experience", 12.0, false));
        assert_eq!(m.text_width("", 12.0, false), 0.0);
    }

    #[test]
    fn covers_cyrillic_greek_and_dash() {
        let m = metrics();
        for text in ["Иван Петров", "Αθήνα", "—", "N/A"] {
            assert_eq!(m.printable(text, false), text);
            assert_eq!(m.printable(text, true), text);
        }
        assert!(m.text_width("Иван", 11.0, false) > 0.0);
    }

    #[test]
    fn uncovered_characters_stay_visible() {
        let m = metrics();
        assert_eq!(m.printable("Инженер 工程师", false), "Инженер ???");
        assert_eq!(m.printable("a\u{7}b", false), "a?b");
        assert_eq!(m.text_width("工", 10.0, false), m.text_width("?", 10.0, false));
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let m = metrics();
        let lines = m.wrap("one two three four five six", 10.0, false, 60.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.join(" "), "one two three four five six");
        assert!(lines.iter().all(|l| m.text_width(l, 10.0, false) <= 60.0));
    }

    #[test]
    fn splits_overlong_words_and_keeps_newlines() {
        let lines = metrics().wrap("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\nb", 10.0, false, 40.0);
        assert!(lines.len() >= 3);
        assert_eq!(lines.last().map(String::as_str), Some("b"));
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        assert_eq!(metrics().wrap("", 10.0, false, 100.0), vec![String::new()]);
    }
}
