//! Page text for the base-14 fonts
//!
//! Helvetica only covers WinAnsi, so Cyrillic (including the Kazakh
//! letters) is transliterated to Latin before it reaches a content stream.
//! Attachment names and document metadata keep the original text; they are
//! written as UTF-16 strings elsewhere.

use std::fmt::Write as _;

/// Fonts registered on every card page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
    Italic,
}

impl Font {
    pub fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Italic => "F3",
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Italic => "Helvetica-Oblique",
        }
    }

    pub const ALL: [Font; 3] = [Font::Regular, Font::Bold, Font::Italic];

    fn average_width(self) -> f32 {
        match self {
            Font::Bold => 0.56,
            _ => 0.52,
        }
    }
}

fn transliterate_lower(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' | 'ә' => "a",
        'б' => "b",
        'в' => "v",
        'г' | 'ғ' => "g",
        'д' => "d",
        'е' | 'ё' | 'э' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' | 'й' | 'і' => "i",
        'к' => "k",
        'қ' => "q",
        'л' => "l",
        'м' => "m",
        'н' | 'ң' => "n",
        'о' | 'ө' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' | 'ұ' | 'ү' => "u",
        'ф' => "f",
        'х' => "kh",
        'һ' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'ю' => "iu",
        'я' => "ia",
        _ => return None,
    };
    Some(latin)
}

fn is_upper(c: char) -> bool {
    c.is_uppercase()
}

/// Encode text as WinAnsi bytes, transliterating Cyrillic.
///
/// An uppercase Cyrillic letter followed by a lowercase one is title-cased
/// ("Ш" in "Шаблон" becomes "Sh"); otherwise the whole expansion is
/// uppercased ("ШТ" becomes "SHT").
pub fn to_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        let lower = c.to_lowercase().next().unwrap_or(c);
        if let Some(latin) = transliterate_lower(lower) {
            if is_upper(c) {
                let next_is_lower = chars.peek().map(|n| n.is_lowercase()).unwrap_or(false);
                let mut letters = latin.chars();
                if let Some(first) = letters.next() {
                    out.push(first.to_ascii_uppercase() as u8);
                }
                for rest in letters {
                    let rest = if next_is_lower { rest } else { rest.to_ascii_uppercase() };
                    out.push(rest as u8);
                }
            } else {
                out.extend_from_slice(latin.as_bytes());
            }
            continue;
        }

        match c {
            '№' => out.extend_from_slice(b"No"),
            '–' => out.push(0x96),
            '—' => out.push(0x97),
            '«' => out.push(0xab),
            '»' => out.push(0xbb),
            '\t' => out.push(b' '),
            c if (c as u32) < 0x20 => {}
            c if (c as u32) < 0x7f => out.push(c as u8),
            c if (0xa0..=0xff).contains(&(c as u32)) => out.push(c as u32 as u8),
            _ => out.push(b'?'),
        }
    }

    out
}

/// Escape bytes for a PDF literal string
pub fn escape_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push('\\');
                out.push(b as char);
            }
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{:03o}", b);
            }
        }
    }
    out
}

/// Split text into lines that fit `width` points at `size`.
///
/// Explicit newlines are kept; words longer than a line are hard-broken.
pub fn wrap(text: &str, font: Font, size: f32, width: f32) -> Vec<String> {
    let max_chars = ((width / (size * font.average_width())) as usize).max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut line_len = 0usize;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            while word.len() > max_chars {
                if line_len > 0 {
                    lines.push(std::mem::take(&mut line));
                    line_len = 0;
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let needed = if line_len == 0 { word.len() } else { line_len + 1 + word.len() };
            if needed > max_chars && line_len > 0 {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }
            if line_len > 0 {
                line.push(' ');
                line_len += 1;
            }
            line.extend(word.iter());
            line_len += word.len();
        }

        lines.push(line);
    }

    lines
}

/// Builder for a page content stream
#[derive(Debug, Default)]
pub struct Canvas {
    ops: String,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single line of text with its baseline at `y`
    pub fn text(&mut self, x: f32, y: f32, font: Font, size: f32, text: &str) {
        let _ = writeln!(
            self.ops,
            "BT /{} {} Tf {:.2} {:.2} Td ({}) Tj ET",
            font.resource_name(),
            size,
            x,
            y,
            escape_literal(&to_win_ansi(text))
        );
    }

    /// Gray text rotated by `angle` degrees
    pub fn watermark(&mut self, x: f32, y: f32, size: f32, angle: f32, text: &str) {
        let (sin, cos) = angle.to_radians().sin_cos();
        let _ = writeln!(
            self.ops,
            "q 0.85 g BT /{} {} Tf {:.4} {:.4} {:.4} {:.4} {:.2} {:.2} Tm ({}) Tj ET Q",
            Font::Bold.resource_name(),
            size,
            cos,
            sin,
            -sin,
            cos,
            x,
            y,
            escape_literal(&to_win_ansi(text))
        );
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let _ = writeln!(self.ops, "0.5 w {:.2} {:.2} m {:.2} {:.2} l S", x1, y1, x2, y2);
    }

    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let _ = writeln!(self.ops, "0.5 w {:.2} {:.2} {:.2} {:.2} re S", x, y, width, height);
    }

    /// Draw a form XObject scaled and translated into place
    pub fn form(&mut self, name: &str, scale: f32, x: f32, y: f32) {
        let _ = writeln!(
            self.ops,
            "q {:.4} 0 0 {:.4} {:.2} {:.2} cm /{} Do Q",
            scale, scale, x, y, name
        );
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.ops.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transliterates_cyrillic() {
        assert_eq!(to_win_ansi("Шаблон"), b"Shablon".to_vec());
        assert_eq!(to_win_ansi("ШАБЛОН"), b"SHABLON".to_vec());
        assert_eq!(to_win_ansi("Қолтаңба №1"), b"Qoltanba No1".to_vec());
    }

    #[test]
    fn test_latin1_passes_through() {
        assert_eq!(to_win_ansi("café"), vec![b'c', b'a', b'f', 0xe9]);
        assert_eq!(to_win_ansi("日"), b"?".to_vec());
    }

    #[test]
    fn test_escape_literal() {
        assert_eq!(escape_literal(b"a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(escape_literal(&[0xe9]), "\\351");
    }

    #[test]
    fn test_wrap_respects_width_and_newlines() {
        let lines = wrap("one two three\nfour", Font::Regular, 10.0, 54.0);
        assert_eq!(lines, vec!["one two", "three", "four"]);

        let long = wrap("abcdefghijklmnop", Font::Regular, 10.0, 28.0);
        assert_eq!(long, vec!["abcde", "fghij", "klmno", "p"]);
    }
}
