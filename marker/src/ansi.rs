//! ANSI escape sequences to inline-styled HTML.
//!
//! Kernel tracebacks are colourised with SGR escapes. They are rendered as `<span style=...>`
//! runs with every piece of text HTML-escaped, so nothing from a student's output can inject
//! markup into the report. Non-SGR control sequences (cursor movement etc.) are dropped.

use regex::Regex;
use std::sync::LazyLock;

static CSI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[([0-9;?]*)([A-Za-z])").expect("valid CSI pattern"));

const PALETTE: [&str; 16] = [
    "#000316", "#aa0000", "#00aa00", "#aa5500", "#0000aa", "#E850A8", "#00aaaa", "#F5F1DE",
    "#7f7f7f", "#ff0000", "#00ff00", "#ffff00", "#5c5cff", "#ff00ff", "#00ffff", "#ffffff",
];

/// Escapes text for safe inclusion in HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

fn color_256(n: u32) -> String {
    match n {
        0..=15 => PALETTE[n as usize].to_string(),
        16..=231 => {
            let levels = [0u32, 95, 135, 175, 215, 255];
            let i = n - 16;
            format!(
                "#{:02x}{:02x}{:02x}",
                levels[(i / 36) as usize],
                levels[((i / 6) % 6) as usize],
                levels[(i % 6) as usize]
            )
        }
        _ => {
            let v = 8 + 10 * (n.min(255) - 232);
            format!("#{v:02x}{v:02x}{v:02x}")
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Style {
    bold: bool,
    italic: bool,
    underline: bool,
    fg: Option<String>,
    bg: Option<String>,
}

impl Style {
    fn css(&self) -> String {
        let mut parts = Vec::new();
        if self.bold {
            parts.push("font-weight: bold".to_string());
        }
        if self.italic {
            parts.push("font-style: italic".to_string());
        }
        if self.underline {
            parts.push("text-decoration: underline".to_string());
        }
        if let Some(fg) = &self.fg {
            parts.push(format!("color: {fg}"));
        }
        if let Some(bg) = &self.bg {
            parts.push(format!("background-color: {bg}"));
        }
        parts.join("; ")
    }

    /// Extended colour (`38;5;n` or `38;2;r;g;b`) starting after the 38/48 code.
    fn extended<'a>(codes: &mut impl Iterator<Item = &'a u32>) -> Option<String> {
        match codes.next()? {
            5 => codes.next().map(|n| color_256(*n)),
            2 => {
                let r = *codes.next()?;
                let g = *codes.next()?;
                let b = *codes.next()?;
                Some(format!("#{:02x}{:02x}{:02x}", r.min(255), g.min(255), b.min(255)))
            }
            _ => None,
        }
    }

    fn apply(&mut self, params: &str) {
        let codes: Vec<u32> = if params.is_empty() {
            vec![0]
        } else {
            params.split(';').map(|p| p.parse().unwrap_or(0)).collect()
        };
        let mut iter = codes.iter();
        while let Some(code) = iter.next() {
            match *code {
                0 => *self = Style::default(),
                1 => self.bold = true,
                3 => self.italic = true,
                4 => self.underline = true,
                22 => self.bold = false,
                23 => self.italic = false,
                24 => self.underline = false,
                c @ 30..=37 => self.fg = Some(PALETTE[(c - 30) as usize].to_string()),
                38 => self.fg = Style::extended(&mut iter),
                39 => self.fg = None,
                c @ 40..=47 => self.bg = Some(PALETTE[(c - 40) as usize].to_string()),
                48 => self.bg = Style::extended(&mut iter),
                49 => self.bg = None,
                c @ 90..=97 => self.fg = Some(PALETTE[(c - 90 + 8) as usize].to_string()),
                c @ 100..=107 => self.bg = Some(PALETTE[(c - 100 + 8) as usize].to_string()),
                _ => {}
            }
        }
    }
}

fn push_run(out: &mut String, style: &Style, text: &str) {
    if text.is_empty() {
        return;
    }
    if *style == Style::default() {
        out.push_str(&escape_html(text));
    } else {
        out.push_str(&format!(
            "<span style=\"{}\">{}</span>",
            style.css(),
            escape_html(text)
        ));
    }
}

/// Converts ANSI-coloured text into an HTML fragment (no surrounding document).
pub fn ansi_to_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut style = Style::default();
    let mut last = 0;

    for caps in CSI.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        push_run(&mut out, &style, &text[last..whole.start()]);
        last = whole.end();
        if &caps[2] == "m" {
            style.apply(&caps[1]);
        }
    }
    push_run(&mut out, &style, &text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_escaped() {
        assert_eq!(
            ansi_to_html("x < 1 && y > \"2\""),
            "x &lt; 1 &amp;&amp; y &gt; &quot;2&quot;"
        );
    }

    #[test]
    fn test_basic_colour_and_reset() {
        let html = ansi_to_html("\x1b[0;31mAssertionError\x1b[0m: boom");
        assert_eq!(
            html,
            "<span style=\"color: #aa0000\">AssertionError</span>: boom"
        );
    }

    #[test]
    fn test_bold_and_bright_combine() {
        let html = ansi_to_html("\x1b[1;92mok\x1b[39m!");
        assert_eq!(
            html,
            "<span style=\"font-weight: bold; color: #00ff00\">ok</span>\
             <span style=\"font-weight: bold\">!</span>"
        );
    }

    #[test]
    fn test_extended_colours() {
        assert_eq!(
            ansi_to_html("\x1b[38;5;196mred\x1b[m"),
            "<span style=\"color: #ff0000\">red</span>"
        );
        assert_eq!(
            ansi_to_html("\x1b[48;2;1;2;3mbg"),
            "<span style=\"background-color: #010203\">bg</span>"
        );
    }

    #[test]
    fn test_non_sgr_sequences_are_dropped() {
        assert_eq!(ansi_to_html("a\x1b[2Kb"), "ab");
    }

    #[test]
    fn test_markup_inside_colour_is_escaped() {
        let html = ansi_to_html("\x1b[31m<script>\x1b[0m");
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }
}
