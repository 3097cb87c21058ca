//! Line-ending normalization for clipboard text

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ClipError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// Leave text untouched
    #[default]
    Keep,
    /// Unix: every `\r\n` and lone `\r` becomes `\n`
    Lf,
    /// Windows: every lone `\r` or `\n` becomes `\r\n`
    Crlf,
}

impl LineEnding {
    pub fn convert(self, text: &str) -> String {
        match self {
            LineEnding::Keep => text.to_string(),
            LineEnding::Lf => text.replace("\r\n", "\n").replace('\r', "\n"),
            LineEnding::Crlf => to_crlf(text),
        }
    }
}

fn to_crlf(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 16);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\r\n");
            }
            '\n' => out.push_str("\r\n"),
            c => out.push(c),
        }
    }
    out
}

impl FromStr for LineEnding {
    type Err = ClipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "keep" | "none" => Ok(LineEnding::Keep),
            "lf" => Ok(LineEnding::Lf),
            "crlf" => Ok(LineEnding::Crlf),
            other => Err(ClipError::Config(format!(
                "unknown line ending {other:?} (expected lf or crlf)"
            ))),
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LineEnding::Keep => "keep",
            LineEnding::Lf => "lf",
            LineEnding::Crlf => "crlf",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_lf() {
        assert_eq!(LineEnding::Lf.convert("a\r\nb\rc\nd"), "a\nb\nc\nd");
    }

    #[test]
    fn test_to_crlf() {
        assert_eq!(LineEnding::Crlf.convert("a\nb\r\nc\rd\r"), "a\r\nb\r\nc\r\nd\r\n");
        assert_eq!(LineEnding::Crlf.convert("\n\n"), "\r\n\r\n");
    }

    #[test]
    fn test_keep_is_identity() {
        let text = "mixed\r\nendings\n\r";
        assert_eq!(LineEnding::Keep.convert(text), text);
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("CRLF".parse::<LineEnding>().unwrap(), LineEnding::Crlf);
        assert_eq!("".parse::<LineEnding>().unwrap(), LineEnding::Keep);
        assert!("cr".parse::<LineEnding>().is_err());
    }
}
