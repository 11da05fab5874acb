use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::SearchError;

/// Byte encoding used to turn the query text into the needle.
///
/// File contents are never decoded; the needle is compared against raw bytes,
/// so searching a UTF-16 file for text needs `Utf16Le`/`Utf16Be` here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueryEncoding {
    /// 7-bit ASCII; other characters become `?`
    #[default]
    #[serde(rename = "ascii", alias = "us-ascii")]
    Ascii,
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "utf-16le", alias = "utf16le")]
    Utf16Le,
    #[serde(rename = "utf-16be", alias = "utf16be")]
    Utf16Be,
    /// ISO-8859-1; characters above U+00FF become `?`
    #[serde(rename = "latin1", alias = "iso-8859-1")]
    Latin1,
}

const REPLACEMENT: u8 = b'?';

impl QueryEncoding {
    /// Encodes `text` into the byte sequence searched for in files
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Self::Ascii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { REPLACEMENT })
                .collect(),
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Self::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Self::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(REPLACEMENT))
                .collect(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::Utf8 => "utf-8",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
            Self::Latin1 => "latin1",
        }
    }
}

impl fmt::Display for QueryEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QueryEncoding {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ascii" | "us-ascii" => Ok(Self::Ascii),
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "utf-16le" | "utf16le" | "utf-16" | "unicode" => Ok(Self::Utf16Le),
            "utf-16be" | "utf16be" => Ok(Self::Utf16Be),
            "latin1" | "iso-8859-1" => Ok(Self::Latin1),
            other => Err(SearchError::invalid_encoding(other)),
        }
    }
}
