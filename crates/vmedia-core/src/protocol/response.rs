//! Raw response parsing.
//!
//! `ipmitool raw` prints response bytes as space separated hex pairs,
//! wrapped over several lines for long payloads, e.g. `" 00 01\n"`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    #[error("Empty response")]
    Empty,

    #[error("Invalid hex token {0:?}")]
    InvalidToken(String),

    #[error("Response too short: need {needed} chars, got {actual}")]
    TooShort { needed: usize, actual: usize },
}

/// Output of one transport round-trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    /// Response payload as printed by the transport.
    pub stdout: String,
    /// Diagnostic output, never parsed.
    pub stderr: String,
}

impl RawResponse {
    pub fn new(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Payload with surrounding whitespace removed.
    pub fn text(&self) -> &str {
        self.stdout.trim()
    }

    /// Decode every hex token of the payload.
    pub fn bytes(&self) -> Result<Vec<u8>, ResponseError> {
        let text = self.text();
        if text.is_empty() {
            return Err(ResponseError::Empty);
        }
        text.split_whitespace()
            .map(|tok| {
                let digits = tok.trim_start_matches("0x");
                u8::from_str_radix(digits, 16)
                    .map_err(|_| ResponseError::InvalidToken(tok.to_string()))
            })
            .collect()
    }

    /// First response byte.
    pub fn first_byte(&self) -> Result<u8, ResponseError> {
        self.bytes()?.first().copied().ok_or(ResponseError::Empty)
    }

    /// Parse the characters `range` of the trimmed payload as a hex number.
    ///
    /// The image count of the Falcon firmware lives at characters 3..5,
    /// i.e. the second printed byte.
    pub fn hex_field(&self, range: std::ops::Range<usize>) -> Result<u32, ResponseError> {
        let text = self.text();
        let field = text.get(range.clone()).ok_or(ResponseError::TooShort {
            needed: range.end,
            actual: text.len(),
        })?;
        u32::from_str_radix(field, 16).map_err(|_| ResponseError::InvalidToken(field.to_string()))
    }
}
