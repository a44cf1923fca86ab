//! Word-position payload codec.
//!
//! At indexing time every token gets its running word position appended to
//! its text behind a delimiter character; a later pass splits the text back
//! apart and turns the suffix into a per-occurrence payload. The payload
//! wire format for positions is exactly 4 bytes, IEEE-754 single-precision,
//! big-endian, so the decode side recovers the float unchanged.

use crate::analysis::analyzer::Token;
use anyhow::{Result, bail, ensure};

/// Delimiter used between a token and its appended position.
pub const DEFAULT_DELIMITER: char = '|';

/// How the text after the delimiter becomes payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoderKind {
    /// 4-byte IEEE-754 single-precision float (the position chain).
    Float,
    /// 4-byte big-endian signed integer.
    Integer,
    /// Raw UTF-8 bytes, unchanged.
    Identity,
}

impl PayloadEncoderKind {
    /// Resolve a configured encoder name. The encoder is mandatory: a
    /// missing or unknown name is a configuration error.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "float" => Ok(PayloadEncoderKind::Float),
            "integer" => Ok(PayloadEncoderKind::Integer),
            "identity" => Ok(PayloadEncoderKind::Identity),
            other => bail!("unknown payload encoder: {other:?}"),
        }
    }

    /// Encode the delimited suffix of a token into payload bytes.
    pub fn encode(&self, value: &str) -> Result<Vec<u8>> {
        match self {
            PayloadEncoderKind::Float => Ok(value.parse::<f32>()?.to_be_bytes().to_vec()),
            PayloadEncoderKind::Integer => Ok(value.parse::<i32>()?.to_be_bytes().to_vec()),
            PayloadEncoderKind::Identity => Ok(value.as_bytes().to_vec()),
        }
    }
}

/// Encode a word position into its 4-byte payload form.
pub fn encode_position(position: f32) -> [u8; 4] {
    position.to_be_bytes()
}

/// Recover a word position from a payload. Returns `None` unless the
/// payload is exactly 4 bytes.
pub fn decode_position(payload: &[u8]) -> Option<f32> {
    let bytes: [u8; 4] = payload.try_into().ok()?;
    Some(f32::from_be_bytes(bytes))
}

/// Appends running word positions to tokens and splits them back out as
/// payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionCodec {
    delimiter: char,
    encoder: PayloadEncoderKind,
}

impl Default for PositionCodec {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            encoder: PayloadEncoderKind::Float,
        }
    }
}

impl PositionCodec {
    pub fn new(delimiter: char, encoder: PayloadEncoderKind) -> Self {
        Self { delimiter, encoder }
    }

    /// Build a codec from configured strings, failing fast on a missing
    /// encoder or a delimiter that is not exactly one character.
    pub fn from_config(delimiter: &str, encoder: Option<&str>) -> Result<Self> {
        let mut chars = delimiter.chars();
        let (first, rest) = (chars.next(), chars.next());
        ensure!(
            first.is_some() && rest.is_none(),
            "delimiter must be one character only, got {delimiter:?}"
        );
        let Some(encoder) = encoder else {
            bail!("payload encoder is mandatory");
        };
        Ok(Self {
            delimiter: first.unwrap_or(DEFAULT_DELIMITER),
            encoder: PayloadEncoderKind::from_name(encoder)?,
        })
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Append `delimiter + running position` to every token.
    ///
    /// The counter starts at zero per call and advances by each token's
    /// position increment, so blanked duplicates still consume a position.
    /// Any delimiter already present in the token text is stripped first so
    /// the split in [`extract`](Self::extract) is unambiguous.
    pub fn annotate(&self, tokens: &mut [Token]) {
        let mut position = 0f32;
        for token in tokens.iter_mut() {
            position += token.position_increment as f32;
            if token.text.contains(self.delimiter) {
                token.text = token.text.replace(self.delimiter, "");
            }
            token.text.push(self.delimiter);
            token.text.push_str(&position.to_string());
        }
    }

    /// Split annotated token text into `(term, payload)`. Text without the
    /// delimiter passes through with no payload.
    pub fn extract(&self, text: &str) -> Result<(String, Option<Vec<u8>>)> {
        match text.find(self.delimiter) {
            Some(at) => {
                let term = text[..at].to_string();
                let payload = self
                    .encoder
                    .encode(&text[at + self.delimiter.len_utf8()..])?;
                Ok((term, Some(payload)))
            }
            None => Ok((text.to_string(), None)),
        }
    }
}
