pub mod analyzer;
pub mod dedup;
pub mod position;

pub use analyzer::{NormalizingAnalyzer, TextAnalyzer, Token};
pub use dedup::dedup_tokens;
pub use position::{PayloadEncoderKind, PositionCodec, decode_position, encode_position};
