#![warn(missing_docs)]

//! PinVault reduction subsystem: Zstd codec and compression policy
//!
//! Upload path: Data → Stage A (content-type gate) → Stage B (trial compress, ratio gate) → Payload
//! Read path:   Payload → Decompress (only when the descriptor says so) → Data

pub mod compression;
pub mod error;
pub mod policy;

pub use compression::{Codec, CompressionOutcome, ZstdCodec};
pub use error::CodecError;
pub use policy::{normalize_content_type, CompressionPolicy, PolicyConfig};
