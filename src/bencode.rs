//! Bencode encoding and decoding (BEP-3)
//!
//! Bencode is the encoding BitTorrent uses for KRPC messages, `.torrent`
//! files, and the extension protocol payloads. Besides the usual
//! [`decode`]/[`encode`] pair, this module exposes [`decode_prefix`], which
//! reports how many bytes the value consumed; the ut_metadata piece reader
//! relies on that to split a frame into its bencoded header and the raw
//! piece bytes that follow it.

mod decode;
mod encode;
mod error;
mod value;

pub use decode::{decode, decode_prefix};
pub use encode::encode;
pub use error::BencodeError;
pub use value::Value;
