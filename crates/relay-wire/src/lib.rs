//! Self-describing variable-length field codec used for every frame the
//! broker exchanges with clients.
//!
//! A frame is a length-prefixed, ordered sequence of opaque byte fields. The
//! same [`Field`] encoding is used both for the field count prefix and for
//! each field's own length, so there is exactly one primitive to get right.

mod error;
mod field;
mod frame;
pub mod protocol;

pub use error::CodecError;
pub use field::{decode_uint, encode_uint};
pub use frame::{Frame, FrameDecoder};

/// Default ceiling on both an individual field's length and the declared
/// field count of a frame. Chosen generously relative to any message this
/// broker expects; exists only to bound a malicious or corrupted length
/// prefix.
pub const MAX_FRAME_FIELD_LEN: u64 = 1 << 20;
