pub mod value;
pub mod options;
pub mod wire;
pub mod ext;

pub use value::{Value, Pin};
pub use options::{Options, TimestampMode, PinLayout, OptionsError};
pub use wire::{encode_value, decode_value, EncodeError, DecodeError};
pub use ext::{dispatch, ExtCodec, ExtError, ExtensionRegistry, Wrapper};
pub use ext::timestamp::{Timestamp, TimestampError};
