pub mod key;
pub mod pdu;

pub use key::StreamKey;
pub use pdu::{CodecError, Reservation, Status, PDU_LEN};
