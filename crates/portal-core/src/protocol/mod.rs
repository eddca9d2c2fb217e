//! Protocol module containing the remote operation vocabulary and the packet codec.

pub mod operations;
pub mod packet;
pub mod sequence;

pub use operations::{Acknowledgement, CallRequest, Operation, PushEvent, RemoteError};
pub use packet::{decode_engine_packet, encode_engine_packet, EnginePacket, ProtocolError, SocketPacket};
pub use sequence::SequenceCounter;
