pub mod admission;
pub mod control;
pub mod dedup;
pub mod events;
pub mod framing;
pub mod membership;
pub mod message_store;
pub mod peer;

pub use admission::{route, Route};
pub use control::{control_channel, ControlCommand, ControlReceiver, ControlSender, Reply, SendReceipt};
pub use dedup::{DedupCache, SeenPackets};
pub use events::{NoopEvents, OverlayEvents};
pub use framing::{read_carrier, write_carrier, FrameError};
pub use membership::{AddOutcome, MembershipHandle, MembershipStore, RemoveOutcome, StoreError};
pub use message_store::{MessageStore, ReceivedMessage};
pub use peer::{Peer, PeerId, PeerReader, PeerSummary};
