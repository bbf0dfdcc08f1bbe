//! Feed pagination over an already-fetched candidate set

pub mod paginator;
pub mod proximity;
pub mod snapshot;

pub use paginator::{FeedHandle, FeedPaginator, FeedPhase, FeedSource};
pub use proximity::{
    proximity_channel, ProximityReceiver, ProximitySender, ProximitySignal, DEFAULT_SIGNAL_BUFFER,
};
pub use snapshot::FeedSnapshot;
