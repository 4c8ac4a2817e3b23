pub mod connection;
pub mod engine;
pub mod events;
pub mod ice;
pub mod negotiator;
pub mod state;
pub mod types;

pub use connection::ConnectionStateMonitor;
pub use engine::{EngineEvent, EngineFactory, MediaEngine, WebRtcEngine};
pub use events::{ChannelSink, EventSink, SessionNotification};
pub use ice::CandidateQueue;
pub use negotiator::SessionNegotiator;
pub use state::{DescriptionSlot, NegotiationState};
pub use types::{
    ConnectivityState, GatheringState, IceCandidate, MediaKind, MediaTrack, RawIceState, SdpType,
    SessionDescription, SessionRole,
};
