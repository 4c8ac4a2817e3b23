pub mod config;
pub mod error;
pub mod logger;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod utils;

pub use config::{ClientConfig, ServerConfig};
pub use error::{DescriptionSide, EngineStage, NegotiationError};
pub use peer::{
    CandidateQueue, ChannelSink, ConnectionStateMonitor, ConnectivityState, EngineEvent,
    EngineFactory, EventSink, GatheringState, IceCandidate, MediaEngine, MediaKind, MediaTrack,
    RawIceState, SdpType, SessionDescription, SessionNegotiator, SessionNotification, SessionRole,
    WebRtcEngine,
};
pub use session::Session;
