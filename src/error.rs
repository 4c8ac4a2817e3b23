use crate::peer::types::SessionRole;
use std::fmt;
use thiserror::Error;

/// Шаг переговоров, на котором движок вернул ошибку
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStage {
    CreateOffer,
    CreateAnswer,
    SetLocalDescription,
    SetRemoteDescription,
    AddIceCandidate,
}

impl fmt::Display for EngineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateOffer => write!(f, "create offer"),
            Self::CreateAnswer => write!(f, "create answer"),
            Self::SetLocalDescription => write!(f, "set local description"),
            Self::SetRemoteDescription => write!(f, "set remote description"),
            Self::AddIceCandidate => write!(f, "add ice candidate"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionSide {
    Local,
    Remote,
}

impl fmt::Display for DescriptionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    #[error("cannot {operation} while acting as {role}")]
    InvalidRole {
        operation: &'static str,
        role: SessionRole,
    },

    #[error("{0} description already set, renegotiation is not supported")]
    DescriptionAlreadySet(DescriptionSide),

    #[error("media engine rejected {stage}: {reason}")]
    EngineRejection { stage: EngineStage, reason: String },

    #[error("session {0} is closed")]
    SessionClosed(String),

    #[error("media engine setup failed: {0}")]
    Setup(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, NegotiationError>;
