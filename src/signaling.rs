//! Конверт для передачи описаний и кандидатов через внешний канал
//! (копирование текста, QR и т.п.). Доставка остаётся на приложении.

use crate::peer::types::{IceCandidate, SessionDescription};
use base64::{engine::general_purpose, Engine as _};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use thiserror::Error;

/// Ограничение распакованного размера для защиты от zip-bomb
pub const MAX_DECOMPRESSED_SIZE: u64 = 256 * 1024; // 256 KiB

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("compression failed: {0}")]
    Compression(#[from] std::io::Error),

    #[error("invalid signal payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("signal payload exceeds 256 KiB")]
    TooLarge,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SignalBody {
    Description(SessionDescription),
    Candidate(IceCandidate),
}

/// Полезная нагрузка с метаданными сессии
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignalMessage {
    pub session: String,
    pub ts: i64,
    pub body: SignalBody,
}

impl SignalMessage {
    pub fn description(session: impl Into<String>, desc: SessionDescription) -> Self {
        Self::new(session, SignalBody::Description(desc))
    }

    pub fn candidate(session: impl Into<String>, candidate: IceCandidate) -> Self {
        Self::new(session, SignalBody::Candidate(candidate))
    }

    fn new(session: impl Into<String>, body: SignalBody) -> Self {
        Self {
            session: session.into(),
            ts: chrono::Utc::now().timestamp(),
            body,
        }
    }
}

/// JSON -> gzip -> base64
pub fn encode(message: &SignalMessage) -> Result<String, SignalError> {
    let json = serde_json::to_vec(message)?;

    let mut gz = GzEncoder::new(Vec::new(), Compression::fast());
    gz.write_all(&json)?;
    let compressed = gz.finish()?;

    Ok(general_purpose::STANDARD.encode(compressed))
}

pub fn decode(encoded: &str) -> Result<SignalMessage, SignalError> {
    let compressed = general_purpose::STANDARD.decode(encoded.trim())?;

    let gz = GzDecoder::new(&compressed[..]);
    let mut json = Vec::new();
    gz.take(MAX_DECOMPRESSED_SIZE + 1).read_to_end(&mut json)?;
    if json.len() as u64 > MAX_DECOMPRESSED_SIZE {
        return Err(SignalError::TooLarge);
    }

    Ok(serde_json::from_slice(&json)?)
}
