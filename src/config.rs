// Конфигурация клиента
// Уровень логирования по умолчанию зависит от режима сборки

use crate::error::{NegotiationError, Result};
use crate::peer::types::MediaTrack;
use serde::{Deserialize, Serialize};

#[cfg(debug_assertions)]
pub const DEFAULT_LOG_FILTER: &str = "debug"; // В режиме отладки подробное логирование

#[cfg(not(debug_assertions))]
pub const DEFAULT_LOG_FILTER: &str = "warn"; // В продакшене только предупреждения

pub const DEFAULT_ICE_CANDIDATE_POOL_SIZE: u8 = 10;

/// Конфигурация ICE сервера
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub id: String,
    pub r#type: String, // 'stun' or 'turn'
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

impl ServerConfig {
    pub fn stun(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            r#type: "stun".into(),
            url: url.into(),
            username: None,
            credential: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    pub ice_servers: Vec<ServerConfig>,
    pub audio: bool,
    pub video: bool,
    pub ice_candidate_pool_size: u8,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ice_servers: default_ice_servers(),
            audio: true,
            video: true,
            ice_candidate_pool_size: DEFAULT_ICE_CANDIDATE_POOL_SIZE,
        }
    }
}

pub fn default_ice_servers() -> Vec<ServerConfig> {
    vec![
        ServerConfig::stun("default-stun", "stun:stun.l.google.com:19302"),
        ServerConfig::stun("default-stun-1", "stun:stun1.l.google.com:19302"),
    ]
}

impl ClientConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| NegotiationError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for server in &self.ice_servers {
            if server.url.is_empty() {
                return Err(NegotiationError::InvalidConfig(format!(
                    "server {} has an empty url",
                    server.id
                )));
            }

            if server.r#type == "turn" && (server.username.is_none() || server.credential.is_none()) {
                return Err(NegotiationError::InvalidConfig(format!(
                    "TURN server {} requires username and credential",
                    server.id
                )));
            }
        }
        Ok(())
    }

    /// Треки, добавляемые при создании сессии: сначала видео, потом аудио
    pub fn tracks(&self) -> Vec<MediaTrack> {
        let mut tracks = Vec::new();
        if self.video {
            tracks.push(MediaTrack::video());
        }
        if self.audio {
            tracks.push(MediaTrack::audio());
        }
        tracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::types::MediaKind;

    #[test]
    fn defaults_use_public_stun_servers() {
        let config = ClientConfig::default();
        assert_eq!(config.ice_servers.len(), 2);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.tracks().iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![MediaKind::Video, MediaKind::Audio]
        );
    }

    #[test]
    fn parses_partial_json() {
        let config = ClientConfig::from_json(
            r#"{
                "ice_servers": [
                    {"id": "t", "type": "turn", "url": "turn.example.org:3478", "username": "u", "credential": "p"}
                ],
                "video": false
            }"#,
        )
        .unwrap();
        assert_eq!(config.ice_servers[0].r#type, "turn");
        assert!(config.audio);
        assert_eq!(config.tracks(), vec![MediaTrack::audio()]);
        assert_eq!(config.ice_candidate_pool_size, DEFAULT_ICE_CANDIDATE_POOL_SIZE);
    }

    #[test]
    fn turn_without_credentials_is_rejected() {
        let err = ClientConfig::from_json(
            r#"{"ice_servers": [{"id": "t", "type": "turn", "url": "turn:relay"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, NegotiationError::InvalidConfig(_)));
    }

    #[test]
    fn malformed_json_is_invalid_config() {
        assert!(matches!(
            ClientConfig::from_json("{"),
            Err(NegotiationError::InvalidConfig(_))
        ));
    }
}
