use crate::config::ServerConfig;
use rand::Rng;

pub fn random_id() -> String {
    hex::encode(rand::rng().random::<[u8; 8]>())
}

// Добавляет схему протокола к URL ICE сервера, если она отсутствует
pub fn add_ice_url_scheme(config: &ServerConfig) -> String {
    if config.url.starts_with("turn:") || config.url.starts_with("stun:") {
        config.url.clone()
    } else {
        let scheme = if config.r#type == "turn" {
            "turn:"
        } else {
            "stun:"
        };
        format!("{}{}", scheme, config.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_id_is_sixteen_hex_chars() {
        let id = random_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, random_id());
    }

    #[test]
    fn keeps_existing_scheme() {
        let server = ServerConfig::stun("s", "stun:stun.example.org:19302");
        assert_eq!(add_ice_url_scheme(&server), "stun:stun.example.org:19302");
    }

    #[test]
    fn adds_scheme_by_type() {
        let mut server = ServerConfig::stun("s", "stun.example.org:19302");
        assert_eq!(add_ice_url_scheme(&server), "stun:stun.example.org:19302");
        server.r#type = "turn".into();
        assert_eq!(add_ice_url_scheme(&server), "turn:stun.example.org:19302");
    }
}
