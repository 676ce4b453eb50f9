use crate::peer::types::ServerConfig;
use rand::Rng;

pub fn random_id() -> String {
    hex::encode(rand::rng().random::<[u8; 8]>())
}

/// Prepends the protocol scheme to an ICE server URL when it is missing.
pub fn add_ice_url_scheme(config: &ServerConfig) -> String {
    // Already qualified — return as is.
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
    fn scheme_added_by_server_type() {
        let stun = ServerConfig {
            id: "s".into(),
            r#type: "stun".into(),
            url: "stun.example.com:3478".into(),
            username: None,
            credential: None,
        };
        assert_eq!(add_ice_url_scheme(&stun), "stun:stun.example.com:3478");

        let turn = ServerConfig {
            id: "t".into(),
            r#type: "turn".into(),
            url: "relay.example.com:443".into(),
            username: Some("u".into()),
            credential: Some("p".into()),
        };
        assert_eq!(add_ice_url_scheme(&turn), "turn:relay.example.com:443");
    }

    #[test]
    fn qualified_url_untouched() {
        let cfg = ServerConfig {
            id: "s".into(),
            r#type: "stun".into(),
            url: "stun:stun.l.google.com:19302".into(),
            username: None,
            credential: None,
        };
        assert_eq!(add_ice_url_scheme(&cfg), "stun:stun.l.google.com:19302");
    }
}
