use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::services::placement::PlacementTable;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub database_url: String,
    pub placement: PlacementTable,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./data/mastery.db?mode=rwc".to_string());

        let placement = std::env::var("PLACEMENT_BANDS")
            .ok()
            .and_then(|raw| PlacementTable::parse(&raw))
            .unwrap_or_default();

        Self {
            host,
            port,
            log_level,
            database_url,
            placement,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
