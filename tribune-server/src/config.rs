use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tribune_core::IceServerConfig;

/// One day; longer turns are a misconfiguration.
const MAX_TURN_SECS: u64 = 24 * 60 * 60;

#[derive(Parser, Debug, Clone)]
#[command(name = "tribune-server", about = "Live debate room coordinator")]
pub struct ServerConfig {
    #[arg(long, env = "TRIBUNE_BIND", default_value = "0.0.0.0:4000")]
    pub bind: SocketAddr,

    /// Messages retained per room.
    #[arg(long, env = "TRIBUNE_HISTORY_CAPACITY", default_value_t = 500)]
    pub history_capacity: usize,

    /// Length of one speaking turn in turn-based rooms.
    #[arg(
        long,
        env = "TRIBUNE_TURN_SECS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TURN_SECS)
    )]
    pub turn_secs: u64,

    /// How long an empty room survives to absorb reconnects.
    #[arg(long, env = "TRIBUNE_GRACE_SECS", default_value_t = 10)]
    pub grace_secs: u64,

    #[arg(long, env = "TRIBUNE_MAX_MESSAGE_LEN", default_value_t = 4000)]
    pub max_message_len: usize,

    /// JSON array of debate records used to seed the in-memory directory.
    #[arg(long, env = "TRIBUNE_DEBATES_FILE")]
    pub debates_file: Option<PathBuf>,

    #[arg(long, env = "STUN_URL", default_value = "stun:stun.l.google.com:19302")]
    pub stun_url: String,

    #[arg(long, env = "TURN_URL")]
    pub turn_url: Option<String>,

    #[arg(long, env = "TURN_USERNAME")]
    pub turn_username: Option<String>,

    #[arg(long, env = "TURN_CREDENTIAL")]
    pub turn_credential: Option<String>,

    #[arg(long, env = "TRIBUNE_LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

impl ServerConfig {
    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            history_capacity: self.history_capacity,
            turn_duration: Duration::from_secs(self.turn_secs),
            grace_period: Duration::from_secs(self.grace_secs),
            max_message_len: self.max_message_len,
        }
    }

    pub fn ice_servers(&self) -> Vec<IceServerConfig> {
        let mut servers = vec![IceServerConfig {
            urls: vec![self.stun_url.clone()],
            username: None,
            credential: None,
        }];

        if let Some(turn_url) = &self.turn_url {
            servers.push(IceServerConfig {
                urls: vec![turn_url.clone()],
                username: self.turn_username.clone(),
                credential: self.turn_credential.clone(),
            });
        }

        servers
    }
}

/// Per-room tunables shared by every room actor.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub history_capacity: usize,
    pub turn_duration: Duration,
    pub grace_period: Duration,
    pub max_message_len: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            history_capacity: 500,
            turn_duration: Duration::from_secs(60),
            grace_period: Duration::from_secs(10),
            max_message_len: 4000,
        }
    }
}
