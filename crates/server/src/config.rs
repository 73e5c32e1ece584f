use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::{fs, path::Path, time::Duration};
use tracing::warn;

/// Where the relay looks for its configuration when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/hagall.toml";

/// Runtime settings of the relay server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub listen_addr: SocketAddr,
    /// Frames per second; coalesced updates are released once per frame.
    pub frame_rate: u32,
    /// Capacity of each session's scheduler queue.
    pub queue_capacity: usize,
    /// Capacity of each session's outbound queue.
    pub outbound_capacity: usize,
    /// Largest accepted WebSocket frame, in bytes.
    pub max_frame_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
            frame_rate: 60,
            queue_capacity: hagall_net::DEFAULT_QUEUE_CAPACITY,
            outbound_capacity: 256,
            max_frame_size: 1 << 20,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        let cfg = match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ServerConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    ServerConfig::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!("Server config not found at {}. Using defaults", path.display());
                ServerConfig::default()
            }
            Err(err) => {
                warn!("Failed to read {}: {err}. Using defaults", path.display());
                ServerConfig::default()
            }
        };
        cfg.sanitized()
    }

    /// Save configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }

    /// Replace values the server cannot run with by their defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = ServerConfig::default();
        if self.frame_rate == 0 {
            warn!(default = defaults.frame_rate, "frame_rate must be positive");
            self.frame_rate = defaults.frame_rate;
        }
        if self.queue_capacity == 0 {
            warn!(default = defaults.queue_capacity, "queue_capacity must be positive");
            self.queue_capacity = defaults.queue_capacity;
        }
        if self.outbound_capacity == 0 {
            warn!(
                default = defaults.outbound_capacity,
                "outbound_capacity must be positive"
            );
            self.outbound_capacity = defaults.outbound_capacity;
        }
        self
    }

    /// Time between two frames.
    pub fn frame_duration(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.frame_rate.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_path(name: &str) -> std::path::PathBuf {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir()
            .join(format!("hagall_config_{timestamp}"))
            .join(name)
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = ServerConfig::load_from_path(&scratch_path("absent.toml"));
        assert_eq!(cfg, ServerConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = scratch_path("partial.toml");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "frame_rate = 30\nlisten_addr = \"0.0.0.0:9000\"\n").unwrap();

        let cfg = ServerConfig::load_from_path(&path);
        assert_eq!(cfg.frame_rate, 30);
        assert_eq!(cfg.listen_addr, "0.0.0.0:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.queue_capacity, 256);
        assert_eq!(cfg.max_frame_size, 1 << 20);
    }

    #[test]
    fn invalid_file_yields_defaults() {
        let path = scratch_path("invalid.toml");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "frame_rate = \"fast\"").unwrap();

        assert_eq!(ServerConfig::load_from_path(&path), ServerConfig::default());
    }

    #[test]
    fn zero_values_are_replaced() {
        let cfg = ServerConfig {
            frame_rate: 0,
            queue_capacity: 0,
            outbound_capacity: 0,
            ..ServerConfig::default()
        }
        .sanitized();
        assert_eq!(cfg, ServerConfig::default());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let path = scratch_path("nested/saved.toml");
        let cfg = ServerConfig {
            frame_rate: 20,
            queue_capacity: 8,
            ..ServerConfig::default()
        };
        cfg.save_to_path(&path).unwrap();

        assert_eq!(ServerConfig::load_from_path(&path), cfg);
    }

    #[test]
    fn frame_duration_follows_rate() {
        let cfg = ServerConfig {
            frame_rate: 50,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.frame_duration(), Duration::from_millis(20));
    }
}
