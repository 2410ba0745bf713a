use std::time::Duration;

use serde::Deserialize;
use mbridge_core::error::{BridgeError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub version: u32,

    #[serde(default)]
    pub bridge: BridgeSection,

    #[serde(default)]
    pub channels: ChannelSection,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: 1,
            bridge: BridgeSection::default(),
            channels: ChannelSection::default(),
        }
    }
}

impl ClientConfig {
    /// Default config pointed at `host:port`.
    pub fn with_endpoint(host: impl Into<String>, port: u16) -> Self {
        let mut cfg = Self::default();
        cfg.bridge.host = host.into();
        cfg.bridge.port = port;
        cfg
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(BridgeError::UnsupportedVersion);
        }

        self.bridge.validate()?;
        self.channels.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeSection {
    #[serde(default = "default_scheme")]
    pub scheme: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-operation deadline. Unset means an operation may wait forever.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Wait for the peer to acknowledge our close frame.
    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            host: default_host(),
            port: default_port(),
            timeout_ms: None,
            close_timeout_ms: default_close_timeout_ms(),
        }
    }
}

impl BridgeSection {
    pub fn validate(&self) -> Result<()> {
        if self.scheme != "ws" {
            return Err(BridgeError::BadConfig(format!(
                "bridge.scheme must be \"ws\", got {:?}",
                self.scheme
            )));
        }
        if self.host.is_empty() || self.host.contains(['/', ' ']) {
            return Err(BridgeError::BadConfig(format!(
                "bridge.host is not a valid host: {:?}",
                self.host
            )));
        }
        if self.port == 0 {
            return Err(BridgeError::BadConfig("bridge.port must be non-zero".into()));
        }
        if let Some(ms) = self.timeout_ms {
            if !(1..=600000).contains(&ms) {
                return Err(BridgeError::BadConfig(
                    "bridge.timeout_ms must be between 1 and 600000".into(),
                ));
            }
        }
        if !(1..=600000).contains(&self.close_timeout_ms) {
            return Err(BridgeError::BadConfig(
                "bridge.close_timeout_ms must be between 1 and 600000".into(),
            ));
        }
        Ok(())
    }

    /// `scheme://host:port`
    pub fn uri(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

fn default_scheme() -> String {
    "ws".into()
}
fn default_host() -> String {
    "localhost".into()
}
fn default_port() -> u16 {
    5005
}
fn default_close_timeout_ms() -> u64 {
    5000
}

/// Channel bound to a publish type name.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishChannel {
    pub channel: String,
    pub dtype: String,
}

impl PublishChannel {
    fn new(channel: &str, dtype: &str) -> Self {
        Self {
            channel: channel.into(),
            dtype: dtype.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelSection {
    #[serde(default = "default_odometry")]
    pub odometry: String,

    #[serde(default = "default_slam_pose")]
    pub slam_pose: String,

    #[serde(default = "default_lidar")]
    pub lidar: String,

    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Bridge channel answering with the list of channels it serves.
    #[serde(default = "default_channel_list")]
    pub channel_list: String,

    #[serde(default = "default_velocity_cmd")]
    pub velocity_cmd: PublishChannel,

    #[serde(default = "default_odometry_reset")]
    pub odometry_reset: PublishChannel,
}

impl Default for ChannelSection {
    fn default() -> Self {
        Self {
            odometry: default_odometry(),
            slam_pose: default_slam_pose(),
            lidar: default_lidar(),
            hostname: default_hostname(),
            channel_list: default_channel_list(),
            velocity_cmd: default_velocity_cmd(),
            odometry_reset: default_odometry_reset(),
        }
    }
}

impl ChannelSection {
    pub fn validate(&self) -> Result<()> {
        let names = [
            ("channels.odometry", &self.odometry),
            ("channels.slam_pose", &self.slam_pose),
            ("channels.lidar", &self.lidar),
            ("channels.hostname", &self.hostname),
            ("channels.channel_list", &self.channel_list),
            ("channels.velocity_cmd.channel", &self.velocity_cmd.channel),
            ("channels.velocity_cmd.dtype", &self.velocity_cmd.dtype),
            ("channels.odometry_reset.channel", &self.odometry_reset.channel),
            ("channels.odometry_reset.dtype", &self.odometry_reset.dtype),
        ];
        for (path, value) in names {
            if value.trim().is_empty() {
                return Err(BridgeError::BadConfig(format!("{path} must not be empty")));
            }
        }
        Ok(())
    }
}

fn default_odometry() -> String {
    "MBOT_ODOMETRY".into()
}
fn default_slam_pose() -> String {
    "SLAM_POSE".into()
}
fn default_lidar() -> String {
    "LIDAR".into()
}
fn default_hostname() -> String {
    "HOSTNAME".into()
}
fn default_channel_list() -> String {
    "CHANNELS".into()
}
fn default_velocity_cmd() -> PublishChannel {
    PublishChannel::new("MBOT_VEL_CMD", "twist2D_t")
}
fn default_odometry_reset() -> PublishChannel {
    PublishChannel::new("RESET_ODOMETRY", "pose2D_t")
}
