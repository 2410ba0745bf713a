//! Async bridge client: one session per call.
//!
//! `publish` and `request` are the collaborator contract; the robot
//! operations (`drive`, `read_odometry`, ...) bind them to the configured
//! channels. Independent calls share nothing but the config.

use tracing::debug;

use mbridge_core::error::{BridgeError, Result};
use mbridge_core::msgs::{LidarScan, Pose2D, Twist2D};
use mbridge_core::protocol::payload::{decode_text, decode_text_list, PayloadRecord};

use crate::config::ClientConfig;
use crate::session::{Publisher, Reader, Role, Session};
use crate::transport::{Transport, WsTransport};

/// Result of a read. Check `success` before trusting `record`: on failure it
/// holds the zero value.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome<T> {
    pub record: T,
    pub success: bool,
    /// Why the read failed, when it did.
    pub error: Option<BridgeError>,
}

impl<T> ReadOutcome<T> {
    /// The record, only if the read succeeded.
    pub fn ok(self) -> Option<T> {
        if self.success {
            Some(self.record)
        } else {
            None
        }
    }
}

pub struct BridgeClient<T = WsTransport> {
    cfg: ClientConfig,
    transport: T,
}

impl BridgeClient<WsTransport> {
    pub fn new(cfg: ClientConfig) -> Result<Self> {
        Self::with_transport(cfg, WsTransport::new())
    }
}

impl<T: Transport> BridgeClient<T> {
    pub fn with_transport(cfg: ClientConfig, transport: T) -> Result<Self> {
        cfg.validate()?;
        Ok(Self { cfg, transport })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.cfg
    }

    /// Publish `record` on `channel`. `Ok(false)` means the bridge could not
    /// be reached or the send failed.
    pub async fn publish<R: PayloadRecord>(
        &self,
        channel: &str,
        dtype: &str,
        record: &R,
    ) -> Result<bool> {
        let mut session = self.session(Publisher::new(channel, dtype, record));
        self.drive_session(&mut session).await?;
        debug!(channel, success = session.success(), "publish finished");
        Ok(session.success())
    }

    /// Read the latest record on `channel`.
    pub async fn request<R: PayloadRecord>(&self, channel: &str) -> Result<ReadOutcome<R>> {
        self.read(Reader::for_record(channel)).await
    }

    /// Read a channel whose payload is plain text.
    pub async fn request_text(&self, channel: &str) -> Result<ReadOutcome<String>> {
        self.read(Reader::new(channel, decode_text)).await
    }

    // ---- robot operations

    pub async fn drive(&self, vx: f32, vy: f32, wz: f32) -> Result<bool> {
        let ch = &self.cfg.channels.velocity_cmd;
        self.publish(&ch.channel, &ch.dtype, &Twist2D { vx, vy, wz })
            .await
    }

    pub async fn stop(&self) -> Result<bool> {
        self.drive(0.0, 0.0, 0.0).await
    }

    pub async fn reset_odometry(&self) -> Result<bool> {
        let ch = &self.cfg.channels.odometry_reset;
        self.publish(&ch.channel, &ch.dtype, &Pose2D::default()).await
    }

    pub async fn read_odometry(&self) -> Result<Option<Pose2D>> {
        Ok(self.request(&self.cfg.channels.odometry).await?.ok())
    }

    pub async fn read_slam_pose(&self) -> Result<Option<Pose2D>> {
        Ok(self.request(&self.cfg.channels.slam_pose).await?.ok())
    }

    pub async fn read_lidar_scan(&self) -> Result<Option<LidarScan>> {
        Ok(self.request(&self.cfg.channels.lidar).await?.ok())
    }

    pub async fn read_hostname(&self) -> Result<Option<String>> {
        Ok(self.request_text(&self.cfg.channels.hostname).await?.ok())
    }

    /// Channels the bridge currently serves.
    pub async fn read_channels(&self) -> Result<Option<Vec<String>>> {
        let reader = Reader::new(self.cfg.channels.channel_list.as_str(), decode_text_list);
        Ok(self.read(reader).await?.ok())
    }

    // ---- internals

    async fn read<D: Default>(&self, reader: Reader<D>) -> Result<ReadOutcome<D>> {
        let mut session = self.session(reader);
        self.drive_session(&mut session).await?;

        let success = session.success();
        let error = session.failure().cloned();
        Ok(ReadOutcome {
            record: session.into_role().into_record(),
            success,
            error,
        })
    }

    fn session<R: Role>(&self, role: R) -> Session<R> {
        Session::new(self.cfg.bridge.uri(), role).with_close_timeout(self.cfg.bridge.close_timeout())
    }

    async fn drive_session<R: Role>(&self, session: &mut Session<R>) -> Result<()> {
        let Some(limit) = self.cfg.bridge.timeout() else {
            return session.run(&self.transport).await;
        };

        let res = tokio::time::timeout(limit, session.run(&self.transport)).await;
        match res {
            Ok(res) => res,
            Err(_) => {
                // Dropping the run future dropped the connection. A session
                // already closing keeps its outcome.
                session.abort(BridgeError::Transport(format!(
                    "operation timed out after {} ms",
                    limit.as_millis()
                )));
                Ok(())
            }
        }
    }
}
