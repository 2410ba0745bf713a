//! Blocking robot facade.
//!
//! Each call blocks the calling thread for one bridge session on a private
//! current-thread runtime. Use [`BridgeClient`] directly from async code.

use tokio::runtime::{Builder, Runtime};

use mbridge_core::error::{BridgeError, Result};
use mbridge_core::msgs::{LidarScan, Pose2D};
use mbridge_core::protocol::payload::PayloadRecord;

use crate::client::{BridgeClient, ReadOutcome};
use crate::config::ClientConfig;
use crate::transport::WsTransport;

pub struct Robot {
    runtime: Runtime,
    client: BridgeClient<WsTransport>,
}

impl Robot {
    /// Robot reachable at `ws://host:port` with default channels.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::from_config(ClientConfig::with_endpoint(host, port))
    }

    pub fn from_config(cfg: ClientConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BridgeError::Internal(format!("runtime build failed: {e}")))?;
        Ok(Self {
            runtime,
            client: BridgeClient::new(cfg)?,
        })
    }

    pub fn client(&self) -> &BridgeClient<WsTransport> {
        &self.client
    }

    pub fn publish<R: PayloadRecord>(&self, channel: &str, dtype: &str, record: &R) -> Result<bool> {
        self.runtime.block_on(self.client.publish(channel, dtype, record))
    }

    pub fn request<R: PayloadRecord>(&self, channel: &str) -> Result<ReadOutcome<R>> {
        self.runtime.block_on(self.client.request(channel))
    }

    pub fn drive(&self, vx: f32, vy: f32, wz: f32) -> Result<bool> {
        self.runtime.block_on(self.client.drive(vx, vy, wz))
    }

    pub fn stop(&self) -> Result<bool> {
        self.runtime.block_on(self.client.stop())
    }

    pub fn reset_odometry(&self) -> Result<bool> {
        self.runtime.block_on(self.client.reset_odometry())
    }

    pub fn read_odometry(&self) -> Result<Option<Pose2D>> {
        self.runtime.block_on(self.client.read_odometry())
    }

    pub fn read_slam_pose(&self) -> Result<Option<Pose2D>> {
        self.runtime.block_on(self.client.read_slam_pose())
    }

    pub fn read_lidar_scan(&self) -> Result<Option<LidarScan>> {
        self.runtime.block_on(self.client.read_lidar_scan())
    }

    pub fn read_hostname(&self) -> Result<Option<String>> {
        self.runtime.block_on(self.client.read_hostname())
    }

    pub fn read_channels(&self) -> Result<Option<Vec<String>>> {
        self.runtime.block_on(self.client.read_channels())
    }
}
