//! mbridge demo client.
//!
//! Stops the motors, reads odometry, SLAM pose and one lidar scan, then resets
//! odometry. Config comes from `$MBRIDGE_CONFIG` (default `mbridge.yaml`) when
//! the file exists, otherwise defaults (`ws://localhost:5005`).

use std::path::Path;

use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use mbridge_client::{config, Robot};

fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::var("MBRIDGE_CONFIG").unwrap_or_else(|_| "mbridge.yaml".into());
    let cfg = if Path::new(&path).exists() {
        config::load_from_file(&path).expect("config load failed")
    } else {
        config::ClientConfig::default()
    };

    info!(uri = %cfg.bridge.uri(), "mbridge client starting");
    let robot = Robot::from_config(cfg).expect("client init failed");

    match robot.stop() {
        Ok(sent) => info!(sent, "stop command"),
        Err(e) => warn!(error = %e, "stop command failed"),
    }

    match robot.read_odometry() {
        Ok(Some(p)) => info!(x = p.x, y = p.y, theta = p.theta, "odometry"),
        Ok(None) => warn!("odometry unavailable"),
        Err(e) => warn!(error = %e, "odometry read failed"),
    }

    match robot.read_slam_pose() {
        Ok(Some(p)) => info!(x = p.x, y = p.y, theta = p.theta, "slam pose"),
        Ok(None) => warn!("slam pose unavailable"),
        Err(e) => warn!(error = %e, "slam pose read failed"),
    }

    match robot.read_lidar_scan() {
        Ok(Some(scan)) => info!(points = scan.len(), "lidar scan"),
        Ok(None) => warn!("lidar scan unavailable"),
        Err(e) => warn!(error = %e, "lidar read failed"),
    }

    match robot.read_channels() {
        Ok(Some(channels)) => info!(?channels, "bridge channels"),
        Ok(None) => warn!("channel list unavailable"),
        Err(e) => warn!(error = %e, "channel list read failed"),
    }

    match robot.reset_odometry() {
        Ok(sent) => info!(sent, "odometry reset"),
        Err(e) => warn!(error = %e, "odometry reset failed"),
    }
}
