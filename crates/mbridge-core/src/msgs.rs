//! Domain records carried in bridge payloads.

/// Planar pose (odometry or SLAM estimate).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pose2D {
    pub x: f32,
    pub y: f32,
    pub theta: f32,
    /// Timestamp in microseconds, when the bridge reports one.
    pub utime: Option<i64>,
}

/// Planar velocity command.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Twist2D {
    pub vx: f32,
    pub vy: f32,
    pub wz: f32,
}

/// One lidar sweep. `ranges[i]` was measured at bearing `thetas[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LidarScan {
    pub ranges: Vec<f32>,
    pub thetas: Vec<f32>,
}

impl LidarScan {
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
