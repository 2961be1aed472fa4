//! 仿真参数
//!
//! 缺省值与经典教学程序一致：各类故障概率 0.1、最大延迟 0.5s、超时 1s、窗口 4、10 个包。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sim::SimTime;

/// 窗口上限；SR 的序号空间为 2 × 窗口。
pub const MAX_WINDOW_SIZE: usize = 1 << 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// 丢包概率
    pub prob_loss: f64,
    /// 损坏概率（只对未丢失的包采样）
    pub prob_corruption: f64,
    /// 延迟概率
    pub prob_delay: f64,
    /// 延迟上限（秒），延迟在 [0, max_delay] 内均匀采样
    pub max_delay_secs: f64,
    /// 重传超时（秒）
    pub timeout_secs: f64,
    pub window_size: usize,
    pub total_packets: usize,
    /// 信道随机数种子
    pub seed: u64,
    /// 单次运行的逻辑时间上限（秒）
    pub deadline_secs: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            prob_loss: 0.1,
            prob_corruption: 0.1,
            prob_delay: 0.1,
            max_delay_secs: 0.5,
            timeout_secs: 1.0,
            window_size: 4,
            total_packets: 10,
            seed: 0,
            deadline_secs: 3600.0,
        }
    }
}

impl SimConfig {
    /// 关闭全部信道故障的配置（其余参数取缺省值）。
    pub fn lossless() -> Self {
        Self {
            prob_loss: 0.0,
            prob_corruption: 0.0,
            prob_delay: 0.0,
            ..Self::default()
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("prob_loss", self.prob_loss),
            ("prob_corruption", self.prob_corruption),
            ("prob_delay", self.prob_delay),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Probability { field, value });
            }
        }
        for (field, value) in [
            ("max_delay_secs", self.max_delay_secs),
            ("timeout_secs", self.timeout_secs),
            ("deadline_secs", self.deadline_secs),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        if !(1..=MAX_WINDOW_SIZE).contains(&self.window_size) {
            return Err(ConfigError::WindowSize {
                value: self.window_size,
                max: MAX_WINDOW_SIZE,
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> SimTime {
        SimTime::from_secs_f64(self.timeout_secs)
    }

    pub fn max_delay(&self) -> SimTime {
        SimTime::from_secs_f64(self.max_delay_secs)
    }

    pub fn deadline(&self) -> SimTime {
        SimTime::from_secs_f64(self.deadline_secs)
    }

    /// 应用层载荷：`DATA_0 .. DATA_{n-1}`。
    pub fn payloads(&self) -> Vec<String> {
        (0..self.total_packets).map(|i| format!("DATA_{i}")).collect()
    }
}
