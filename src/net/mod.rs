//! 信道与端点模块
//!
//! 包含数据包、故障模型、不可靠信道、定时器事件，以及把它们组装起来的运行世界。

// 子模块声明
mod api;
mod channel;
mod deliver_packet;
mod endpoint;
mod faults;
mod link;
mod packet;
mod rdt_world;
mod resume_send;
mod stats;
mod timer_fired;

// 重新导出公共接口
pub use api::LinkApi;
pub use channel::Channel;
pub use deliver_packet::DeliverPacket;
pub use endpoint::Endpoint;
pub use faults::{Fate, FaultAction, FaultModel, Lossless, RandomFaults, ScriptedFaults};
pub use link::Link;
pub use packet::{checksum, Packet, PacketKind};
pub use rdt_world::RdtWorld;
pub use resume_send::ResumeSend;
pub use stats::Stats;
pub use timer_fired::TimerFired;
