//! 仿真驱动
//!
//! 为一次协议运行组装 发送方 + 信道 + 接收方，在 t=0 提交全部载荷，运行到事件队列
//! 耗尽（或到达截止时间），然后核对应用层收到的序列。

use crate::config::SimConfig;
use crate::error::RdtError;
use crate::net::{Channel, FaultModel, Link, LinkApi, RandomFaults, RdtWorld, Stats};
use crate::proto::Protocol;
use crate::sim::{Event, SimTime, Simulator, World};
use crate::trace::{TraceEventKind, TraceLog};
use tracing::{info, warn};

/// 一次成功运行的结果
#[derive(Debug, Clone)]
pub struct RunReport {
    pub protocol: Protocol,
    pub delivered: Vec<String>,
    pub stats: Stats,
    pub trace: TraceLog,
    /// 发送方确认完全部载荷的时刻
    pub finished_at: SimTime,
}

/// 启动事件：应用层一次性提交全部载荷，窗口放不下的在发送方排队。
#[derive(Debug)]
pub struct StartRun {
    pub payloads: Vec<String>,
}

impl Event for StartRun {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let StartRun { payloads } = *self;
        let Some(w) = world.as_any_mut().downcast_mut::<RdtWorld>() else {
            return;
        };
        for payload in payloads {
            w.submit(payload, sim);
        }
    }
}

/// 用配置中的概率与种子构造随机信道并运行。
pub fn run_with_random_faults(protocol: Protocol, cfg: &SimConfig) -> Result<RunReport, RdtError> {
    run_protocol(protocol, cfg, Box::new(RandomFaults::from_config(cfg)))
}

/// 运行一次协议，信道故障由 `faults` 决定。
#[tracing::instrument(skip(cfg, faults), fields(total_packets = cfg.total_packets, window = cfg.window_size))]
pub fn run_protocol(
    protocol: Protocol,
    cfg: &SimConfig,
    faults: Box<dyn FaultModel>,
) -> Result<RunReport, RdtError> {
    cfg.validate()?;
    info!("▶️  开始协议运行");

    let (sender, receiver) = protocol.build(cfg);
    let link = Link::new(protocol, Channel::new(faults), cfg.timeout());
    let mut world = RdtWorld::new(link, sender, receiver);
    let mut sim = Simulator::default();

    let expected = cfg.payloads();
    sim.schedule(
        SimTime::ZERO,
        StartRun {
            payloads: expected.clone(),
        },
    );
    sim.run_until(cfg.deadline(), &mut world);

    if let Some(e) = world.take_fault() {
        return Err(e);
    }
    let Some(finished_at) = world.done_at() else {
        warn!(at = ?sim.now(), "⌛ 到达截止时间仍未完成");
        return Err(RdtError::Incomplete {
            protocol,
            delivered: world.link.delivered.len(),
            expected: expected.len(),
            at: sim.now(),
        });
    };

    let delivered = std::mem::take(&mut world.link.delivered);
    verify_delivery(protocol, &expected, &delivered)?;

    world.link.record(
        sim.now(),
        TraceEventKind::RunComplete {
            delivered: delivered.clone(),
        },
    );
    info!(
        delivered = delivered.len(),
        finished_at = ?finished_at,
        events = sim.executed(),
        data_sent = world.link.stats.data_sent,
        retransmitted = world.link.stats.data_retransmitted,
        "✅ 协议运行完成"
    );

    Ok(RunReport {
        protocol,
        delivered,
        stats: std::mem::take(&mut world.link.stats),
        trace: std::mem::take(&mut world.link.trace),
        finished_at,
    })
}

/// 交付序列必须与提交序列逐项相同：不丢、不重、不乱序。
fn verify_delivery(
    protocol: Protocol,
    expected: &[String],
    delivered: &[String],
) -> Result<(), RdtError> {
    let n = expected.len().max(delivered.len());
    for index in 0..n {
        let (e, d) = (expected.get(index), delivered.get(index));
        if e != d {
            return Err(RdtError::DeliveryMismatch {
                protocol,
                index,
                expected: e.cloned(),
                got: d.cloned(),
            });
        }
    }
    Ok(())
}
