//! rdt 协议仿真
//!
//! 依次（或单独）运行 Stop-and-Wait / Go-Back-N / Selective Repeat，打印应用层收到的序列。

use clap::{Parser, ValueEnum};
use rdt_sim::net::{FaultModel, RandomFaults, ScriptedFaults};
use rdt_sim::trace::TraceEvent;
use rdt_sim::{Protocol, RdtError, RunReport, SimConfig};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(
    name = "rdt-sim",
    about = "Stop-and-Wait / Go-Back-N / Selective Repeat over a lossy channel"
)]
struct Args {
    /// Protocol to run
    #[arg(long, value_enum, default_value_t = ProtocolArg::All)]
    protocol: ProtocolArg,

    /// JSON config file; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    prob_loss: Option<f64>,
    #[arg(long)]
    prob_corruption: Option<f64>,
    #[arg(long)]
    prob_delay: Option<f64>,
    /// Upper bound of a channel delay (seconds)
    #[arg(long)]
    max_delay_secs: Option<f64>,
    /// Retransmission timeout (seconds)
    #[arg(long)]
    timeout_secs: Option<f64>,
    #[arg(long)]
    window_size: Option<usize>,
    #[arg(long)]
    total_packets: Option<usize>,
    /// Channel RNG seed
    #[arg(long)]
    seed: Option<u64>,
    /// Logical-time limit of one run (seconds)
    #[arg(long)]
    deadline_secs: Option<f64>,

    /// Deterministically drop the first DATA packet carrying this seq (repeatable)
    #[arg(long)]
    drop_data_seq: Vec<u64>,

    /// Write every trace event of every run to this JSON file
    #[arg(long)]
    trace_json: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProtocolArg {
    All,
    Sw,
    Gbn,
    Sr,
}

impl ProtocolArg {
    fn protocols(self) -> Vec<Protocol> {
        match self {
            ProtocolArg::All => Protocol::ALL.to_vec(),
            ProtocolArg::Sw => vec![Protocol::StopWait],
            ProtocolArg::Gbn => vec![Protocol::GoBackN],
            ProtocolArg::Sr => vec![Protocol::SelectiveRepeat],
        }
    }
}

impl Args {
    fn config(&self) -> Result<SimConfig, RdtError> {
        let mut cfg = match &self.config {
            Some(path) => SimConfig::from_json_file(path)?,
            None => SimConfig::default(),
        };
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if let Some(v) = self.$field { cfg.$field = v; })*
            };
        }
        overlay!(
            prob_loss,
            prob_corruption,
            prob_delay,
            max_delay_secs,
            timeout_secs,
            window_size,
            total_packets,
            seed,
            deadline_secs
        );
        cfg.validate()?;
        Ok(cfg)
    }

    fn faults(&self, cfg: &SimConfig) -> Box<dyn FaultModel> {
        let random = RandomFaults::from_config(cfg);
        if self.drop_data_seq.is_empty() {
            return Box::new(random);
        }
        let scripted = self
            .drop_data_seq
            .iter()
            .fold(ScriptedFaults::with_fallback(Box::new(random)), |s, &seq| {
                s.drop_data_once(seq)
            });
        Box::new(scripted)
    }
}

fn print_report(report: &RunReport) {
    println!("{} received data: {:?}", report.protocol, report.delivered);
    let s = &report.stats;
    println!(
        "{} stats: finished_at={:.3}s data_sent={} retransmitted={} acks_sent={} acks_received={} drops={} corruptions={} delays={} timeouts={}",
        report.protocol,
        report.finished_at.as_secs_f64(),
        s.data_sent,
        s.data_retransmitted,
        s.acks_sent,
        s.acks_received,
        s.channel_drops,
        s.channel_corruptions,
        s.channel_delays,
        s.timeouts
    );
}

fn main() -> ExitCode {
    // 初始化 tracing（写 stderr，stdout 留给结果）
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    let cfg = match args.config() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "配置无效");
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };
    let mut all_events: Vec<TraceEvent> = Vec::new();
    let mut failed = false;
    for protocol in args.protocol.protocols() {
        info!(%protocol, "Starting {protocol} protocol");
        match rdt_sim::run_protocol(protocol, &cfg, args.faults(&cfg)) {
            Ok(report) => {
                print_report(&report);
                all_events.extend(report.trace.events);
            }
            Err(e) => {
                error!(error = %e, "运行失败");
                eprintln!("error: {e}");
                failed = true;
            }
        }
    }

    if let Some(path) = &args.trace_json {
        let written = serde_json::to_string_pretty(&all_events)
            .map_err(|e| e.to_string())
            .and_then(|raw| fs::write(path, raw).map_err(|e| e.to_string()));
        if let Err(e) = written {
            eprintln!("error: failed to write {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
        info!(path = %path.display(), events = all_events.len(), "trace 已写出");
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
