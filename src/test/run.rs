use crate::config::SimConfig;
use crate::error::RdtError;
use crate::net::{Channel, Endpoint, Link, Lossless, Packet, RdtWorld, ScriptedFaults};
use crate::proto::Protocol;
use crate::sim::{SimTime, Simulator, World};
use crate::trace::{RejectReason, TraceEventKind};
use crate::{run_protocol, run_with_random_faults};

fn scripted(protocol: Protocol, total: usize, faults: ScriptedFaults) -> crate::RunReport {
    let cfg = SimConfig {
        total_packets: total,
        ..SimConfig::lossless()
    };
    run_protocol(protocol, &cfg, Box::new(faults)).expect("run succeeds")
}

#[test]
fn lossless_runs_deliver_everything_once() {
    for protocol in Protocol::ALL {
        let report = run_with_random_faults(protocol, &SimConfig::lossless()).expect("run");
        assert_eq!(report.delivered, super::payloads(10), "{protocol}");
        assert_eq!(report.stats.data_sent, 10, "{protocol}");
        assert_eq!(report.stats.data_retransmitted, 0, "{protocol}");
        assert_eq!(report.stats.acks_sent, 10, "{protocol}");
        assert_eq!(report.stats.timeouts, 0, "{protocol}");
        assert_eq!(report.finished_at, SimTime::ZERO, "{protocol}");
        assert!(
            !report
                .trace
                .iter()
                .any(|k| matches!(k, TraceEventKind::TimerExpired { .. })),
            "{protocol}"
        );
        assert!(matches!(
            report.trace.events.last().map(|e| &e.kind),
            Some(TraceEventKind::RunComplete { delivered }) if delivered.len() == 10
        ));
    }
}

#[test]
fn gbn_goes_back_over_the_whole_window_after_a_loss() {
    let report = scripted(Protocol::GoBackN, 10, ScriptedFaults::new().drop_data_once(2));
    assert_eq!(report.delivered, super::payloads(10));
    assert_eq!(report.trace.data_sent_seqs(Some(true)), vec![2, 3, 4, 5]);
    assert_eq!(report.stats.data_sent, 14);
    assert_eq!(report.stats.timeouts, 1);
    assert_eq!(report.finished_at, SimTime::from_secs(1));
}

#[test]
fn sr_resends_only_the_lost_packet() {
    let report = scripted(
        Protocol::SelectiveRepeat,
        10,
        ScriptedFaults::new().drop_data_once(2),
    );
    assert_eq!(report.delivered, super::payloads(10));
    assert_eq!(report.trace.data_sent_seqs(Some(true)), vec![2]);
    assert_eq!(report.stats.data_sent, 11);
    assert!(
        report
            .trace
            .iter()
            .any(|k| matches!(k, TraceEventKind::DataBuffered { seq: 3 }))
    );
}

#[test]
fn corrupt_data_is_treated_like_a_loss() {
    let gbn = scripted(Protocol::GoBackN, 10, ScriptedFaults::new().corrupt_data_once(2));
    assert_eq!(gbn.trace.data_sent_seqs(Some(true)), vec![2, 3, 4, 5]);
    assert_eq!(gbn.delivered, super::payloads(10));

    let sr = scripted(
        Protocol::SelectiveRepeat,
        10,
        ScriptedFaults::new().corrupt_data_once(2),
    );
    assert_eq!(sr.trace.data_sent_seqs(Some(true)), vec![2]);
    assert_eq!(sr.delivered, super::payloads(10));

    let sw = scripted(Protocol::StopWait, 3, ScriptedFaults::new().corrupt_data_once(0));
    assert_eq!(sw.trace.data_sent_seqs(Some(true)), vec![0]);
    assert_eq!(sw.delivered, super::payloads(3));
}

#[test]
fn corrupt_ack_waits_for_the_timeout() {
    let report = scripted(Protocol::StopWait, 3, ScriptedFaults::new().corrupt_ack_once(0));
    assert_eq!(report.trace.data_sent_seqs(Some(true)), vec![0]);
    assert_eq!(report.stats.corrupt_acks, 1);
    assert_eq!(report.stats.timeouts, 1);
    assert_eq!(report.delivered, super::payloads(3));
}

#[test]
fn gbn_cumulative_ack_covers_a_lost_ack() {
    let report = scripted(Protocol::GoBackN, 10, ScriptedFaults::new().drop_ack_once(0));
    assert!(report.trace.data_sent_seqs(Some(true)).is_empty());
    assert_eq!(report.delivered, super::payloads(10));
}

#[test]
fn sr_resends_a_packet_whose_ack_was_lost() {
    let report = scripted(
        Protocol::SelectiveRepeat,
        4,
        ScriptedFaults::new().drop_ack_once(3),
    );
    assert_eq!(report.trace.data_sent_seqs(Some(true)), vec![3]);
    assert_eq!(report.delivered, super::payloads(4));
}

#[test]
fn delayed_packet_is_reordered_by_sr_without_retransmission() {
    let faults = ScriptedFaults::new().delay_data_once(1, SimTime::from_millis(300));
    let sr = scripted(Protocol::SelectiveRepeat, 10, faults);
    assert_eq!(sr.delivered, super::payloads(10));
    assert_eq!(sr.stats.data_retransmitted, 0);
    assert_eq!(sr.stats.channel_delays, 1);

    let faults = ScriptedFaults::new().delay_data_once(1, SimTime::from_millis(300));
    let gbn = scripted(Protocol::GoBackN, 10, faults);
    assert_eq!(gbn.delivered, super::payloads(10));
    assert!(gbn.stats.data_retransmitted > 0);
}

#[test]
fn window_protocols_survive_random_faults() {
    for protocol in [Protocol::GoBackN, Protocol::SelectiveRepeat] {
        for seed in 0..25 {
            let cfg = SimConfig {
                seed,
                total_packets: 30,
                ..SimConfig::default()
            };
            let report = run_with_random_faults(protocol, &cfg)
                .unwrap_or_else(|e| panic!("{protocol} seed {seed}: {e}"));
            assert_eq!(report.delivered, cfg.payloads(), "{protocol} seed {seed}");
        }
    }
}

#[test]
fn stop_and_wait_survives_loss_and_corruption() {
    for seed in 0..25 {
        let cfg = SimConfig {
            seed,
            prob_loss: 0.2,
            prob_corruption: 0.2,
            prob_delay: 0.0,
            ..SimConfig::default()
        };
        let report = run_with_random_faults(Protocol::StopWait, &cfg)
            .unwrap_or_else(|e| panic!("seed {seed}: {e}"));
        assert_eq!(report.delivered, cfg.payloads(), "seed {seed}");
    }
}

#[test]
fn total_loss_hits_the_deadline() {
    let cfg = SimConfig {
        prob_loss: 1.0,
        deadline_secs: 5.0,
        ..SimConfig::default()
    };
    for protocol in Protocol::ALL {
        let err = run_with_random_faults(protocol, &cfg).expect_err("nothing gets through");
        assert!(matches!(
            err,
            RdtError::Incomplete {
                delivered: 0,
                expected: 10,
                ..
            }
        ));
    }
}

#[test]
fn misrouted_packet_stops_the_world() {
    let cfg = SimConfig::lossless();
    let (sender, receiver) = Protocol::GoBackN.build(&cfg);
    let link = Link::new(Protocol::GoBackN, Channel::new(Box::new(Lossless)), cfg.timeout());
    let mut world = RdtWorld::new(link, sender, receiver);
    let mut sim = Simulator::default();

    world.on_packet(Endpoint::Receiver, Packet::ack(0), &mut sim);
    assert!(world.should_stop());
    assert!(matches!(
        world.fault(),
        Some(RdtError::InvariantViolation {
            protocol: Protocol::GoBackN,
            ..
        })
    ));
}

#[test]
fn short_timeout_and_heavy_delay_never_duplicate_or_reorder() {
    for protocol in Protocol::ALL {
        for seed in 0..100 {
            let cfg = SimConfig {
                seed,
                prob_delay: 0.5,
                timeout_secs: 0.2,
                total_packets: 30,
                ..SimConfig::default()
            };
            let report = run_with_random_faults(protocol, &cfg)
                .unwrap_or_else(|e| panic!("{protocol} seed {seed}: {e}"));
            assert_eq!(report.delivered, cfg.payloads(), "{protocol} seed {seed}");
        }
    }
}

fn first_send_at(report: &crate::RunReport, wire: u64) -> Option<u64> {
    report.trace.events.iter().find_map(|e| match &e.kind {
        TraceEventKind::DataSent {
            seq,
            retrans: false,
            ..
        } if *seq == wire => Some(e.t_ns),
        _ => None,
    })
}

#[test]
fn sr_late_copy_after_window_wrap_is_not_taken_as_new_data() {
    // W=2：线上序号模 4。DATA 0 的第一份副本被拖到 3s，超时重传的副本先到。
    let cfg = SimConfig {
        window_size: 2,
        total_packets: 4,
        ..SimConfig::lossless()
    };
    let faults = ScriptedFaults::new().delay_data_once(0, SimTime::from_secs(3));
    let report = run_protocol(Protocol::SelectiveRepeat, &cfg, Box::new(faults)).expect("run");

    assert_eq!(report.delivered, super::payloads(4));
    assert_eq!(report.trace.data_sent_seqs(Some(true)), vec![0]);
    // 逻辑 2 等到 DATA 0 最后一份副本（t=1s）之后 2 × 3s
    let sent_2 = first_send_at(&report, 2).expect("logical 2 sent");
    assert!(sent_2 > SimTime::from_secs(7).0, "sent at {sent_2}");
    assert!(report.trace.iter().any(|k| matches!(
        k,
        TraceEventKind::DataRejected {
            seq: 0,
            reason: RejectReason::Duplicate
        }
    )));
}

#[test]
fn stop_and_wait_late_copy_is_not_taken_as_the_next_packet() {
    let cfg = SimConfig {
        total_packets: 3,
        ..SimConfig::lossless()
    };
    let faults = ScriptedFaults::new().delay_data_once(0, SimTime::from_secs(3));
    let report = run_protocol(Protocol::StopWait, &cfg, Box::new(faults)).expect("run");

    assert_eq!(report.delivered, super::payloads(3));
    let sent_1 = first_send_at(&report, 1).expect("second packet sent");
    assert!(sent_1 > SimTime::from_secs(7).0, "sent at {sent_1}");
}
