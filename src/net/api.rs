//! Link-facing API used by the protocol state machines.

use crate::proto::Protocol;
use crate::sim::{SimTime, Simulator, TimerId};
use crate::trace::TraceEventKind;

use super::{Packet, Stats};

/// What a sender or receiver may do to the outside world.
///
/// Every call also leaves a trace event and bumps the matching counter, so the
/// state machines never touch the trace log for channel or timer bookkeeping.
pub trait LinkApi {
    fn protocol(&self) -> Protocol;

    /// Sender -> receiver.
    fn send_data(&mut self, pkt: Packet, retrans: bool, sim: &mut Simulator);

    /// Receiver -> sender.
    fn send_ack(&mut self, pkt: Packet, sim: &mut Simulator);

    /// Arm a retransmission timer guarding `seq`, expiring after the configured timeout.
    fn start_timer(&mut self, seq: u64, sim: &mut Simulator) -> TimerId;

    /// Idempotent; a cancelled timer never fires.
    fn cancel_timer(&mut self, id: TimerId, seq: u64, now: SimTime);

    /// Upper bound on how long the channel may hold a packet.
    fn max_delay(&self) -> SimTime;

    /// Ask for `Sender::on_wake` at `at`.
    fn wake_at(&mut self, at: SimTime, sim: &mut Simulator);

    /// Hand an in-order payload to the application sink.
    fn deliver(&mut self, seq: u64, payload: String, now: SimTime);

    fn record(&mut self, now: SimTime, kind: TraceEventKind);

    fn stats_mut(&mut self) -> &mut Stats;
}
