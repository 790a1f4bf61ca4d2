use std::collections::BTreeMap;
use std::net::SocketAddr;

use crate::packet::PacketType;
use crate::state::ConnectionState;

/// Reliable packets outside this many sequences ahead of the next expected
/// one are dropped rather than buffered, bounding memory for a connection
/// that is badly out of order.
pub const RELIABLE_WINDOW: u32 = 32;
/// Ticks between retransmission attempts for an unacknowledged reliable
/// packet, before any RTT sample narrows it. `retransmit_interval_ticks`
/// derives the live value from the smoothed RTT once one exists.
pub const RETRANSMIT_INTERVAL_TICKS: u32 = 10;
/// Floor on the RTT-derived retransmit interval, so a very low-latency
/// connection doesn't retransmit faster than the send-rate limit can clear.
pub const MIN_RETRANSMIT_INTERVAL_TICKS: u32 = 4;
/// Ticks of silence from a peer before a keep-alive is sent.
pub const KEEP_ALIVE_INTERVAL_TICKS: u32 = 20;
/// Ticks of silence from a peer before the connection is considered lost.
pub const TIMEOUT_TICKS: u32 = 200;
/// Outgoing datagrams a single connection may emit per tick.
pub const SEND_RATE_LIMIT_PER_TICK: usize = 8;
/// Bytes of unacked reliable payload that trigger send-rate throttling.
pub const SEND_RATE_THROTTLE_BYTES: usize = 64 * 1024;
/// Continuous ticks spent throttled before the connection gives up.
pub const MAX_CONTINUOUS_THROTTLE_TICKS: u32 = 100;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub reliable_packets_sent: u64,
    pub reliable_packets_received: u64,
    pub reliable_packets_resent: u64,
    pub reliable_packets_received_out_of_order: u64,
    pub unreliable_packets_sent: u64,
    pub unreliable_packets_received: u64,
    pub acks_sent: u64,
    pub acks_received: u64,
    pub send_rate_throttle_count: u64,
    pub packet_send_errors: u64,
    pub invalid_message_types: u64,
    pub invalid_message_payloads: u64,
    pub invalid_packet_headers: u64,
}

struct InFlightPacket {
    sequence: u32,
    payload: Vec<u8>,
    last_sent_tick: u32,
}

/// Tracks which of the last 33 reliable sequences this side has received,
/// for building the cumulative `[latest_seq][ack_bitmask]` ack body: bit
/// `i` of the mask means `latest_seq - (i + 1)` was also received.
#[derive(Default)]
struct AckTracker {
    latest_seq: Option<u32>,
    bitmask: u32,
}

impl AckTracker {
    fn record(&mut self, sequence: u32) {
        match self.latest_seq {
            None => self.latest_seq = Some(sequence),
            Some(latest) => {
                let diff = sequence.wrapping_sub(latest) as i32;
                if diff > 0 {
                    let shift = diff as u32;
                    self.bitmask = if shift >= 32 { 0 } else { self.bitmask << shift };
                    self.bitmask |= 1 << (shift - 1).min(31);
                    self.latest_seq = Some(sequence);
                } else if diff < 0 {
                    let back = (-diff) as u32;
                    if back <= 32 {
                        self.bitmask |= 1 << (back - 1);
                    }
                }
            }
        }
    }

    fn ack_body(&self) -> [u8; 8] {
        let latest = self.latest_seq.unwrap_or(0);
        let mut body = [0u8; 8];
        body[0..4].copy_from_slice(&latest.to_be_bytes());
        body[4..8].copy_from_slice(&self.bitmask.to_be_bytes());
        body
    }
}

/// Whether `sequence` is covered by a `[latest_seq][ack_bitmask]` ack body:
/// either it IS `latest_seq`, or it's one of the 32 sequences before it with
/// its bit set.
fn seq_is_acked(latest_seq: u32, bitmask: u32, sequence: u32) -> bool {
    if sequence == latest_seq {
        return true;
    }
    let back = latest_seq.wrapping_sub(sequence);
    back >= 1 && back <= 32 && bitmask & (1 << (back - 1)) != 0
}

fn frame(kind: PacketType, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + body.len());
    out.push(kind as u8);
    out.extend_from_slice(body);
    out
}

/// Per-peer reliable-over-UDP channel: handshake state machine, a sequenced
/// reliable stream with retransmission, a best-effort unreliable stream, and
/// keep-alive/timeout bookkeeping. One instance per connected client.
pub struct Connection {
    pub peer: SocketAddr,
    state: ConnectionState,
    local_sequence: u32,
    next_expected: u32,
    send_queue: Vec<InFlightPacket>,
    reorder_buffer: BTreeMap<u32, Vec<u8>>,
    ack_tracker: AckTracker,
    last_recv_tick: u32,
    last_send_tick: u32,
    continuous_throttle_ticks: u32,
    /// Tick a keep-alive ping was last sent awaiting its echo, if one is
    /// outstanding.
    pending_keepalive_sent_tick: Option<u32>,
    /// Exponentially-weighted smoothed round-trip time, in ticks.
    smoothed_rtt_ticks: u32,
    stats: ConnectionStats,
}

impl Connection {
    fn new(peer: SocketAddr, state: ConnectionState, tick: u32) -> Self {
        Self {
            peer,
            state,
            local_sequence: 0,
            next_expected: 0,
            send_queue: Vec::new(),
            reorder_buffer: BTreeMap::new(),
            ack_tracker: AckTracker::default(),
            last_recv_tick: tick,
            last_send_tick: tick,
            continuous_throttle_ticks: 0,
            pending_keepalive_sent_tick: None,
            // Seeded so the RTT-derived retransmit interval matches
            // `RETRANSMIT_INTERVAL_TICKS` until a real sample narrows it.
            smoothed_rtt_ticks: RETRANSMIT_INTERVAL_TICKS / 2,
            stats: ConnectionStats::default(),
        }
    }

    /// Call after a `Socket::send_to` for this connection returns an error.
    pub fn record_send_error(&mut self) {
        self.stats.packet_send_errors += 1;
    }

    /// Smoothed round-trip time estimate, in ticks, from keep-alive echoes.
    pub fn smoothed_rtt_ticks(&self) -> u32 {
        self.smoothed_rtt_ticks
    }

    fn update_rtt(&mut self, sample_ticks: u32) {
        // EWMA with a 1/4 weight on the new sample, the same smoothing
        // ratio TCP's SRTT estimator uses, just scaled to ticks.
        self.smoothed_rtt_ticks = (self.smoothed_rtt_ticks * 3 + sample_ticks) / 4;
    }

    fn retransmit_interval_ticks(&self) -> u32 {
        (self.smoothed_rtt_ticks * 2).max(MIN_RETRANSMIT_INTERVAL_TICKS)
    }

    /// Call when the caller's `decode_message` fails with an unknown tag.
    pub fn record_invalid_message_type(&mut self) {
        self.stats.invalid_message_types += 1;
    }

    /// Call when the caller's `decode_message` fails to parse a known tag's
    /// body (underrun, overrun, or otherwise malformed).
    pub fn record_invalid_message_payload(&mut self) {
        self.stats.invalid_message_payloads += 1;
    }

    /// Client side: begin a handshake. Returns the SYN datagram to send.
    pub fn connect(peer: SocketAddr, tick: u32) -> (Self, Vec<u8>) {
        let conn = Self::new(peer, ConnectionState::Handshaking, tick);
        (conn, frame(PacketType::HandshakeSyn, &[]))
    }

    /// Server side: a SYN just arrived from a new peer. Returns the SYN-ACK
    /// datagram to send.
    pub fn accept(peer: SocketAddr, tick: u32) -> (Self, Vec<u8>) {
        let conn = Self::new(peer, ConnectionState::Handshaking, tick);
        (conn, frame(PacketType::HandshakeSynAck, &[]))
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn stats(&self) -> ConnectionStats {
        self.stats
    }

    pub fn is_timed_out(&self, tick: u32) -> bool {
        tick.saturating_sub(self.last_recv_tick) >= TIMEOUT_TICKS
    }

    fn touch_recv(&mut self, tick: u32) {
        self.last_recv_tick = tick;
    }

    fn touch_send(&mut self, tick: u32) {
        self.last_send_tick = tick;
    }

    /// Queues a payload on the reliable channel and returns the datagram to
    /// send immediately; `tick` runs retransmission for it afterward.
    pub fn send_reliable(&mut self, tick: u32, payload: Vec<u8>) -> Vec<u8> {
        let sequence = self.local_sequence;
        self.local_sequence = self.local_sequence.wrapping_add(1);

        let mut body = Vec::with_capacity(4 + payload.len());
        body.extend_from_slice(&sequence.to_be_bytes());
        body.extend_from_slice(&payload);
        let datagram = frame(PacketType::Reliable, &body);

        self.send_queue.push(InFlightPacket { sequence, payload, last_sent_tick: tick });
        self.stats.reliable_packets_sent += 1;
        self.stats.packets_sent += 1;
        self.touch_send(tick);
        datagram
    }

    /// Frames a payload for the unreliable channel. Stateless: never queued,
    /// never retransmitted.
    pub fn send_unreliable(&mut self, tick: u32, payload: &[u8]) -> Vec<u8> {
        self.stats.unreliable_packets_sent += 1;
        self.stats.packets_sent += 1;
        self.touch_send(tick);
        frame(PacketType::Unreliable, payload)
    }

    /// Runs retransmission and keep-alive for this tick, returning datagrams
    /// to send, rate-limited to `SEND_RATE_LIMIT_PER_TICK`.
    pub fn tick(&mut self, tick: u32) -> Vec<Vec<u8>> {
        let buffered_bytes: usize = self.send_queue.iter().map(|p| p.payload.len()).sum();
        if buffered_bytes > SEND_RATE_THROTTLE_BYTES {
            self.stats.send_rate_throttle_count += 1;
            self.continuous_throttle_ticks += 1;
            if self.continuous_throttle_ticks >= MAX_CONTINUOUS_THROTTLE_TICKS {
                self.state = ConnectionState::Disconnected;
                self.stats.packets_sent += 1;
                return vec![frame(PacketType::Disconnect, b"send rate too low")];
            }
            // Retransmits are deferred while throttled; the unacked backlog
            // only shrinks via incoming acks.
            return Vec::new();
        }
        self.continuous_throttle_ticks = 0;

        let mut outgoing = Vec::new();
        let retransmit_interval = self.retransmit_interval_ticks();

        // Oldest-unsent-first so a large backlog doesn't starve later
        // sequences when the per-tick send budget is smaller than the
        // queue: without this, the same eligible prefix would always win
        // the race and the tail of the queue would never get resent.
        let mut due: Vec<usize> = self
            .send_queue
            .iter()
            .enumerate()
            .filter(|(_, p)| tick.saturating_sub(p.last_sent_tick) >= retransmit_interval)
            .map(|(i, _)| i)
            .collect();
        due.sort_by_key(|&i| self.send_queue[i].last_sent_tick);
        due.truncate(SEND_RATE_LIMIT_PER_TICK);

        for i in due {
            let in_flight = &mut self.send_queue[i];
            in_flight.last_sent_tick = tick;
            let mut body = Vec::with_capacity(4 + in_flight.payload.len());
            body.extend_from_slice(&in_flight.sequence.to_be_bytes());
            body.extend_from_slice(&in_flight.payload);
            outgoing.push(frame(PacketType::Reliable, &body));
            self.stats.reliable_packets_resent += 1;
            self.stats.packets_sent += 1;
        }

        if self.state == ConnectionState::Connected
            && tick.saturating_sub(self.last_send_tick) >= KEEP_ALIVE_INTERVAL_TICKS
            && outgoing.len() < SEND_RATE_LIMIT_PER_TICK
        {
            // Empty body marks this a ping awaiting an echo; the peer's
            // reply carries a non-empty body so it isn't echoed right back.
            outgoing.push(frame(PacketType::KeepAlive, &[]));
            self.pending_keepalive_sent_tick = Some(tick);
            self.stats.packets_sent += 1;
            self.touch_send(tick);
        }

        outgoing
    }

    /// Feeds one received datagram in. Returns the reliable-channel payloads
    /// now ready for dispatch, in sequence order, plus any datagrams that
    /// must be sent back immediately (acks, handshake replies).
    pub fn handle_incoming(&mut self, tick: u32, raw: &[u8]) -> (Vec<Vec<u8>>, Vec<Vec<u8>>) {
        self.touch_recv(tick);
        self.stats.packets_received += 1;

        let Some((&kind_byte, body)) = raw.split_first() else {
            self.stats.invalid_packet_headers += 1;
            return (Vec::new(), Vec::new());
        };
        let Ok(kind) = PacketType::try_from(kind_byte) else {
            self.stats.invalid_packet_headers += 1;
            return (Vec::new(), Vec::new());
        };

        let mut deliveries = Vec::new();
        let mut replies = Vec::new();

        match kind {
            PacketType::HandshakeSyn => {
                replies.push(frame(PacketType::HandshakeSynAck, &[]));
            }
            PacketType::HandshakeSynAck => {
                self.state = ConnectionState::Connected;
                replies.push(frame(PacketType::HandshakeAck, &[]));
            }
            PacketType::HandshakeAck => {
                self.state = ConnectionState::Connected;
            }
            PacketType::Reliable => {
                if body.len() < 4 {
                    return (Vec::new(), Vec::new());
                }
                let sequence = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
                let payload = body[4..].to_vec();
                self.stats.reliable_packets_received += 1;
                self.ack_tracker.record(sequence);
                self.accept_reliable(sequence, payload, &mut deliveries);
                replies.push(frame(PacketType::Ack, &self.ack_tracker.ack_body()));
                self.stats.acks_sent += 1;
            }
            PacketType::Unreliable => {
                self.stats.unreliable_packets_received += 1;
                deliveries.push(body.to_vec());
            }
            PacketType::Ack => {
                if body.len() >= 8 {
                    let latest_seq = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
                    let bitmask = u32::from_be_bytes([body[4], body[5], body[6], body[7]]);
                    self.send_queue
                        .retain(|p| !seq_is_acked(latest_seq, bitmask, p.sequence));
                    self.stats.acks_received += 1;
                }
            }
            PacketType::KeepAlive => {
                if body.is_empty() {
                    // Empty body is a ping requesting an echo; reply with a
                    // non-empty body so the peer doesn't echo it right back.
                    replies.push(frame(PacketType::KeepAlive, &[1]));
                } else if let Some(sent_tick) = self.pending_keepalive_sent_tick.take() {
                    self.update_rtt(tick.saturating_sub(sent_tick));
                }
            }
            PacketType::Disconnect => {
                self.state = ConnectionState::Disconnected;
            }
        }

        (deliveries, replies)
    }

    fn accept_reliable(&mut self, sequence: u32, payload: Vec<u8>, deliveries: &mut Vec<Vec<u8>>) {
        if sequence == self.next_expected {
            deliveries.push(payload);
            self.next_expected = self.next_expected.wrapping_add(1);
            while let Some(buffered) = self.reorder_buffer.remove(&self.next_expected) {
                deliveries.push(buffered);
                self.next_expected = self.next_expected.wrapping_add(1);
            }
            return;
        }

        let ahead = sequence.wrapping_sub(self.next_expected);
        if ahead == 0 || ahead >= RELIABLE_WINDOW {
            // Duplicate of an already-delivered sequence, or too far outside
            // the window to buffer; drop it.
            return;
        }
        self.stats.reliable_packets_received_out_of_order += 1;
        self.reorder_buffer.insert(sequence, payload);
    }

    pub fn disconnect(&mut self, tick: u32) -> Vec<u8> {
        self.state = ConnectionState::Disconnecting;
        self.touch_send(tick);
        frame(PacketType::Disconnect, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn addr() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    #[test]
    fn handshake_reaches_connected_on_both_sides() {
        let (mut client, _syn) = Connection::connect(addr(), 0);
        let (mut server, syn_ack) = Connection::accept(addr(), 0);
        assert_eq!(server.state(), ConnectionState::Handshaking);

        let (_, client_replies) = client.handle_incoming(1, &syn_ack);
        assert_eq!(client.state(), ConnectionState::Connected);
        assert_eq!(client_replies.len(), 1);

        let (_, server_replies) = server.handle_incoming(2, &client_replies[0]);
        assert_eq!(server.state(), ConnectionState::Connected);
        assert!(server_replies.is_empty());
    }

    #[test]
    fn reliable_channel_delivers_in_order_despite_loss_and_reorder() {
        let (mut sender, _) = Connection::connect(addr(), 0);
        let (mut receiver, _) = Connection::accept(addr(), 0);

        let p100 = sender.send_reliable(0, b"a".to_vec());
        let p101 = sender.send_reliable(0, b"b".to_vec());
        let p102 = sender.send_reliable(0, b"c".to_vec());

        // p101 is lost on first attempt; p100 and p102 arrive out of order.
        // Their acks make it back to the sender, so only p101 stays in
        // flight when the retransmit timer fires.
        let (delivered_100, ack_100) = receiver.handle_incoming(1, &p100);
        assert_eq!(delivered_100, vec![b"a".to_vec()]);
        sender.handle_incoming(1, &ack_100[0]);

        let (delivered_102, ack_102) = receiver.handle_incoming(1, &p102);
        assert!(delivered_102.is_empty());
        assert_eq!(receiver.stats().reliable_packets_received_out_of_order, 1);
        sender.handle_incoming(1, &ack_102[0]);

        // Retransmission interval elapses; p101 is resent and arrives.
        let resent = sender.tick(RETRANSMIT_INTERVAL_TICKS);
        assert_eq!(resent.len(), 1);
        let (delivered_101, _) = receiver.handle_incoming(2, &resent[0]);
        assert_eq!(delivered_101, vec![b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn ack_clears_the_send_queue() {
        let (mut sender, _) = Connection::connect(addr(), 0);
        let (mut receiver, _) = Connection::accept(addr(), 0);

        let packet = sender.send_reliable(0, b"hello".to_vec());
        let (_, replies) = receiver.handle_incoming(1, &packet);
        assert_eq!(replies.len(), 1);

        sender.handle_incoming(2, &replies[0]);
        let resent = sender.tick(RETRANSMIT_INTERVAL_TICKS);
        assert!(resent.is_empty(), "acked packet must not be retransmitted");
    }

    #[test]
    fn send_rate_throttling_disconnects_after_sustained_backlog() {
        let (mut sender, _) = Connection::connect(addr(), 0);
        let big = vec![0u8; SEND_RATE_THROTTLE_BYTES + 1];
        sender.send_reliable(0, big);

        for t in 1..MAX_CONTINUOUS_THROTTLE_TICKS {
            let outgoing = sender.tick(t);
            assert!(outgoing.is_empty(), "retransmits must be deferred while throttled");
        }
        assert_eq!(sender.stats().send_rate_throttle_count, (MAX_CONTINUOUS_THROTTLE_TICKS - 1) as u64);

        let outgoing = sender.tick(MAX_CONTINUOUS_THROTTLE_TICKS);
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0][0], PacketType::Disconnect as u8);
        assert_eq!(sender.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn keep_alive_echo_narrows_the_smoothed_rtt_and_retransmit_interval() {
        let (mut local, _) = Connection::connect(addr(), 0);
        let (mut peer, _) = Connection::accept(addr(), 0);
        assert_eq!(local.smoothed_rtt_ticks(), RETRANSMIT_INTERVAL_TICKS / 2);

        let ping = local.tick(KEEP_ALIVE_INTERVAL_TICKS);
        assert_eq!(ping.len(), 1);
        assert_eq!(ping[0][0], PacketType::KeepAlive as u8);

        let (_, pong) = peer.handle_incoming(KEEP_ALIVE_INTERVAL_TICKS, &ping[0]);
        assert_eq!(pong.len(), 1);

        let sample_tick = KEEP_ALIVE_INTERVAL_TICKS + 5;
        local.handle_incoming(sample_tick, &pong[0]);

        // EWMA with a 1/4 weight on a 5-tick sample against the 5-tick seed
        // leaves the estimate unchanged; a second, larger sample must move it.
        let ping2 = local.tick(sample_tick + KEEP_ALIVE_INTERVAL_TICKS);
        assert_eq!(ping2.len(), 1);
        let (_, pong2) = peer.handle_incoming(sample_tick + KEEP_ALIVE_INTERVAL_TICKS, &ping2[0]);
        local.handle_incoming(sample_tick + KEEP_ALIVE_INTERVAL_TICKS + 40, &pong2[0]);

        assert!(
            local.smoothed_rtt_ticks() > RETRANSMIT_INTERVAL_TICKS / 2,
            "a 40-tick RTT sample must raise the smoothed estimate"
        );
    }

    #[test]
    fn silence_past_timeout_ticks_is_detected() {
        let (conn, _) = Connection::connect(addr(), 0);
        assert!(!conn.is_timed_out(TIMEOUT_TICKS - 1));
        assert!(conn.is_timed_out(TIMEOUT_TICKS));
    }

    #[test]
    fn fuzzed_delivery_order_still_yields_every_payload_in_sequence() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let (mut sender, _) = Connection::connect(addr(), 0);
        let (mut receiver, _) = Connection::accept(addr(), 0);

        let payloads: Vec<Vec<u8>> = (0..20u8).map(|i| vec![i]).collect();
        let mut datagrams: Vec<Vec<u8>> =
            payloads.iter().map(|p| sender.send_reliable(0, p.clone())).collect();
        datagrams.shuffle(&mut rng);

        // Drop every third datagram on first pass; they get picked up by
        // retransmission.
        let mut delivered = Vec::new();
        for (i, datagram) in datagrams.iter().enumerate() {
            if i % 3 == 0 {
                continue;
            }
            let (batch, _) = receiver.handle_incoming(1, datagram);
            delivered.extend(batch);
        }

        for round in 0..5u32 {
            let tick = RETRANSMIT_INTERVAL_TICKS * (round + 1);
            let resent = sender.tick(tick);
            for datagram in resent {
                let (batch, _) = receiver.handle_incoming(tick, &datagram);
                delivered.extend(batch);
            }
        }

        assert_eq!(delivered, payloads);
    }
}
