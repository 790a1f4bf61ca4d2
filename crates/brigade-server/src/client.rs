use std::net::SocketAddr;

use brigade_protocol::Connection;
use brigade_types::PlayerId;
use brigade_world::SnapshotRing;

/// Added to `spam_counter` by one chat or rcon message.
pub const SPAM_MESSAGE_WEIGHT: u32 = 3;
/// Subtracted from `spam_counter` every tick it isn't raised by a message.
pub const SPAM_DECAY_PER_TICK: u32 = 1;
/// `spam_counter` value past which the sender is kicked for spam.
pub const SPAM_KICK_THRESHOLD: u32 = 10;

/// Join-flow progress for one connecting/connected peer, independent of the
/// transport-level `ConnectionState` the `Connection` already tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStage {
    /// Handshake complete, waiting on `ServerInfoRequest`.
    AwaitingServerInfoRequest,
    /// `ServerInfo` sent; client may still be pulling resources.
    DownloadingResources,
    /// `Joined`/`CvarMod`/`PleaseSelectTeam` sent; waiting on `TeamSelect`.
    AwaitingTeamSelect,
    /// `TeamSelect` applied; the client is a live player in `World`.
    InGame,
}

/// One connected peer. `player_id` is `PlayerId::NONE` until the join flow
/// reaches `InGame`. `rcon_token` is set independently of `player_id` — an
/// rcon session is a bearer-token concept orthogonal to being a player.
pub struct Client {
    pub addr: SocketAddr,
    pub connection: Connection,
    pub stage: JoinStage,
    pub username: String,
    pub player_id: PlayerId,
    pub inventory_id: u64,
    pub inventory_token: u64,
    pub rcon_token: Option<String>,

    /// Raised by `SPAM_MESSAGE_WEIGHT` per chat or rcon message, decayed by
    /// `SPAM_DECAY_PER_TICK` every tick; past `SPAM_KICK_THRESHOLD` the
    /// client is kicked for spam. Rcon shares this counter with ordinary
    /// chat per spec's "rate-limits identical to ordinary chat" rule.
    pub spam_counter: u32,
    /// Ticks since the last application-level message; reset on any
    /// `ClientMessage` other than a bare keep-alive.
    pub afk_ticks: u32,

    /// Ticks between snapshot sends, derived from `UserCmd.update_rate` at
    /// join time (server update interval, not the tick rate itself).
    pub update_interval_ticks: u32,
    pub ticks_since_last_update: u32,

    pub snapshot_ring: SnapshotRing,
    pub latest_snapshot_acked: Option<u32>,

    /// Byte offset into the current resource upload, if one is in
    /// progress; `None` means no upload is currently outstanding.
    pub resource_upload_cursor: Option<u32>,
}

impl Client {
    pub fn new(addr: SocketAddr, connection: Connection) -> Self {
        Self {
            addr,
            connection,
            stage: JoinStage::AwaitingServerInfoRequest,
            username: String::new(),
            player_id: PlayerId::NONE,
            inventory_id: 0,
            inventory_token: 0,
            rcon_token: None,
            spam_counter: 0,
            afk_ticks: 0,
            update_interval_ticks: 1,
            ticks_since_last_update: 0,
            snapshot_ring: SnapshotRing::new(),
            latest_snapshot_acked: None,
            resource_upload_cursor: None,
        }
    }

    pub fn is_in_game(&self) -> bool {
        self.stage == JoinStage::InGame && !self.player_id.is_none()
    }

    /// Decays the spam counter by one tick's worth. Call once per server
    /// tick regardless of whether this client sent anything.
    pub fn decay_spam(&mut self) {
        self.spam_counter = self.spam_counter.saturating_sub(SPAM_DECAY_PER_TICK);
    }

    /// Records a chat or rcon message against the spam counter. Returns
    /// `true` once the counter has crossed the kick threshold.
    pub fn record_spam_message(&mut self) -> bool {
        self.spam_counter = self.spam_counter.saturating_add(SPAM_MESSAGE_WEIGHT);
        self.spam_counter > SPAM_KICK_THRESHOLD
    }

    /// Whether this tick's update-send timer has elapsed; advances the
    /// timer as a side effect so the caller doesn't have to track it
    /// separately.
    pub fn due_for_update(&mut self) -> bool {
        self.ticks_since_last_update += 1;
        if self.ticks_since_last_update >= self.update_interval_ticks.max(1) {
            self.ticks_since_last_update = 0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> Client {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let (connection, _) = Connection::connect(addr, 0);
        Client::new(addr, connection)
    }

    #[test]
    fn a_burst_of_messages_crosses_the_kick_threshold() {
        let mut client = test_client();
        let mut kicked = false;
        for _ in 0..4 {
            kicked = client.record_spam_message();
        }
        assert!(kicked, "4 messages at weight 3 must exceed a threshold of 10");
    }

    #[test]
    fn decay_keeps_a_sender_spaced_out_across_ticks_under_the_threshold() {
        let mut client = test_client();
        for _ in 0..20 {
            assert!(!client.record_spam_message(), "a message every 4 ticks must never trip the kick");
            for _ in 0..4 {
                client.decay_spam();
            }
        }
    }
}
