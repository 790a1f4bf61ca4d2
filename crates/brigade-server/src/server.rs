use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use brigade_events::{CvarFlags, CvarRegistry, CvarValue};
use brigade_protocol::{decode_message, encode_message, ClientMessage, ResourceManifestEntry, ServerMessage, Socket};
use brigade_types::{PlayerClass, SoundId, Team, Vec2};
use brigade_world::{Map, MessageScope, SoundScope, World, WorldEvent};

use crate::client::{Client, JoinStage};
use crate::config::ServerConfig;
use crate::error::JoinError;

/// Caps concurrent connections from one address, per §4.3's
/// `TooManyFromIp` rejection.
const MAX_CONNECTIONS_PER_IP: usize = 4;
const RCON_MAX_PACKET_LEN: usize = 1024;
const GAME_VERSION: u32 = 1;

fn hash_password(salt: &[u8], password: &[u8]) -> Vec<u8> {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(salt);
    hasher.update(password);
    hasher.finalize().to_be_bytes().to_vec()
}

struct Resource {
    entry: ResourceManifestEntry,
    bytes: Vec<u8>,
}

/// Owns the socket, the `endpoint -> Client` map, the `World`, the cvar
/// registry, and the resource table. `update` is the only entry point a
/// driver calls; everything else is private bookkeeping reached from it.
pub struct Server {
    socket: Socket,
    clients: HashMap<SocketAddr, Client>,
    world: World,
    cvars: CvarRegistry,
    config: ServerConfig,
    banned_ips: std::collections::HashSet<IpAddr>,
    resources: Vec<Resource>,
    tick: u32,
}

impl Server {
    pub fn bind(addr: SocketAddr, config: ServerConfig) -> std::io::Result<Self> {
        let socket = Socket::bind(addr)?;
        let mut cvars = CvarRegistry::new();
        register_default_cvars(&mut cvars, &config);
        cvars.load_archived(&config.cvars);

        let map = Map::empty(64, 64);
        let world = World::new(map, round_seconds_for(&cvars));

        Ok(Self {
            socket,
            clients: HashMap::new(),
            world,
            cvars,
            banned_ips: config.banned_ips.iter().copied().collect(),
            config,
            resources: Vec::new(),
            tick: 0,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn add_resource(&mut self, name: String, bytes: Vec<u8>, is_text: bool) {
        let name_hash = crc32fast::hash(name.as_bytes());
        let file_hash = crc32fast::hash(&bytes);
        let entry = ResourceManifestEntry {
            name,
            name_hash,
            file_hash,
            size: bytes.len() as u32,
            is_text,
            can_download: true,
        };
        self.resources.push(Resource { entry, bytes });
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn cvars(&self) -> &CvarRegistry {
        &self.cvars
    }

    pub fn cvars_mut(&mut self) -> &mut CvarRegistry {
        &mut self.cvars
    }

    /// Writes `{hostname, port, ARCHIVE cvars, banned IPs}` back to `path`,
    /// per §6/§9's persisted-state shape. Called periodically by the driver
    /// loop rather than only at shutdown, since this core has no signal-
    /// handling crate in its dependency stack to guarantee a clean exit runs.
    pub fn persist_config(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let mut config = self.config.clone();
        config.cvars = self.cvars.archived();
        config.banned_ips = self.banned_ips.iter().copied().collect();
        config.save(path)
    }

    /// Runs exactly one tick: drain the socket, service connections, advance
    /// the world, dispatch events, send due snapshots. Never blocks.
    pub fn update(&mut self) {
        self.drain_socket();
        self.service_connections();

        self.world.tick();
        self.dispatch_world_events();
        self.send_due_snapshots();

        self.flush_connections();
        self.tick = self.tick.wrapping_add(1);
    }

    fn drain_socket(&mut self) {
        let mut buf = [0u8; 2048];
        loop {
            match self.socket.recv_from(&mut buf) {
                Ok(Some((len, addr))) => self.handle_datagram(addr, &buf[..len]),
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "socket recv error");
                    break;
                }
            }
        }
    }

    fn handle_datagram(&mut self, addr: SocketAddr, data: &[u8]) {
        if !self.clients.contains_key(&addr) {
            if self.banned_ips.contains(&addr.ip()) {
                tracing::debug!(%addr, error = %JoinError::Banned(addr.ip().to_string()), "rejecting banned address");
                return;
            }
            let from_same_ip =
                self.clients.keys().filter(|a| a.ip() == addr.ip()).count();
            if from_same_ip >= MAX_CONNECTIONS_PER_IP {
                tracing::debug!(%addr, error = %JoinError::TooManyFromIp, "rejecting new connection");
                return;
            }
            let (mut connection, syn_ack) = brigade_protocol::Connection::accept(addr, self.tick);
            if self.socket.send_to(&syn_ack, addr).is_err() {
                connection.record_send_error();
            }
            self.clients.insert(addr, Client::new(addr, connection));
        }

        let Some(client) = self.clients.get_mut(&addr) else { return };
        let (deliveries, replies) = client.connection.handle_incoming(self.tick, data);
        for reply in &replies {
            if self.socket.send_to(reply, addr).is_err() {
                client.connection.record_send_error();
            }
        }
        for payload in deliveries {
            match decode_message::<ClientMessage>(&payload) {
                Ok(message) => self.handle_client_message(addr, message),
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "dropping malformed client message");
                    if let Some(client) = self.clients.get_mut(&addr) {
                        match e {
                            brigade_protocol::ProtocolError::UnknownMessageTag(_) => {
                                client.connection.record_invalid_message_type();
                            }
                            _ => client.connection.record_invalid_message_payload(),
                        }
                    }
                }
            }
        }
    }

    fn service_connections(&mut self) {
        let mut timed_out = Vec::new();
        let tickrate = self.config.tickrate.max(1) as u64;
        for (addr, client) in self.clients.iter_mut() {
            if client.connection.is_timed_out(self.tick) {
                timed_out.push(*addr);
                continue;
            }
            client.afk_ticks += 1;
            client.decay_spam();
            if client.is_in_game() {
                let rtt_ticks = client.connection.smoothed_rtt_ticks() as u64;
                if let Some(player) = self.world.players.find_mut(client.player_id) {
                    player.latest_rtt_ms = (rtt_ticks * 1000 / tickrate) as u32;
                }
            }
        }
        for addr in timed_out {
            self.drop_client(addr, "timed out");
        }
    }

    fn flush_connections(&mut self) {
        for client in self.clients.values_mut() {
            for datagram in client.connection.tick(self.tick) {
                if self.socket.send_to(&datagram, client.addr).is_err() {
                    client.connection.record_send_error();
                }
            }
        }
    }

    fn send_reliable(&mut self, addr: SocketAddr, message: &ServerMessage) {
        let Some(client) = self.clients.get_mut(&addr) else { return };
        let payload = encode_message(message);
        let datagram = client.connection.send_reliable(self.tick, payload);
        if self.socket.send_to(&datagram, addr).is_err() {
            client.connection.record_send_error();
        }
    }

    // -- Join flow ---------------------------------------------------------

    fn handle_client_message(&mut self, addr: SocketAddr, message: ClientMessage) {
        match message {
            ClientMessage::ServerInfoRequest => self.handle_server_info_request(addr),
            ClientMessage::ResourceDownloadRequest { name_hash } => {
                self.handle_resource_download_request(addr, name_hash)
            }
            ClientMessage::JoinRequest {
                map_hash,
                game_version,
                username,
                update_rate,
                password_key,
                inventory_id,
                inventory_token,
            } => self.handle_join_request(
                addr,
                map_hash,
                game_version,
                username,
                update_rate,
                password_key,
                inventory_id,
                inventory_token,
            ),
            ClientMessage::TeamSelect { team, class } => self.handle_team_select(addr, team, class),
            ClientMessage::UserCmd {
                latest_snapshot_received,
                move_dir,
                aim_dir,
                attack1,
                attack2,
                ..
            } => self.handle_user_cmd(addr, latest_snapshot_received, move_dir, aim_dir, attack1, attack2),
            ClientMessage::ChatMessage { text, team_only } => self.handle_chat_message(addr, text, team_only),
            ClientMessage::RconAuth { token } => self.handle_rcon_auth(addr, token),
            ClientMessage::RconCommand { text } => self.handle_rcon_command(addr, text),
            ClientMessage::Disconnect { reason } => {
                tracing::info!(%addr, %reason, "client disconnected");
                self.drop_client(addr, &reason);
            }
        }
    }

    fn handle_server_info_request(&mut self, addr: SocketAddr) {
        let resources = self.resources.iter().map(|r| r.entry.clone()).collect();
        let message = ServerMessage::ServerInfo {
            map_name: self.config.map.clone(),
            tick_rate: self.config.tickrate,
            player_count: self.clients.values().filter(|c| c.is_in_game()).count() as u16,
            max_players: self.config.max_players,
            password_salt: self.config.password_salt.clone(),
            password_hash_type: if self.config.password_hash.is_empty() { 0 } else { 1 },
            resources,
        };
        if let Some(client) = self.clients.get_mut(&addr) {
            client.stage = JoinStage::DownloadingResources;
        }
        self.send_reliable(addr, &message);
    }

    fn handle_resource_download_request(&mut self, addr: SocketAddr, name_hash: u32) {
        let Some(resource) = self.resources.iter().find(|r| r.entry.name_hash == name_hash) else {
            return;
        };
        let chunk_size = 1024usize;
        let cursor = self.clients.get(&addr).and_then(|c| c.resource_upload_cursor).unwrap_or(0) as usize;
        let end = (cursor + chunk_size).min(resource.bytes.len());
        let message = ServerMessage::ResourceDownloadPart {
            name_hash,
            offset: cursor as u32,
            total_size: resource.bytes.len() as u32,
            data: resource.bytes[cursor..end].to_vec(),
        };
        if let Some(client) = self.clients.get_mut(&addr) {
            client.resource_upload_cursor = if end < resource.bytes.len() { Some(end as u32) } else { None };
        }
        self.send_reliable(addr, &message);
    }

    fn handle_join_request(
        &mut self,
        addr: SocketAddr,
        map_hash: u32,
        game_version: u32,
        username: String,
        update_rate: u16,
        password_key: Vec<u8>,
        inventory_id: u64,
        inventory_token: u64,
    ) {
        if let Err(reason) = self.validate_join(map_hash, game_version, &password_key) {
            self.send_reliable(addr, &ServerMessage::Kicked { reason: reason.to_string() });
            self.drop_client(addr, &reason.to_string());
            return;
        }

        let sanitized = sanitize_username(&username);
        let player_id = self.world.connect_player(sanitized.clone());

        let Some(client) = self.clients.get_mut(&addr) else { return };
        client.username = sanitized;
        client.player_id = player_id;
        client.inventory_id = inventory_id;
        client.inventory_token = inventory_token;
        client.update_interval_ticks = (self.config.tickrate / update_rate.max(1)).max(1) as u32;
        client.stage = JoinStage::AwaitingTeamSelect;

        self.send_reliable(
            addr,
            &ServerMessage::Joined {
                player_id,
                inventory_id,
                inventory_token,
                motd: self.config.motd.clone(),
            },
        );
        self.send_reliable(addr, &ServerMessage::CvarMod { replicated_cvars: self.cvars.replicated() });
        self.send_reliable(addr, &ServerMessage::PleaseSelectTeam);
        tracing::info!(%addr, player_id = player_id.0, "joined");
    }

    fn validate_join(&self, map_hash: u32, game_version: u32, password_key: &[u8]) -> Result<(), JoinError> {
        if game_version != GAME_VERSION {
            return Err(JoinError::VersionMismatch { server: GAME_VERSION, client: game_version });
        }
        let _ = map_hash; // no map-load collaborator in this core; map identity isn't enforced here.
        if !self.config.password_hash.is_empty() {
            let expected = hash_password(&self.config.password_salt, &self.config.password_hash);
            if password_key != expected.as_slice() && password_key != self.config.password_hash.as_slice() {
                return Err(JoinError::WrongPassword);
            }
        }
        let in_game = self.clients.values().filter(|c| c.is_in_game()).count();
        if in_game >= self.config.max_players as usize {
            return Err(JoinError::ServerFull);
        }
        Ok(())
    }

    fn handle_team_select(&mut self, addr: SocketAddr, team: Team, class: PlayerClass) {
        let Some(client) = self.clients.get_mut(&addr) else { return };
        if client.player_id.is_none() {
            return;
        }
        let player_id = client.player_id;
        client.stage = JoinStage::InGame;
        let spawn = Self::team_spawn(team);
        self.world.select_team_and_class(player_id, team, class, spawn);
    }

    fn team_spawn(team: Team) -> Vec2 {
        match team {
            Team::Red => Vec2::new(4, 4),
            Team::Blue => Vec2::new(60, 60),
            _ => Vec2::ZERO,
        }
    }

    fn handle_user_cmd(
        &mut self,
        addr: SocketAddr,
        latest_snapshot_received: u32,
        move_dir: brigade_types::Direction,
        aim_dir: brigade_types::Direction,
        attack1: bool,
        attack2: bool,
    ) {
        let Some(client) = self.clients.get_mut(&addr) else { return };
        if !client.is_in_game() {
            return;
        }
        client.afk_ticks = 0;
        client.latest_snapshot_acked = Some(latest_snapshot_received);
        let player_id = client.player_id;
        if let Some(player) = self.world.players.find_mut(player_id) {
            player.move_direction = move_dir;
            player.aim_direction = aim_dir;
            player.attack1 = attack1;
            player.attack2 = attack2;
        }
    }

    fn handle_chat_message(&mut self, addr: SocketAddr, text: String, team_only: bool) {
        let over_limit = {
            let Some(client) = self.clients.get_mut(&addr) else { return };
            if !client.is_in_game() {
                return;
            }
            client.record_spam_message()
        };
        if over_limit {
            self.kick(addr, "spam");
            return;
        }

        let Some(client) = self.clients.get(&addr) else { return };
        let from_name = client.username.clone();
        let player_id = client.player_id;
        let scope = if team_only {
            let team = self.world.players.find(player_id).map_or(Team::Spectators, |p| p.team);
            MessageScope::Team(team)
        } else {
            MessageScope::All
        };
        self.world.broadcast_chat(format!("{from_name}: {text}"), scope);
    }

    fn handle_rcon_auth(&mut self, addr: SocketAddr, token: String) {
        let Some(client) = self.clients.get_mut(&addr) else { return };
        let accepted = match &self.config.rcon_password {
            Some(expected) if !expected.is_empty() => token == *expected,
            _ => false,
        };
        client.rcon_token = if accepted { Some(token) } else { None };
        self.send_reliable(
            addr,
            &ServerMessage::RconReply { text: if accepted { "authenticated".into() } else { "denied".into() } },
        );
    }

    fn handle_rcon_command(&mut self, addr: SocketAddr, text: String) {
        let authed = self.clients.get(&addr).is_some_and(|c| c.rcon_token.is_some());
        if !authed || text.len() > RCON_MAX_PACKET_LEN {
            return;
        }
        // Shares the chat spam counter: spec.md requires rcon rate-limits
        // "identical to ordinary chat".
        let over_limit = self.clients.get_mut(&addr).is_some_and(|c| c.record_spam_message());
        if over_limit {
            self.kick(addr, "spam");
            return;
        }
        let reply = self.run_rcon_command(&text);
        self.send_reliable(addr, &ServerMessage::RconReply { text: reply });
    }

    /// A minimal rcon command language covering the non-simulation half of
    /// the control surface: cvar get/set, kick, ban/unban, say. Simulation
    /// operations (damage, teleport, score) belong to scripting through
    /// `ScriptControlSurface`, not rcon.
    fn run_rcon_command(&mut self, text: &str) -> String {
        let mut parts = text.split_whitespace();
        match parts.next() {
            Some("cvar_get") => {
                let Some(name) = parts.next() else { return "usage: cvar_get <name>".into() };
                self.cvars.get(name).map(|v| v.to_string()).unwrap_or_else(|| "unknown cvar".into())
            }
            Some("cvar_set") => {
                let (Some(name), Some(value)) = (parts.next(), parts.next()) else {
                    return "usage: cvar_set <name> <value>".into();
                };
                match self.cvars.get(name) {
                    Some(CvarValue::Int(_)) => match value.parse::<i64>() {
                        Ok(i) => match self.cvars.set(name, CvarValue::Int(i)) {
                            Ok(()) => "ok".into(),
                            Err(e) => e.to_string(),
                        },
                        Err(_) => "not an integer".into(),
                    },
                    Some(CvarValue::Float(_)) => match value.parse::<f64>() {
                        Ok(f) => match self.cvars.set(name, CvarValue::Float(f)) {
                            Ok(()) => "ok".into(),
                            Err(e) => e.to_string(),
                        },
                        Err(_) => "not a float".into(),
                    },
                    Some(CvarValue::Bool(_)) => match value.parse::<bool>() {
                        Ok(b) => match self.cvars.set(name, CvarValue::Bool(b)) {
                            Ok(()) => "ok".into(),
                            Err(e) => e.to_string(),
                        },
                        Err(_) => "not a bool".into(),
                    },
                    Some(CvarValue::String(_)) => match self.cvars.set(name, CvarValue::String(value.to_string())) {
                        Ok(()) => "ok".into(),
                        Err(e) => e.to_string(),
                    },
                    None => "unknown cvar".into(),
                }
            }
            Some("kick") => {
                let Some(name) = parts.next() else { return "usage: kick <name>".into() };
                self.kick_by_name(name, "kicked by rcon")
            }
            Some("ban") => {
                let Some(ip) = parts.next().and_then(|s| s.parse().ok()) else {
                    return "usage: ban <ip>".into();
                };
                self.ban_ip(ip);
                "ok".into()
            }
            Some("unban") => {
                let Some(ip) = parts.next().and_then(|s| s.parse().ok()) else {
                    return "usage: unban <ip>".into();
                };
                self.unban_ip(ip);
                "ok".into()
            }
            Some("say") => {
                let text: String = parts.collect::<Vec<_>>().join(" ");
                self.world.broadcast_chat(text, MessageScope::All);
                "ok".into()
            }
            _ => "unknown command".into(),
        }
    }

    // -- Bans & kicks --------------------------------------------------------

    pub fn ban_ip(&mut self, ip: IpAddr) {
        self.banned_ips.insert(ip);
        let addrs: Vec<SocketAddr> = self.clients.keys().filter(|a| a.ip() == ip).copied().collect();
        for addr in addrs {
            self.kick(addr, "banned");
        }
    }

    pub fn unban_ip(&mut self, ip: IpAddr) {
        self.banned_ips.remove(&ip);
    }

    pub fn banned_ips(&self) -> Vec<IpAddr> {
        self.banned_ips.iter().copied().collect()
    }

    fn kick_by_name(&mut self, name: &str, reason: &str) -> String {
        let addr = self.clients.iter().find(|(_, c)| c.username == name).map(|(addr, _)| *addr);
        match addr {
            Some(addr) => {
                self.kick(addr, reason);
                "ok".into()
            }
            None => "no such player".into(),
        }
    }

    pub fn kick(&mut self, addr: SocketAddr, reason: &str) {
        self.send_reliable(addr, &ServerMessage::Kicked { reason: reason.to_string() });
        self.drop_client(addr, reason);
    }

    fn drop_client(&mut self, addr: SocketAddr, reason: &str) {
        if let Some(client) = self.clients.remove(&addr) {
            tracing::info!(%addr, %reason, "client removed");
            if !client.player_id.is_none() {
                self.world.disconnect_player(client.player_id);
            }
        }
    }

    // -- Per-tick world event/snapshot relay --------------------------------

    fn dispatch_world_events(&mut self) {
        for event in self.world.drain_events() {
            match event {
                WorldEvent::Chat { text, scope } => self.relay_chat(text, scope),
                WorldEvent::Sound { sound_id, scope } => self.relay_sound(sound_id, scope),
                WorldEvent::FlagCaptured { team, flag_name } => {
                    tracing::info!(team = team.name(), flag = %flag_name, "flag captured");
                }
                WorldEvent::RoundEnded { winner } => {
                    tracing::info!(?winner, "round ended");
                }
            }
        }
    }

    fn relay_chat(&mut self, text: String, scope: MessageScope) {
        let team_only = matches!(scope, MessageScope::Team(_));
        let recipients = self.recipients_for_scope(scope);
        for addr in recipients {
            self.send_reliable(addr, &ServerMessage::ChatBroadcast { from_name: String::new(), text: text.clone(), team_only });
        }
    }

    fn relay_sound(&mut self, sound_id: SoundId, scope: SoundScope) {
        let (position, team_scope) = match scope {
            SoundScope::Positional(p) => (p, None),
            SoundScope::Team(team, p) => (p, Some(team)),
            SoundScope::Global => (Vec2::ZERO, None),
        };
        let message = ServerMessage::SoundEvent { sound_id, position, team_scope };
        let addrs: Vec<SocketAddr> = self.clients.iter().filter(|(_, c)| c.is_in_game()).map(|(a, _)| *a).collect();
        for addr in addrs {
            self.send_reliable(addr, &message);
        }
    }

    fn recipients_for_scope(&self, scope: MessageScope) -> Vec<SocketAddr> {
        match scope {
            MessageScope::All => {
                self.clients.iter().filter(|(_, c)| c.is_in_game()).map(|(a, _)| *a).collect()
            }
            MessageScope::Team(team) => self
                .clients
                .iter()
                .filter(|(_, c)| c.is_in_game())
                .filter(|(_, c)| self.world.players.find(c.player_id).is_some_and(|p| p.team == team))
                .map(|(a, _)| *a)
                .collect(),
            MessageScope::Player(player_id) => self
                .clients
                .iter()
                .filter(|(_, c)| c.player_id == player_id)
                .map(|(a, _)| *a)
                .collect(),
        }
    }

    fn send_due_snapshots(&mut self) {
        let tick = self.tick;
        let addrs: Vec<SocketAddr> = self.clients.keys().copied().collect();
        for addr in addrs {
            let (player_id, due, acked) = {
                let Some(client) = self.clients.get_mut(&addr) else { continue };
                if !client.is_in_game() {
                    continue;
                }
                (client.player_id, client.due_for_update(), client.latest_snapshot_acked)
            };
            if !due {
                continue;
            }
            let snapshot = self.world.take_snapshot(player_id);
            let Some(client) = self.clients.get_mut(&addr) else { continue };
            let (body, base_tick) = brigade_world::build_update(&client.snapshot_ring, &snapshot, acked);
            client.snapshot_ring.push(snapshot);
            let message = match base_tick {
                Some(base_tick) => ServerMessage::SnapshotDelta { base_tick, tick, body },
                None => ServerMessage::SnapshotFull { tick, body },
            };
            self.send_reliable(addr, &message);
        }
    }
}

fn round_seconds_for(cvars: &CvarRegistry) -> u32 {
    match cvars.get("sv_round_seconds") {
        Some(CvarValue::Int(i)) => (*i).max(0) as u32,
        _ => 600,
    }
}

fn register_default_cvars(cvars: &mut CvarRegistry, config: &ServerConfig) {
    let _ = cvars.register("sv_round_seconds", CvarValue::Int(600), CvarFlags::ARCHIVE | CvarFlags::REPLICATED);
    let _ = cvars.register("sv_hostname", CvarValue::String(config.hostname.clone()), CvarFlags::ARCHIVE | CvarFlags::REPLICATED);
    let _ = cvars.register("sv_cheats", CvarValue::Bool(false), CvarFlags::NONE);
    let _ = cvars.register("sv_motd", CvarValue::String(config.motd.clone()), CvarFlags::ARCHIVE);
}

/// Printable ASCII only, control characters and a short blocklist stripped,
/// length-capped, matching §4.8's "sanitized printable ASCII minus
/// blocklist, length-capped" rule.
fn sanitize_username(raw: &str) -> String {
    const BLOCKLIST: [&str; 2] = ["admin", "server"];
    const MAX_LEN: usize = 24;
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_graphic() || *c == ' ').take(MAX_LEN).collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() || BLOCKLIST.contains(&trimmed.to_lowercase().as_str()) {
        "player".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_control_characters_and_caps_length() {
        let raw = "A\u{7}dmin\u{1}name_that_is_definitely_too_long_for_the_cap";
        let cleaned = sanitize_username(raw);
        assert!(cleaned.len() <= 24);
        assert!(cleaned.chars().all(|c| c.is_ascii_graphic() || c == ' '));
    }

    #[test]
    fn sanitize_rejects_blocklisted_names() {
        assert_eq!(sanitize_username("admin"), "player");
        assert_eq!(sanitize_username("Server"), "player");
    }

    #[test]
    fn hash_password_is_deterministic() {
        let a = hash_password(b"salt", b"secret");
        let b = hash_password(b"salt", b"secret");
        assert_eq!(a, b);
    }
}
