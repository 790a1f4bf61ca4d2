use brigade_codec::{ByteSink, CountStream, Decode, Encode, InputStream, OutputStream};
use brigade_types::{Direction, PlayerClass, PlayerId, SoundId, Team, Vec2};

use crate::ProtocolError;

/// One entry of the resource manifest a server advertises in `ServerInfo`.
/// The client diffs this against its local files by hash and requests only
/// what's missing or mismatched.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceManifestEntry {
    pub name: String,
    pub name_hash: u32,
    pub file_hash: u32,
    pub size: u32,
    pub is_text: bool,
    pub can_download: bool,
}

impl Encode for ResourceManifestEntry {
    fn encode<S: ByteSink>(&self, out: &mut S) {
        self.name.encode(out);
        self.name_hash.encode(out);
        self.file_hash.encode(out);
        self.size.encode(out);
        self.is_text.encode(out);
        self.can_download.encode(out);
    }
}

impl Decode for ResourceManifestEntry {
    fn decode(input: &mut InputStream) -> Option<Self> {
        Some(ResourceManifestEntry {
            name: String::decode(input)?,
            name_hash: u32::decode(input)?,
            file_hash: u32::decode(input)?,
            size: u32::decode(input)?,
            is_text: bool::decode(input)?,
            can_download: bool::decode(input)?,
        })
    }
}

/// Messages a client sends inside a reliable or unreliable channel payload.
/// Wire shape: one tag byte followed by the variant's fields in declaration
/// order, exactly like the rest of the codec.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    ServerInfoRequest,
    ResourceDownloadRequest {
        name_hash: u32,
    },
    JoinRequest {
        map_hash: u32,
        game_version: u32,
        username: String,
        update_rate: u16,
        password_key: Vec<u8>,
        inventory_id: u64,
        inventory_token: u64,
    },
    TeamSelect {
        team: Team,
        class: PlayerClass,
    },
    UserCmd {
        tick: u32,
        latest_snapshot_received: u32,
        move_dir: Direction,
        aim_dir: Direction,
        attack1: bool,
        attack2: bool,
        buttons: u8,
    },
    ChatMessage {
        text: String,
        team_only: bool,
    },
    RconAuth {
        token: String,
    },
    RconCommand {
        text: String,
    },
    Disconnect {
        reason: String,
    },
}

impl ClientMessage {
    fn tag(&self) -> u8 {
        match self {
            ClientMessage::ServerInfoRequest => 0,
            ClientMessage::ResourceDownloadRequest { .. } => 1,
            ClientMessage::JoinRequest { .. } => 2,
            ClientMessage::TeamSelect { .. } => 3,
            ClientMessage::UserCmd { .. } => 4,
            ClientMessage::ChatMessage { .. } => 5,
            ClientMessage::RconAuth { .. } => 6,
            ClientMessage::RconCommand { .. } => 7,
            ClientMessage::Disconnect { .. } => 8,
        }
    }
}

impl Encode for ClientMessage {
    fn encode<S: ByteSink>(&self, out: &mut S) {
        self.tag().encode(out);
        match self {
            ClientMessage::ServerInfoRequest => {}
            ClientMessage::ResourceDownloadRequest { name_hash } => name_hash.encode(out),
            ClientMessage::JoinRequest {
                map_hash,
                game_version,
                username,
                update_rate,
                password_key,
                inventory_id,
                inventory_token,
            } => {
                map_hash.encode(out);
                game_version.encode(out);
                username.encode(out);
                update_rate.encode(out);
                password_key.encode(out);
                inventory_id.encode(out);
                inventory_token.encode(out);
            }
            ClientMessage::TeamSelect { team, class } => {
                team.encode(out);
                class.encode(out);
            }
            ClientMessage::UserCmd {
                tick,
                latest_snapshot_received,
                move_dir,
                aim_dir,
                attack1,
                attack2,
                buttons,
            } => {
                tick.encode(out);
                latest_snapshot_received.encode(out);
                move_dir.encode(out);
                aim_dir.encode(out);
                attack1.encode(out);
                attack2.encode(out);
                buttons.encode(out);
            }
            ClientMessage::ChatMessage { text, team_only } => {
                text.encode(out);
                team_only.encode(out);
            }
            ClientMessage::RconAuth { token } => token.encode(out),
            ClientMessage::RconCommand { text } => text.encode(out),
            ClientMessage::Disconnect { reason } => reason.encode(out),
        }
    }
}

impl Decode for ClientMessage {
    fn decode(input: &mut InputStream) -> Option<Self> {
        let tag = u8::decode(input)?;
        let msg = match tag {
            0 => ClientMessage::ServerInfoRequest,
            1 => ClientMessage::ResourceDownloadRequest { name_hash: u32::decode(input)? },
            2 => ClientMessage::JoinRequest {
                map_hash: u32::decode(input)?,
                game_version: u32::decode(input)?,
                username: String::decode(input)?,
                update_rate: u16::decode(input)?,
                password_key: Vec::<u8>::decode(input)?,
                inventory_id: u64::decode(input)?,
                inventory_token: u64::decode(input)?,
            },
            3 => ClientMessage::TeamSelect { team: Team::decode(input)?, class: PlayerClass::decode(input)? },
            4 => ClientMessage::UserCmd {
                tick: u32::decode(input)?,
                latest_snapshot_received: u32::decode(input)?,
                move_dir: Direction::decode(input)?,
                aim_dir: Direction::decode(input)?,
                attack1: bool::decode(input)?,
                attack2: bool::decode(input)?,
                buttons: u8::decode(input)?,
            },
            5 => ClientMessage::ChatMessage { text: String::decode(input)?, team_only: bool::decode(input)? },
            6 => ClientMessage::RconAuth { token: String::decode(input)? },
            7 => ClientMessage::RconCommand { text: String::decode(input)? },
            8 => ClientMessage::Disconnect { reason: String::decode(input)? },
            other => {
                input.invalidate();
                let _ = other;
                return None;
            }
        };
        Some(msg)
    }
}

/// Messages a server sends to a single client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    ServerInfo {
        map_name: String,
        tick_rate: u16,
        player_count: u16,
        max_players: u16,
        password_salt: Vec<u8>,
        password_hash_type: u8,
        resources: Vec<ResourceManifestEntry>,
    },
    ResourceDownloadPart {
        name_hash: u32,
        offset: u32,
        total_size: u32,
        data: Vec<u8>,
    },
    Joined {
        player_id: PlayerId,
        inventory_id: u64,
        inventory_token: u64,
        motd: String,
    },
    CvarMod {
        replicated_cvars: Vec<(String, String)>,
    },
    PleaseSelectTeam,
    SnapshotFull {
        tick: u32,
        body: Vec<u8>,
    },
    SnapshotDelta {
        base_tick: u32,
        tick: u32,
        body: Vec<u8>,
    },
    ChatBroadcast {
        from_name: String,
        text: String,
        team_only: bool,
    },
    SoundEvent {
        sound_id: SoundId,
        position: Vec2,
        team_scope: Option<Team>,
    },
    RconReply {
        text: String,
    },
    Kicked {
        reason: String,
    },
}

impl ServerMessage {
    fn tag(&self) -> u8 {
        match self {
            ServerMessage::ServerInfo { .. } => 0,
            ServerMessage::ResourceDownloadPart { .. } => 1,
            ServerMessage::Joined { .. } => 2,
            ServerMessage::CvarMod { .. } => 3,
            ServerMessage::PleaseSelectTeam => 4,
            ServerMessage::SnapshotFull { .. } => 5,
            ServerMessage::SnapshotDelta { .. } => 6,
            ServerMessage::ChatBroadcast { .. } => 7,
            ServerMessage::SoundEvent { .. } => 8,
            ServerMessage::RconReply { .. } => 9,
            ServerMessage::Kicked { .. } => 10,
        }
    }
}

impl Encode for ServerMessage {
    fn encode<S: ByteSink>(&self, out: &mut S) {
        self.tag().encode(out);
        match self {
            ServerMessage::ServerInfo {
                map_name,
                tick_rate,
                player_count,
                max_players,
                password_salt,
                password_hash_type,
                resources,
            } => {
                map_name.encode(out);
                tick_rate.encode(out);
                player_count.encode(out);
                max_players.encode(out);
                password_salt.encode(out);
                password_hash_type.encode(out);
                resources.encode(out);
            }
            ServerMessage::ResourceDownloadPart { name_hash, offset, total_size, data } => {
                name_hash.encode(out);
                offset.encode(out);
                total_size.encode(out);
                data.encode(out);
            }
            ServerMessage::Joined { player_id, inventory_id, inventory_token, motd } => {
                player_id.encode(out);
                inventory_id.encode(out);
                inventory_token.encode(out);
                motd.encode(out);
            }
            ServerMessage::CvarMod { replicated_cvars } => replicated_cvars.encode(out),
            ServerMessage::PleaseSelectTeam => {}
            ServerMessage::SnapshotFull { tick, body } => {
                tick.encode(out);
                body.encode(out);
            }
            ServerMessage::SnapshotDelta { base_tick, tick, body } => {
                base_tick.encode(out);
                tick.encode(out);
                body.encode(out);
            }
            ServerMessage::ChatBroadcast { from_name, text, team_only } => {
                from_name.encode(out);
                text.encode(out);
                team_only.encode(out);
            }
            ServerMessage::SoundEvent { sound_id, position, team_scope } => {
                sound_id.encode(out);
                position.encode(out);
                team_scope.encode(out);
            }
            ServerMessage::RconReply { text } => text.encode(out),
            ServerMessage::Kicked { reason } => reason.encode(out),
        }
    }
}

impl Decode for ServerMessage {
    fn decode(input: &mut InputStream) -> Option<Self> {
        let tag = u8::decode(input)?;
        let msg = match tag {
            0 => ServerMessage::ServerInfo {
                map_name: String::decode(input)?,
                tick_rate: u16::decode(input)?,
                player_count: u16::decode(input)?,
                max_players: u16::decode(input)?,
                password_salt: Vec::<u8>::decode(input)?,
                password_hash_type: u8::decode(input)?,
                resources: Vec::<ResourceManifestEntry>::decode(input)?,
            },
            1 => ServerMessage::ResourceDownloadPart {
                name_hash: u32::decode(input)?,
                offset: u32::decode(input)?,
                total_size: u32::decode(input)?,
                data: Vec::<u8>::decode(input)?,
            },
            2 => ServerMessage::Joined {
                player_id: PlayerId::decode(input)?,
                inventory_id: u64::decode(input)?,
                inventory_token: u64::decode(input)?,
                motd: String::decode(input)?,
            },
            3 => ServerMessage::CvarMod {
                replicated_cvars: Vec::<(String, String)>::decode(input)?,
            },
            4 => ServerMessage::PleaseSelectTeam,
            5 => ServerMessage::SnapshotFull { tick: u32::decode(input)?, body: Vec::<u8>::decode(input)? },
            6 => ServerMessage::SnapshotDelta {
                base_tick: u32::decode(input)?,
                tick: u32::decode(input)?,
                body: Vec::<u8>::decode(input)?,
            },
            7 => ServerMessage::ChatBroadcast {
                from_name: String::decode(input)?,
                text: String::decode(input)?,
                team_only: bool::decode(input)?,
            },
            8 => ServerMessage::SoundEvent {
                sound_id: SoundId::decode(input)?,
                position: Vec2::decode(input)?,
                team_scope: Option::<Team>::decode(input)?,
            },
            9 => ServerMessage::RconReply { text: String::decode(input)? },
            10 => ServerMessage::Kicked { reason: String::decode(input)? },
            other => {
                input.invalidate();
                let _ = other;
                return None;
            }
        };
        Some(msg)
    }
}

/// Encodes a message into a fresh byte vector.
pub fn encode_message<M: Encode>(message: &M) -> Vec<u8> {
    let mut out = OutputStream::new();
    message.encode(&mut out);
    out.into_vec()
}

/// Decodes a message from a complete buffer, rejecting both short reads and
/// trailing garbage — a payload is either exactly one message or malformed.
pub fn decode_message<M: Decode>(bytes: &[u8]) -> Result<M, ProtocolError> {
    let mut input = InputStream::new(bytes);
    let message = M::decode(&mut input).ok_or(ProtocolError::MalformedPacket)?;
    if !input.valid() {
        return Err(ProtocolError::MalformedPacket);
    }
    if !input.eof() {
        return Err(ProtocolError::BodyOverrun);
    }
    Ok(message)
}

/// Size in bytes a message would occupy on the wire, without allocating the
/// bytes themselves.
pub fn encoded_len<M: Encode>(message: &M) -> usize {
    let mut count = CountStream::new();
    message.encode(&mut count);
    count.size()
}
