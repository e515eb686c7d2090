//! Wire protocol shared by the session server and native clients.
//!
//! Holds the default world geometry, the closed set of inbound and outbound
//! events, the snapshot projections sent every tick, and the datagram codec.

pub mod codec;
pub mod snapshot;

pub use codec::{CodecError, WireFormat};
pub use snapshot::{
    ActorView, AiMetadata, AiSnapshot, Countdown, GameData, Metadata, PipeView, Position,
    Snapshot,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PROTOCOL_VERSION: u32 = 1;

pub const SCREEN_WIDTH: f32 = 288.0;
pub const SCREEN_HEIGHT: f32 = 512.0;
pub const GROUND_Y: f32 = 400.0;
pub const PIPE_WIDTH: f32 = 52.0;
pub const PIPE_GAP: f32 = 150.0;
pub const PIPE_SPACING: f32 = 300.0;
/// Pixels per second the obstacle field scrolls left.
pub const SCROLL_SPEED: f32 = 200.0;
/// Downward acceleration in pixels per second squared.
pub const GRAVITY: f32 = 400.0;
pub const FLAP_VELOCITY: f32 = -280.0;
pub const MAX_FALL_SPEED: f32 = 400.0;
pub const MAX_ROTATION_DEG: f32 = 30.0;
pub const BIRD_WIDTH: f32 = 34.0;
pub const BIRD_HEIGHT: f32 = 24.0;
pub const BIRD_X: f32 = 50.0;
pub const TICK_RATE: u32 = 40;
pub const COUNTDOWN_SECS: f32 = 3.0;

pub type PlayerId = u32;

/// What an actor does on a given tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    None,
    Flap,
}

impl TryFrom<u8> for Action {
    type Error = u8;

    /// Browsers send `0` for "do nothing" and `1` for a flap.
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Action::None),
            1 => Ok(Action::Flap),
            other => Err(other),
        }
    }
}

/// Events a client may send to the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ClientEvent {
    Connect {
        client_version: u32,
    },
    Disconnect,
    Heartbeat,

    JoinGame {
        username: String,
        #[serde(rename = "isAdmin", default)]
        is_admin: bool,
    },
    StartGame,
    ResetGame,
    ToggleTestMode {
        enabled: bool,
    },
    UpdatePosition {
        #[serde(rename = "playerId")]
        player_id: PlayerId,
        action: u8,
    },
    GetAllPlayers,

    StartAiGame {
        username: String,
    },
    UpdateAiPosition {
        action: u8,
    },
    ResetAiGame,
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Connect { .. } => "connect",
            ClientEvent::Disconnect => "disconnect",
            ClientEvent::Heartbeat => "heartbeat",
            ClientEvent::JoinGame { .. } => "join_game",
            ClientEvent::StartGame => "start_game",
            ClientEvent::ResetGame => "reset_game",
            ClientEvent::ToggleTestMode { .. } => "toggle_test_mode",
            ClientEvent::UpdatePosition { .. } => "update_position",
            ClientEvent::GetAllPlayers => "get_all_players",
            ClientEvent::StartAiGame { .. } => "start_ai_game",
            ClientEvent::UpdateAiPosition { .. } => "update_ai_position",
            ClientEvent::ResetAiGame => "reset_ai_game",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LobbyEntry {
    pub username: String,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

/// Scoreboard row, keyed by player id in `players_info`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub username: String,
    pub score: f32,
    pub alive: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Winner {
    pub username: String,
    pub score: f32,
}

pub type PlayersInfo = BTreeMap<String, PlayerInfo>;

/// Events the server sends to clients.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ServerEvent {
    Connected {
        client_id: PlayerId,
    },
    Disconnected {
        reason: String,
    },

    LobbyUpdate {
        players: Vec<LobbyEntry>,
    },
    GameStarted,
    GameState {
        game_data: Snapshot,
        players_info: PlayersInfo,
    },
    GameOver {
        winner: Option<Winner>,
    },
    GameReset,
    TestModeStatus {
        enabled: bool,
    },
    AllPlayersInfo(PlayersInfo),

    AiGameStarted,
    AiGameState(AiSnapshot),
    AiGameOver {
        winner: Option<Winner>,
    },
    AiGameReset,
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::Disconnected { .. } => "disconnected",
            ServerEvent::LobbyUpdate { .. } => "lobby_update",
            ServerEvent::GameStarted => "game_started",
            ServerEvent::GameState { .. } => "game_state",
            ServerEvent::GameOver { .. } => "game_over",
            ServerEvent::GameReset => "game_reset",
            ServerEvent::TestModeStatus { .. } => "test_mode_status",
            ServerEvent::AllPlayersInfo(_) => "all_players_info",
            ServerEvent::AiGameStarted => "ai_game_started",
            ServerEvent::AiGameState(_) => "ai_game_state",
            ServerEvent::AiGameOver { .. } => "ai_game_over",
            ServerEvent::AiGameReset => "ai_game_reset",
        }
    }
}
