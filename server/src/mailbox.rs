//! Commands buffered between ticks.
//!
//! Connection handling only ever appends here; the tick loop drains the whole
//! mailbox at the next tick boundary and applies it in arrival order. Flaps are
//! kept apart from other commands: an actor gets at most one flap per tick no
//! matter how many arrive.

use shared::PlayerId;
use std::collections::HashSet;

/// A validated inbound command awaiting the next tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Join {
        player: PlayerId,
        username: String,
        is_admin: bool,
    },
    Leave(PlayerId),
    Start(PlayerId),
    Reset(PlayerId),
    SetTestMode {
        player: PlayerId,
        enabled: bool,
    },
    GetAllPlayers(PlayerId),
    StartAi {
        player: PlayerId,
        username: String,
    },
    ResetAi(PlayerId),
}

impl Command {
    pub fn player(&self) -> PlayerId {
        match self {
            Command::Join { player, .. }
            | Command::SetTestMode { player, .. }
            | Command::StartAi { player, .. } => *player,
            Command::Leave(player)
            | Command::Start(player)
            | Command::Reset(player)
            | Command::GetAllPlayers(player)
            | Command::ResetAi(player) => *player,
        }
    }
}

/// Everything collected for one tick.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Drained {
    pub commands: Vec<Command>,
    pub flaps: HashSet<PlayerId>,
    pub ai_flaps: HashSet<PlayerId>,
}

#[derive(Debug, Default)]
pub struct Mailbox {
    pending: Drained,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.pending.commands.push(command);
    }

    /// Marks a multiplayer flap for `player`. Repeats within a tick collapse.
    pub fn flap(&mut self, player: PlayerId) {
        self.pending.flaps.insert(player);
    }

    pub fn ai_flap(&mut self, player: PlayerId) {
        self.pending.ai_flaps.insert(player);
    }

    /// Drops everything queued by `player`, used when its connection goes away.
    pub fn forget(&mut self, player: PlayerId) {
        self.pending.commands.retain(|command| command.player() != player);
        self.pending.flaps.remove(&player);
        self.pending.ai_flaps.remove(&player);
    }

    pub fn len(&self) -> usize {
        self.pending.commands.len() + self.pending.flaps.len() + self.pending.ai_flaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes the whole mailbox, leaving it empty for the next tick.
    pub fn drain(&mut self) -> Drained {
        std::mem::take(&mut self.pending)
    }
}
