use shared::PlayerId;
use thiserror::Error;

/// Reasons an inbound command is rejected.
///
/// None of these are fatal: the tick loop logs them and drops the command,
/// leaving every session untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GameError {
    #[error("player {player} may not {command}: admin only")]
    InvalidCommand {
        player: PlayerId,
        command: &'static str,
    },
    #[error("unknown actor {0}")]
    UnknownActor(PlayerId),
    #[error("cannot {command} while {status}")]
    InvalidTransition {
        command: &'static str,
        status: &'static str,
    },
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GameError::InvalidCommand {
            player: 4,
            command: "start_game",
        };
        assert_eq!(err.to_string(), "player 4 may not start_game: admin only");

        let err = GameError::InvalidTransition {
            command: "start_game",
            status: "running",
        };
        assert_eq!(err.to_string(), "cannot start_game while running");

        assert_eq!(GameError::UnknownActor(9).to_string(), "unknown actor 9");
    }
}
