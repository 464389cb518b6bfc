//! Text command protocol for controller servers.
//!
//! One command per line: `start` and `stop` bound an episode, `rate <millis>`
//! reconfigures the half-cycle cadence. Parsing is whitespace tolerant.

use std::str::FromStr;
use std::time::Duration;

/// A parsed control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Begin an episode.
    Start,
    /// End the active episode.
    Stop,
    /// Set the half-cycle duration.
    Rate(Duration),
}

/// Command parsing errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Input was empty or whitespace only.
    Empty,
    /// Unrecognized command word.
    Unknown(String),
    /// `rate` argument was missing, non-numeric, or zero.
    InvalidRate,
}

impl core::fmt::Display for CommandError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CommandError::Empty => write!(f, "empty command"),
            CommandError::Unknown(word) => write!(f, "unknown command: {word}"),
            CommandError::InvalidRate => {
                write!(f, "rate requires a positive millisecond argument")
            }
        }
    }
}

impl std::error::Error for CommandError {}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut facets = input.split_whitespace();
        let word = facets.next().ok_or(CommandError::Empty)?;

        match word {
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "rate" => {
                let millis: u64 = facets
                    .next()
                    .and_then(|arg| arg.parse().ok())
                    .ok_or(CommandError::InvalidRate)?;
                if millis == 0 {
                    return Err(CommandError::InvalidRate);
                }
                Ok(Command::Rate(Duration::from_millis(millis)))
            }
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}
