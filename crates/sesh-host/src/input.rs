//! Keyboard commands.
//!
//! `1` create, `2` find, `3 <n>` join result n, `4` destroy, `s` snapshot,
//! `h` help, `q` quit.

use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    Create,
    Find,
    Join(usize),
    Destroy,
    Snapshot,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("empty input")]
    Empty,
    #[error("unknown command '{0}' (h for help)")]
    Unknown(String),
    #[error("join needs a result index, e.g. '3 0'")]
    MissingIndex,
    #[error("'{0}' is not a result index")]
    BadIndex(String),
}

pub const HELP: &str = "1 create | 2 find | 3 <n> join result n | 4 destroy | s snapshot | q quit";

impl FromStr for HostCommand {
    type Err = InputError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(key) = parts.next() else {
            return Err(InputError::Empty);
        };
        match key.to_ascii_lowercase().as_str() {
            "1" | "create" => Ok(Self::Create),
            "2" | "find" => Ok(Self::Find),
            "3" | "join" => {
                let raw = parts.next().ok_or(InputError::MissingIndex)?;
                raw.parse()
                    .map(Self::Join)
                    .map_err(|_| InputError::BadIndex(raw.to_string()))
            }
            "4" | "destroy" => Ok(Self::Destroy),
            "s" | "snapshot" => Ok(Self::Snapshot),
            "h" | "help" | "?" => Ok(Self::Help),
            "q" | "quit" | "exit" => Ok(Self::Quit),
            other => Err(InputError::Unknown(other.to_string())),
        }
    }
}
