pub mod delete;
pub mod executable;
pub mod exists;
pub mod get;
pub mod set;

use bytes::Bytes;
use std::str::FromStr;
use std::vec;
use strum_macros::{EnumString, IntoStaticStr};
use thiserror::Error as ThisError;

use crate::commands::executable::Executable;
use crate::frame::{Frame, Request};
use crate::store::Store;

use delete::Delete;
use exists::Exists;
use get::Get;
use set::Set;

#[derive(Debug, PartialEq)]
pub enum Command {
    Delete(Delete),
    Exists(Exists),
    Get(Get),
    Set(Set),
}

impl Command {
    pub fn name(&self) -> &'static str {
        let kind = match self {
            Command::Delete(_) => CommandKind::Delete,
            Command::Exists(_) => CommandKind::Exists,
            Command::Get(_) => CommandKind::Get,
            Command::Set(_) => CommandKind::Set,
        };
        kind.into()
    }
}

impl Executable for Command {
    fn exec(self, store: &Store) -> Frame {
        match self {
            Command::Delete(cmd) => cmd.exec(store),
            Command::Exists(cmd) => cmd.exec(store),
            Command::Get(cmd) => cmd.exec(store),
            Command::Set(cmd) => cmd.exec(store),
        }
    }
}

/// Command names understood by the server, matched regardless of ASCII case.
#[derive(Clone, Copy, Debug, PartialEq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
enum CommandKind {
    Delete,
    Exists,
    Get,
    Set,
}

impl TryFrom<Request> for Command {
    type Error = CommandError;

    fn try_from(request: Request) -> Result<Self, Self::Error> {
        let mut parts = request.0.into_iter();
        let name = parts.next().ok_or(CommandError::EmptyCommand)?;

        let kind = std::str::from_utf8(&name)
            .ok()
            .and_then(|name| CommandKind::from_str(name).ok())
            .ok_or_else(|| CommandError::UnknownCommand {
                command: String::from_utf8_lossy(&name).into_owned(),
            })?;

        let parser = &mut CommandParser {
            command: kind.into(),
            parts,
        };

        let command = match kind {
            CommandKind::Delete => Delete::try_from(&mut *parser).map(Command::Delete),
            CommandKind::Exists => Exists::try_from(&mut *parser).map(Command::Exists),
            CommandKind::Get => Get::try_from(&mut *parser).map(Command::Get),
            CommandKind::Set => Set::try_from(&mut *parser).map(Command::Set),
        }?;

        parser.finish()?;

        Ok(command)
    }
}

/// Walks the arguments of a single command, turning a missing or surplus argument into an arity
/// error for that command.
pub struct CommandParser {
    command: &'static str,
    parts: vec::IntoIter<Bytes>,
}

impl CommandParser {
    fn next_bytes(&mut self) -> Result<Bytes, CommandError> {
        self.parts.next().ok_or(CommandError::WrongArity {
            command: self.command,
        })
    }

    /// Like `next_bytes`, rejecting the empty key.
    fn next_key(&mut self) -> Result<Bytes, CommandError> {
        let key = self.next_bytes()?;
        if key.is_empty() {
            return Err(CommandError::EmptyKey {
                command: self.command,
            });
        }

        Ok(key)
    }

    fn finish(&mut self) -> Result<(), CommandError> {
        match self.parts.next() {
            Some(_) => Err(CommandError::WrongArity {
                command: self.command,
            }),
            None => Ok(()),
        }
    }
}

/// A well-framed request that can not be executed. It is reported back to the client and the
/// connection stays open.
#[derive(Debug, ThisError, PartialEq)]
pub enum CommandError {
    #[error("ERR empty command")]
    EmptyCommand,
    #[error("ERR unknown command '{command}'")]
    UnknownCommand { command: String },
    #[error("ERR wrong number of arguments for '{command}' command")]
    WrongArity { command: &'static str },
    #[error("ERR empty key for '{command}' command")]
    EmptyKey { command: &'static str },
}

impl From<CommandError> for Frame {
    fn from(err: CommandError) -> Self {
        Frame::Error(err.to_string())
    }
}
