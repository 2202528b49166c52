use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

#[derive(Debug, PartialEq)]
pub struct Exists {
    pub key: Bytes,
}

impl Executable for Exists {
    fn exec(self, store: &Store) -> Frame {
        Frame::Integer(i64::from(store.exists(&self.key)))
    }
}

impl TryFrom<&mut CommandParser> for Exists {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_key()?;
        Ok(Self { key })
    }
}
