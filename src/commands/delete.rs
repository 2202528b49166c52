use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Removes `key`. Replies with the number of keys removed, `1` or `0`.
#[derive(Debug, PartialEq)]
pub struct Delete {
    pub key: Bytes,
}

impl Executable for Delete {
    fn exec(self, store: &Store) -> Frame {
        let removed = store.delete(&self.key);
        Frame::Integer(i64::from(removed))
    }
}

impl TryFrom<&mut CommandParser> for Delete {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_key()?;
        Ok(Self { key })
    }
}
