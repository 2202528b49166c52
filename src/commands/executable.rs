use crate::frame::Frame;
use crate::store::Store;

/// Runs a parsed command against the store and produces its reply. Store operations can not
/// fail, so neither can execution.
pub trait Executable {
    fn exec(self, store: &Store) -> Frame;
}
