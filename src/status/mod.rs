pub mod sets;
pub mod terminal;

pub use terminal::{Classification, TerminalStatusSet};
