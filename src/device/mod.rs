pub mod terminal;

pub use terminal::{ask, is_eof, TerminalDevice};
