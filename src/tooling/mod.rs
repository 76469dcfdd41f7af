pub mod dump;
pub mod logging;

pub use dump::{dump_tree, render_text, DumpOptions};
