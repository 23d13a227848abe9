//! CLI command handlers. Each command is in its own file.

mod checksum;
mod completions;
mod fetch;
mod unpack;
mod verify;

pub use checksum::run_checksum;
pub use completions::{run_completions, run_manpage};
pub use fetch::run_fetch;
pub use unpack::run_unpack;
pub use verify::run_verify;
