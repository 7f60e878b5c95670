// Operator-facing terminal output
//
// - console.rs: section headers and messages, silenced in quiet mode
// - prompt.rs: line-based questions over any reader/writer pair
// - progress.rs: per-disk spinners for the wipe phase

pub mod console;
pub mod progress;
pub mod prompt;


pub use console::Console;
pub use progress::WipeProgress;
pub use prompt::Prompt;
