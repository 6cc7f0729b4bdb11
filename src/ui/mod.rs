//! Terminal user interface.
//!
//! - `loop_runner` - event loop and terminal setup
//! - `input` - key handling for browse, search, dialogs and help
//! - `render` - layout and overlay dispatch
//! - `sidebar`, `entries`, `reader`, `status` - panel widgets
//! - `dialog`, `help` - overlays

mod dialog;
mod entries;
mod help;
mod input;
mod loop_runner;
pub mod reader;
mod render;
mod sidebar;
mod status;

pub use loop_runner::{run, Action};
