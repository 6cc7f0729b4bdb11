//! Client library for the webrss self-hosted RSS reader.
//!
//! [`api`] talks to the REST backend, [`state`] holds what the reader shows,
//! [`router`] maps locations to selections and [`sync`] ties them together
//! with polling and the create/edit/delete [`dialogs`]. [`ui`] is the
//! terminal front end.

pub mod api;
pub mod app;
pub mod config;
pub mod dialogs;
pub mod keybindings;
pub mod router;
pub mod state;
pub mod sync;
pub mod ui;
pub mod util;
