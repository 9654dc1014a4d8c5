//! Terminal User Interface.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling (list, form modal, confirm dialog)
//! - `render` - View rendering dispatch and overlays
//! - `categories` - Indented category list widget
//! - `form` - Create/edit modal widget
//! - `status` - Status bar widget

mod categories;
mod form;
mod input;
mod loop_runner;
mod render;
mod status;

pub use loop_runner::{run, Action};
