//! Terminal manager for a course marketplace's category taxonomy.
//!
//! The flat record list from the category API is turned into a forest
//! ([`hierarchy`]), shown as indented rows, and edited through a modal
//! form ([`form`]). [`app::App`] ties these together and reloads the whole
//! collection after every successful mutation.

pub mod api;
pub mod app;
pub mod config;
pub mod form;
pub mod hierarchy;
pub mod i18n;
pub mod preview;
pub mod ui;
pub mod util;
