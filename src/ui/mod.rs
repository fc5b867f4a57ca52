//! TUI module for recite.

mod app;
pub mod theme;
mod widgets;

pub use app::App;
