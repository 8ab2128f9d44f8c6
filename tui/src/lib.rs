//! DataSense TUI - Terminal surface for the premium-answer chat widget
//!
//! Hosts one [`datasense_core::ChatWidget`] full-screen: a scrolling
//! conversation, an input line, a status bar, and funnel dialogs drawn as
//! overlays.
//!
//! # Architecture
//!
//! - **Compositor**: Layered rendering with z-ordering so dialogs and
//!   toasts sit above the conversation
//! - **Display**: Remembers what the widget asked to be drawn
//! - **Commands**: Slash commands for the funnel's buttons
//! - **WidgetClient**: The embedded widget and its message channel

pub mod app;
pub mod commands;
pub mod compositor;
pub mod display;
pub mod theme;
pub mod widget_client;

pub use app::App;
pub use display::DisplayState;
pub use widget_client::WidgetClient;
