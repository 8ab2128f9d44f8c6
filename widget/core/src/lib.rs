//! DataSense Core - Headless Chat Widget
//!
//! The chat widget's logic, independent of any UI framework: it talks to the
//! backend, keeps the conversation, runs the premium funnel and decides what
//! should be drawn. A surface (the terminal UI, or a test) renders it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Surface                              │
//! │                  (datasense-tui, tests)                      │
//! │                            │                                 │
//! │              WidgetEvent (up) / WidgetMessage (down)         │
//! └────────────────────────────┼─────────────────────────────────┘
//!                              │
//! ┌────────────────────────────┼─────────────────────────────────┐
//! │                       ChatWidget                             │
//! │  ┌──────────┐  ┌──────────────┐  ┌──────────┐  ┌──────────┐  │
//! │  │ Session  │  │ Monetization │  │  Render  │  │Scheduler │  │
//! │  │  State   │  │   Machine    │  │Dispatcher│  │ (timers) │  │
//! │  └──────────┘  └──────────────┘  └──────────┘  └──────────┘  │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │ Transport: ChatTransport (POST /chat)                  │  │
//! │  │            StatusListener ⇄ StatusConnector (/ws/{id}) │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use datasense_core::{ChatWidget, WidgetConfig, WidgetEvent};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (tx, mut rx) = mpsc::channel(100);
//!     let mut widget = ChatWidget::new(WidgetConfig::scripted(), tx)?;
//!     widget.start().await?;
//!
//!     widget.handle_event(WidgetEvent::Submit { text: "hello".into() }).await?;
//!     loop {
//!         widget.poll().await;
//!         while let Ok(msg) = rx.try_recv() {
//!             // draw msg
//!         }
//!     }
//! }
//! ```
//!
//! # No UI Dependencies
//!
//! This crate has no dependency on ratatui, crossterm or any other UI
//! framework.

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod events;
pub mod messages;
pub mod monetization;
pub mod payload;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod transport;
pub mod widget;

pub use config::{
    default_config_path, load_config, load_config_from_path, AdTiming, ConfigError,
    ConfigOverrides, ConfigSource, WidgetConfig, WidgetMode,
};
pub use events::{StatusEvent, StatusStage, WidgetEvent};
pub use messages::{ClientId, Message, MessageRole, NotifyLevel, WidgetMessage};
pub use monetization::{
    CreditOption, MonetizationError, MonetizationMachine, MonetizationState, OrderSummary,
    Transition, UnlockCause,
};
pub use payload::{PdfDocument, PremiumPayload, VideoRef, NO_SNIPPET};
pub use render::{Fragment, PremiumCards, RenderPlan, PURCHASE_TOAST_TEXT, UPSELL_CHIP_TEXT};
pub use session::SessionState;
pub use transport::{
    ChannelError, ChatReply, ChatTransport, StatusConnector, StatusStream, TransportError,
};
pub use widget::{ChatWidget, APOLOGY_TEXT, FALLBACK_TEXT};
