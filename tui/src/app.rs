//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin display client:
//! - Event loop (keyboard, mouse, resize)
//! - WidgetClient for chat and the premium funnel
//! - DisplayState for rendering
//!
//! Each frame the app polls the widget, applies its messages to
//! [`DisplayState`], then redraws every layer and composites them.

use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event, EventStream, KeyCode, KeyEventKind, KeyModifiers, MouseEventKind,
};
use futures::StreamExt;
use ratatui::backend::Backend;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};
use ratatui::Terminal;
use unicode_width::UnicodeWidthStr;

use datasense_core::{CreditOption, NotifyLevel, WidgetConfig, WidgetEvent};

use crate::commands::{self, Input, COMMAND_HELP};
use crate::compositor::{Compositor, LayerId, Occlusion};
use crate::display::{DisplayRole, DisplayState, Overlay};
use crate::theme;
use crate::widget_client::WidgetClient;

/// Input box height (lines) for text wrapping
const INPUT_HEIGHT: u16 = 5;

/// Widest a dialog gets
const OVERLAY_MAX_WIDTH: u16 = 72;

/// Main application state
pub struct App {
    // === Core State ===
    /// Is the app still running?
    running: bool,

    // === Widget Integration ===
    /// Client for the embedded chat widget
    client: WidgetClient,
    /// Display state derived from WidgetMessages
    display: DisplayState,

    // === UI Components ===
    /// The layered compositor
    compositor: Compositor,
    /// Layer assignments
    layers: AppLayers,

    // === Input State ===
    /// User input buffer
    input_buffer: String,
    /// Scroll offset (lines from bottom, 0 = latest)
    scroll_offset: usize,
    /// Total rendered lines (for scroll bounds)
    total_lines: usize,

    // === Misc State ===
    /// Last frame time (for toast expiry)
    last_frame: Instant,
    /// Terminal size
    size: (u16, u16),
}

/// Layer IDs for UI regions
struct AppLayers {
    conversation: LayerId,
    input: LayerId,
    status: LayerId,
    overlay: LayerId,
    toast: LayerId,
}

impl App {
    /// Create a new App sized to the current terminal
    pub fn new(config: WidgetConfig) -> anyhow::Result<Self> {
        let (width, height) = crossterm::terminal::size()?;
        Self::with_size(config, width, height)
    }

    /// Create a new App for a fixed-size screen
    pub fn with_size(config: WidgetConfig, width: u16, height: u16) -> anyhow::Result<Self> {
        let client = WidgetClient::new(config)?;
        let area = Rect::new(0, 0, width, height);

        let mut compositor = Compositor::new(area);
        let conversation = compositor.create_layer(area, 0, Occlusion::Transparent);
        let input = compositor.create_layer(area, 0, Occlusion::Transparent);
        let status = compositor.create_layer(area, 0, Occlusion::Transparent);
        let overlay = compositor.create_layer(area, 100, Occlusion::Solid);
        let toast = compositor.create_layer(area, 110, Occlusion::Solid);
        compositor.set_visible(overlay, false);
        compositor.set_visible(toast, false);

        let mut app = Self {
            running: true,
            client,
            display: DisplayState::new(),
            compositor,
            layers: AppLayers {
                conversation,
                input,
                status,
                overlay,
                toast,
            },
            input_buffer: String::new(),
            scroll_offset: 0,
            total_lines: 0,
            last_frame: Instant::now(),
            size: (width, height),
        };
        app.layout();
        Ok(app)
    }

    /// Main event loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        let frame_duration = Duration::from_millis(50);

        // Async event stream for non-blocking terminal events
        let mut event_stream = EventStream::new();
        let mut started = false;

        // Render initial frame immediately so user sees UI
        self.render(terminal)?;

        while self.running {
            let frame_start = Instant::now();

            tokio::select! {
                biased;

                // Terminal events - highest priority
                maybe_event = event_stream.next() => {
                    if let Some(Ok(event)) = maybe_event {
                        match event {
                            Event::Key(key) if key.kind == KeyEventKind::Press => {
                                self.handle_key(key).await;
                            }
                            Event::Mouse(mouse) => self.handle_mouse(mouse).await,
                            Event::Resize(w, h) => self.handle_resize(w, h),
                            _ => {}
                        }
                    }
                }

                // Frame tick
                () = tokio::time::sleep(Duration::from_millis(16)) => {
                    if !started {
                        started = true;
                        if let Err(e) = self.start().await {
                            tracing::warn!(error = %e, "Widget start failed");
                        }
                    }
                }
            }

            self.tick().await;
            self.render(terminal)?;

            if self.display.closed {
                self.running = false;
            }

            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                tokio::time::sleep(frame_duration - elapsed).await;
            }
        }

        Ok(())
    }

    /// Start the widget (status channel, initial funnel state)
    pub async fn start(&mut self) -> anyhow::Result<()> {
        tracing::info!(client_id = %self.client.client_id(), "Starting surface");
        self.client.start().await
    }

    /// Poll the widget, apply its messages and advance timers
    pub async fn tick(&mut self) {
        self.client.poll().await;
        for msg in self.client.recv_all() {
            self.display.apply_message(msg);
        }

        let now = Instant::now();
        self.display.update(now - self.last_frame);
        self.last_frame = now;
    }

    /// Submit one line of input, as typed
    pub async fn submit_line(&mut self, line: String) {
        self.display.clear_notice();
        match commands::parse(&line) {
            Ok(Input::Event(event)) => {
                if let Err(e) = self.client.send(event).await {
                    tracing::warn!(error = %e, "Widget rejected event");
                }
            }
            Ok(Input::Help) => self.notify(NotifyLevel::Info, COMMAND_HELP),
            Ok(Input::Quit) => self.quit().await,
            Err(e) => self.notify(NotifyLevel::Warning, &e.to_string()),
        }
    }

    /// Display state (read-only)
    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    /// Whether the loop should keep going
    pub fn is_running(&self) -> bool {
        self.running
    }

    fn notify(&mut self, level: NotifyLevel, text: &str) {
        self.display.apply_message(datasense_core::WidgetMessage::Notice {
            level,
            text: text.to_string(),
        });
    }

    async fn quit(&mut self) {
        if let Err(e) = self.client.request_quit().await {
            tracing::warn!(error = %e, "Widget shutdown failed");
        }
        self.running = false;
    }

    /// Handle keyboard input
    async fn handle_key(&mut self, key: event::KeyEvent) {
        match key.code {
            KeyCode::Esc => self.quit().await,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.quit().await;
            }

            KeyCode::Enter => {
                if !self.input_buffer.trim().is_empty() {
                    let line = std::mem::take(&mut self.input_buffer);
                    self.scroll_offset = 0;
                    self.submit_line(line).await;
                }
            }

            KeyCode::Char(c) => self.input_buffer.push(c),
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }

            KeyCode::PageUp => {
                let page = self.page_size();
                let max_scroll = self.total_lines.saturating_sub(1);
                self.scroll_offset = (self.scroll_offset + page).min(max_scroll);
            }
            KeyCode::PageDown => {
                self.scroll_offset = self.scroll_offset.saturating_sub(self.page_size());
            }
            KeyCode::Home if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.scroll_offset = self.total_lines.saturating_sub(1);
            }
            KeyCode::End if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.scroll_offset = 0;
            }

            _ => {}
        }
    }

    async fn handle_mouse(&mut self, mouse: event::MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => {
                if self.scroll_offset < self.total_lines.saturating_sub(1) {
                    self.scroll_offset += 3;
                }
            }
            MouseEventKind::ScrollDown => {
                self.scroll_offset = self.scroll_offset.saturating_sub(3);
            }
            MouseEventKind::Down(_) => {
                // Clicking the conversation acts on a live chip
                let on_conversation = self.compositor.layer_at(mouse.column, mouse.row)
                    == Some(self.layers.conversation);
                if on_conversation && self.display.chip_active() {
                    if let Err(e) = self.client.send(WidgetEvent::OpenUpgradeOptions).await {
                        tracing::warn!(error = %e, "Widget rejected event");
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_resize(&mut self, width: u16, height: u16) {
        self.size = (width, height);
        self.compositor.resize(Rect::new(0, 0, width, height));
        self.layout();
    }

    fn page_size(&self) -> usize {
        usize::from(self.size.1.saturating_sub(INPUT_HEIGHT + 1) / 2)
    }

    /// Place the fixed layers for the current size
    fn layout(&mut self) {
        let (width, height) = self.size;
        let input_and_status_height = INPUT_HEIGHT + 1;

        self.compositor.place_layer(
            self.layers.conversation,
            Rect::new(0, 0, width, height.saturating_sub(input_and_status_height)),
        );
        self.compositor.place_layer(
            self.layers.input,
            Rect::new(
                0,
                height.saturating_sub(input_and_status_height),
                width,
                INPUT_HEIGHT,
            ),
        );
        self.compositor.place_layer(
            self.layers.status,
            Rect::new(0, height.saturating_sub(1), width, 1),
        );
    }

    /// Render the UI
    pub fn render<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        self.render_conversation();
        self.render_input();
        self.render_status();
        self.render_overlay();
        self.render_toast();

        terminal.draw(|frame| {
            let output = self.compositor.composite();
            let area = frame.area();
            let buf = frame.buffer_mut();

            for y in 0..area.height.min(output.area.height) {
                for x in 0..area.width.min(output.area.width) {
                    let idx = output.index_of(x, y);
                    if let Some(cell) = output.content.get(idx) {
                        buf[(x, y)] = cell.clone();
                    }
                }
            }
        })?;

        Ok(())
    }

    /// Build the styled, wrapped conversation lines
    fn conversation_lines(&self, width: usize) -> Vec<(String, Style)> {
        let mut lines: Vec<(String, Style)> = Vec::new();

        for entry in &self.display.entries {
            let style = match entry.role {
                DisplayRole::User => Style::default().fg(theme::USER_GREEN),
                DisplayRole::Assistant => Style::default().fg(theme::DATASENSE_TEAL),
                DisplayRole::Premium => Style::default().fg(theme::PREMIUM_GOLD),
                DisplayRole::Video => Style::default().fg(theme::VIDEO_CORAL),
                DisplayRole::Document => Style::default().fg(theme::DOCUMENT_BLUE),
            };

            let content = format!("{}{}", entry.role.prefix(), entry.content);
            for line in textwrap::wrap(&content, width) {
                lines.push((line.into_owned(), style));
            }

            if let Some(chip) = &entry.chip {
                let chip_style = if self.display.chip_active() {
                    Style::default()
                        .fg(theme::PREMIUM_GOLD)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(theme::DIM_GRAY)
                };
                lines.push((format!("  [ {chip} ]  /try"), chip_style));
            }

            // Cards are grouped under the premium answer
            if !matches!(entry.role, DisplayRole::Premium | DisplayRole::Video) {
                lines.push((String::new(), Style::default()));
            }
        }

        if let Some(status) = &self.display.status_line {
            lines.push((
                format!("  ... {status}"),
                Style::default()
                    .fg(theme::PREMIUM_GOLD)
                    .add_modifier(Modifier::ITALIC),
            ));
        }
        if self.display.busy {
            lines.push((
                "DataSense is thinking...".to_string(),
                Style::default().fg(theme::DIM_GRAY),
            ));
        }

        lines
    }

    fn render_conversation(&mut self) {
        let width = usize::from(self.size.0.saturating_sub(2));
        let height = usize::from(self.size.1.saturating_sub(INPUT_HEIGHT + 1));

        if width < 10 || height < 3 {
            return;
        }

        let all_lines = self.conversation_lines(width);
        self.total_lines = all_lines.len();

        let max_scroll = self.total_lines.saturating_sub(height);
        self.scroll_offset = self.scroll_offset.min(max_scroll);

        let visible_end = self.total_lines.saturating_sub(self.scroll_offset);
        let visible_start = visible_end.saturating_sub(height);

        let has_content_above = visible_start > 0;
        let has_content_below = self.scroll_offset > 0;

        let Some(buf) = self.compositor.layer_buffer_mut(self.layers.conversation) else {
            return;
        };
        buf.reset();
        let area = buf.area;

        for (i, (line, style)) in all_lines
            .iter()
            .skip(visible_start)
            .take(height)
            .enumerate()
        {
            let Ok(y) = u16::try_from(i) else { break };
            if y >= area.height {
                break;
            }

            // Fade the edges when there is more to scroll to
            let final_style = if has_content_above && i < 2 {
                Style::default().fg(theme::FADE_SHADES[i])
            } else if has_content_below && i >= height.saturating_sub(2) {
                let from_bottom = height.saturating_sub(1).saturating_sub(i);
                Style::default().fg(theme::FADE_SHADES[from_bottom.min(1)])
            } else {
                *style
            };

            let display_line: String = line.chars().take(usize::from(area.width)).collect();
            buf.set_string(area.x, y, &display_line, final_style);
        }
    }

    fn render_input(&mut self) {
        let Some(buf) = self.compositor.layer_buffer_mut(self.layers.input) else {
            return;
        };
        buf.reset();
        let area = buf.area;

        let separator = "-".repeat(usize::from(area.width));
        buf.set_string(area.x, area.y, &separator, Style::default().fg(Color::DarkGray));

        let text_height = usize::from(area.height.saturating_sub(1));
        let text_width = usize::from(area.width.saturating_sub(1));
        if text_width < 5 || text_height < 1 {
            return;
        }

        let full_input = format!("You: {}_", self.input_buffer);
        let wrapped: Vec<String> = textwrap::wrap(&full_input, text_width)
            .into_iter()
            .map(std::borrow::Cow::into_owned)
            .collect();
        let skip = wrapped.len().saturating_sub(text_height);

        for (i, line) in wrapped.iter().skip(skip).enumerate() {
            let Ok(offset) = u16::try_from(i + 1) else { break };
            if offset < area.height {
                buf.set_string(area.x, area.y + offset, line, Style::default().fg(theme::USER_GREEN));
            }
        }

        if skip > 0 {
            buf.set_string(
                area.x + area.width.saturating_sub(3),
                area.y,
                "^",
                Style::default().fg(Color::Yellow),
            );
        }
    }

    fn render_status(&mut self) {
        let line = self.status_text();
        let style = match &self.display.notice {
            Some(n) if n.level == NotifyLevel::Warning => Style::default().fg(theme::WARNING_AMBER),
            Some(_) => Style::default().fg(theme::DATASENSE_TEAL),
            None if !self.display.channel_connected => Style::default().fg(theme::ERROR_RED),
            None => Style::default().fg(theme::DIM_GRAY),
        };

        if let Some(buf) = self.compositor.layer_buffer_mut(self.layers.status) {
            buf.reset();
            let area = buf.area;
            buf.set_string(area.x, area.y, &line, style);
        }
    }

    /// Status bar text for the current display state
    pub fn status_text(&self) -> String {
        if let Some(notice) = &self.display.notice {
            return format!(" {}", notice.text);
        }

        let activity = if self.display.busy {
            "waiting"
        } else {
            self.display.monetization.name()
        };
        let channel = if self.display.channel_connected {
            "live"
        } else {
            "offline"
        };
        let scroll_info = if self.scroll_offset > 0 {
            format!(" [^{} lines - PgDn to scroll]", self.scroll_offset)
        } else {
            String::new()
        };

        format!(
            " {activity} | status {channel} | Esc to quit | /help{scroll_info}"
        )
    }

    fn render_overlay(&mut self) {
        let Some(overlay) = self.display.overlay.clone() else {
            self.compositor.set_visible(self.layers.overlay, false);
            return;
        };

        let (title, lines) = overlay_content(&overlay);
        let (width, height) = self.size;
        let box_width = OVERLAY_MAX_WIDTH.min(width.saturating_sub(4));
        let box_height = u16::try_from(lines.len() + 2)
            .unwrap_or(u16::MAX)
            .min(height.saturating_sub(INPUT_HEIGHT + 1));
        let bounds = Rect::new(
            width.saturating_sub(box_width) / 2,
            height.saturating_sub(INPUT_HEIGHT + 1).saturating_sub(box_height) / 2,
            box_width,
            box_height,
        );

        self.compositor.place_layer(self.layers.overlay, bounds);
        self.compositor.set_visible(self.layers.overlay, true);

        if let Some(buf) = self.compositor.layer_buffer_mut(self.layers.overlay) {
            buf.reset();
            draw_box(buf, title, lines);
        }
    }

    fn render_toast(&mut self) {
        let Some(toast) = &self.display.toast else {
            self.compositor.set_visible(self.layers.toast, false);
            return;
        };

        let text = toast.text.clone();
        let text_width = u16::try_from(text.width()).unwrap_or(u16::MAX);
        let box_width = text_width.saturating_add(4).min(self.size.0);
        let bounds = Rect::new(self.size.0.saturating_sub(box_width), 0, box_width, 3);

        self.compositor.place_layer(self.layers.toast, bounds);
        self.compositor.set_visible(self.layers.toast, true);

        if let Some(buf) = self.compositor.layer_buffer_mut(self.layers.toast) {
            buf.reset();
            Paragraph::new(text)
                .style(Style::default().fg(theme::SUCCESS_GREEN).bg(theme::OVERLAY_BG))
                .block(Block::bordered().border_style(theme::overlay_border()))
                .render(buf.area, buf);
        }
    }
}

/// Title and body lines for a dialog
fn overlay_content(overlay: &Overlay) -> (&'static str, Vec<Line<'static>>) {
    match overlay {
        Overlay::UpgradeModal => (
            " Unlock Premium Answer ",
            vec![
                Line::styled(
                    "Get an answer backed by DataSense partner data.",
                    theme::overlay_text(),
                ),
                Line::default(),
                Line::styled("/ad       Watch an Ad", theme::overlay_selected()),
                Line::styled("/credits  Buy Credits", theme::overlay_selected()),
                Line::styled("/free     No Thanks", theme::overlay_text()),
            ],
        ),
        Overlay::Ad { skip_in } => {
            let action = if *skip_in > 0 {
                Line::styled(format!("Skip in {skip_in}..."), theme::overlay_text())
            } else {
                Line::styled("/skip  Skip Ad", theme::overlay_selected())
            };
            (
                " Sponsored ",
                vec![
                    Line::styled("Your premium answer is on its way.", theme::overlay_text()),
                    Line::default(),
                    action,
                ],
            )
        }
        Overlay::Credits { selection, summary } => {
            let mut lines: Vec<Line<'static>> = CreditOption::ALL
                .iter()
                .map(|option| {
                    let selected = option == selection;
                    let marker = if selected { "(*)" } else { "( )" };
                    let style = if selected {
                        theme::overlay_selected()
                    } else {
                        theme::overlay_text()
                    };
                    Line::styled(
                        format!(
                            "{marker} /buy {:<4} {:<35} {}",
                            command_arg(*option),
                            option.label(),
                            option.price()
                        ),
                        style,
                    )
                })
                .collect();
            lines.push(Line::default());
            lines.push(Line::styled(
                format!("Order: {}  {}", summary.item, summary.price),
                theme::overlay_text(),
            ));
            lines.push(Line::default());
            lines.push(Line::styled(
                "/confirm  Buy     /close  Close",
                theme::overlay_selected(),
            ));
            (" Buy Credits ", lines)
        }
    }
}

/// The `/buy` argument that selects `option`
fn command_arg(option: CreditOption) -> &'static str {
    match option {
        CreditOption::Credits25 => "25",
        CreditOption::Credits50 => "50",
        CreditOption::Subscription => "sub",
    }
}

fn draw_box(buf: &mut Buffer, title: &'static str, lines: Vec<Line<'static>>) {
    let area = buf.area;
    Paragraph::new(lines)
        .style(theme::overlay_text())
        .wrap(Wrap { trim: false })
        .block(
            Block::bordered()
                .title(title)
                .border_style(theme::overlay_border()),
        )
        .render(area, buf);
}
