//! Surface Tests
//!
//! Drive the full app (scripted backend, paused clock) through typed input
//! and check what ends up on screen.

use std::time::Duration;

use pretty_assertions::assert_eq;
use ratatui::backend::TestBackend;
use ratatui::Terminal;

use datasense_core::{
    CreditOption, MonetizationState, NotifyLevel, WidgetConfig, PURCHASE_TOAST_TEXT,
    UPSELL_CHIP_TEXT,
};
use datasense_tui::display::{DisplayRole, Overlay};
use datasense_tui::{App, DisplayState};

const WIDTH: u16 = 100;
const HEIGHT: u16 = 30;

async fn started_app() -> App {
    let mut app = App::with_size(WidgetConfig::scripted(), WIDTH, HEIGHT).unwrap();
    tokio_test::assert_ok!(app.start().await);
    assert!(pump_until(&mut app, |d| d.channel_connected).await, "channel never opened");
    app
}

async fn pump_until(app: &mut App, done: impl Fn(&DisplayState) -> bool) -> bool {
    for _ in 0..600 {
        if done(app.display()) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        app.tick().await;
    }
    done(app.display())
}

async fn pump_for(app: &mut App, duration: Duration) {
    let steps = duration.as_millis() / 100;
    for _ in 0..steps {
        tokio::time::sleep(Duration::from_millis(100)).await;
        app.tick().await;
    }
}

async fn type_line(app: &mut App, line: &str) {
    app.submit_line(line.to_string()).await;
    app.tick().await;
}

fn has_chip(display: &DisplayState) -> bool {
    display.entries.iter().any(|e| e.chip.is_some())
}

fn premium_entries(display: &DisplayState) -> usize {
    display
        .entries
        .iter()
        .filter(|e| e.role == DisplayRole::Premium)
        .count()
}

fn screen(app: &mut App) -> String {
    let mut terminal = Terminal::new(TestBackend::new(WIDTH, HEIGHT)).unwrap();
    app.render(&mut terminal).unwrap();

    let buf = terminal.backend().buffer();
    let mut out = String::new();
    for y in 0..buf.area.height {
        for x in 0..buf.area.width {
            out.push_str(buf[(x, y)].symbol());
        }
        out.push('\n');
    }
    out
}

async fn offered_app() -> App {
    let mut app = started_app().await;
    type_line(&mut app, "hello").await;
    assert!(pump_until(&mut app, has_chip).await, "no upsell offered");
    app
}

#[tokio::test(start_paused = true)]
async fn test_answer_shows_upsell_chip() {
    let mut app = offered_app().await;

    assert_eq!(app.display().monetization, MonetizationState::UpsellOffered);
    let roles: Vec<_> = app.display().entries.iter().map(|e| e.role).collect();
    assert_eq!(roles, vec![DisplayRole::User, DisplayRole::Assistant]);

    let screen = screen(&mut app);
    assert!(screen.contains("You: hello"));
    assert!(screen.contains("DataSense: hi there"));
    assert!(screen.contains(UPSELL_CHIP_TEXT));
}

#[tokio::test(start_paused = true)]
async fn test_watch_ad_then_skip_reveals_premium_once() {
    let mut app = offered_app().await;

    type_line(&mut app, "/try").await;
    assert_eq!(app.display().overlay, Some(Overlay::UpgradeModal));
    assert!(screen(&mut app).contains("Unlock Premium Answer"));

    type_line(&mut app, "/ad").await;
    assert!(matches!(app.display().overlay, Some(Overlay::Ad { skip_in }) if skip_in > 0));
    assert!(screen(&mut app).contains("Skip in"));

    assert!(pump_until(&mut app, |d| d.overlay == Some(Overlay::Ad { skip_in: 0 })).await);
    assert!(screen(&mut app).contains("/skip  Skip Ad"));

    type_line(&mut app, "/skip").await;
    assert!(pump_until(&mut app, |d| premium_entries(d) == 1).await);
    assert_eq!(app.display().overlay, None);

    // Past the ad ceiling; nothing renders twice
    pump_for(&mut app, Duration::from_secs(40)).await;
    assert_eq!(premium_entries(app.display()), 1);
    assert!(screen(&mut app).contains("DataSense Premium:"));
}

#[tokio::test(start_paused = true)]
async fn test_credits_purchase_shows_toast() {
    let mut app = offered_app().await;

    type_line(&mut app, "/try").await;
    type_line(&mut app, "/credits").await;
    type_line(&mut app, "/buy 50").await;
    assert!(matches!(
        app.display().overlay,
        Some(Overlay::Credits { selection: CreditOption::Credits50, .. })
    ));
    let dialog = screen(&mut app);
    assert!(dialog.contains("Buy Credits"));
    assert!(dialog.contains("(*) /buy 50"));

    type_line(&mut app, "/confirm").await;
    assert_eq!(
        app.display().toast.as_ref().map(|t| t.text.as_str()),
        Some(PURCHASE_TOAST_TEXT)
    );
    assert!(screen(&mut app).contains(PURCHASE_TOAST_TEXT));
    assert!(pump_until(&mut app, |d| premium_entries(d) == 1).await);
}

#[tokio::test(start_paused = true)]
async fn test_no_thanks_appends_fallback() {
    let mut app = offered_app().await;

    type_line(&mut app, "/try").await;
    type_line(&mut app, "/free").await;

    assert_eq!(app.display().overlay, None);
    assert_eq!(app.display().monetization, MonetizationState::Free);
    let last = app.display().entries.last().unwrap();
    assert_eq!(last.role, DisplayRole::Assistant);
    assert_eq!(last.content, datasense_core::FALLBACK_TEXT);
}

#[tokio::test(start_paused = true)]
async fn test_early_skip_is_rejected_with_notice() {
    let mut app = offered_app().await;

    type_line(&mut app, "/try").await;
    type_line(&mut app, "/ad").await;
    type_line(&mut app, "/skip").await;

    let notice = app.display().notice.clone().unwrap();
    assert_eq!(notice.level, NotifyLevel::Warning);
    assert!(matches!(app.display().overlay, Some(Overlay::Ad { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_bad_command_shows_notice() {
    let mut app = started_app().await;

    type_line(&mut app, "/buy 99").await;
    let notice = app.display().notice.clone().unwrap();
    assert_eq!(notice.level, NotifyLevel::Warning);
    assert!(app.status_text().contains("unknown credit option"));

    type_line(&mut app, "/help").await;
    assert!(app.status_text().contains("/confirm"));
}

#[tokio::test(start_paused = true)]
async fn test_quit_command_stops_app() {
    let mut app = started_app().await;
    assert!(app.is_running());

    type_line(&mut app, "/quit").await;
    assert!(!app.is_running());
    assert!(app.display().closed);
}

#[tokio::test(start_paused = true)]
async fn test_status_bar_reflects_state() {
    let mut app = started_app().await;
    assert!(app.status_text().contains("free | status live"));

    type_line(&mut app, "hello").await;
    assert!(pump_until(&mut app, has_chip).await);
    assert!(app.status_text().contains("upsell_offered | status live"));
}
