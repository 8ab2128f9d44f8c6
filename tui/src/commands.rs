//! Input Commands
//!
//! The terminal has no buttons, so funnel actions are typed as slash
//! commands. Anything that isn't a slash command is a chat message.

use datasense_core::{CreditOption, MonetizationError, WidgetEvent};

/// Help line shown for `/help` and unknown commands
pub const COMMAND_HELP: &str =
    "/try  /ad  /skip  /credits  /buy 25|50|sub  /confirm  /close  /free  /quit";

/// Errors from parsing a slash command
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    /// Unrecognized command word
    #[error("Unknown command /{0}. Try /help")]
    Unknown(String),

    /// Command needs an argument
    #[error("/{0} needs an argument: {1}")]
    MissingArgument(&'static str, &'static str),

    /// Bad credit package
    #[error("{0}")]
    BadOption(#[from] MonetizationError),
}

/// What a line of input asks for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// Forward an event to the widget
    Event(WidgetEvent),
    /// Show the command list
    Help,
    /// Leave the app
    Quit,
}

/// Parse one submitted line
pub fn parse(line: &str) -> Result<Input, CommandError> {
    let Some(command) = line.trim_start().strip_prefix('/') else {
        return Ok(Input::Event(WidgetEvent::Submit {
            text: line.to_string(),
        }));
    };

    let mut words = command.split_whitespace();
    let name = words.next().unwrap_or_default().to_ascii_lowercase();
    let arg = words.next();

    let event = match name.as_str() {
        "help" | "?" => return Ok(Input::Help),
        "quit" | "exit" => return Ok(Input::Quit),
        "try" | "premium" => WidgetEvent::OpenUpgradeOptions,
        "ad" | "watch" => WidgetEvent::WatchAd,
        "skip" => WidgetEvent::SkipAd,
        "credits" => WidgetEvent::BuyCredits,
        "buy" | "select" => {
            let arg = arg.ok_or(CommandError::MissingArgument("buy", "25, 50 or sub"))?;
            WidgetEvent::SelectCredits {
                option: arg.parse::<CreditOption>()?,
            }
        }
        "confirm" => WidgetEvent::ConfirmPurchase,
        "close" => WidgetEvent::CloseCredits,
        "free" | "no" => WidgetEvent::ContinueFree,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Input::Event(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_text_is_chat() {
        assert_eq!(
            parse("what is rust?"),
            Ok(Input::Event(WidgetEvent::Submit {
                text: "what is rust?".into()
            }))
        );
    }

    #[test]
    fn test_funnel_commands() {
        assert_eq!(parse("/try"), Ok(Input::Event(WidgetEvent::OpenUpgradeOptions)));
        assert_eq!(parse("/ad"), Ok(Input::Event(WidgetEvent::WatchAd)));
        assert_eq!(parse("/SKIP"), Ok(Input::Event(WidgetEvent::SkipAd)));
        assert_eq!(parse("/credits"), Ok(Input::Event(WidgetEvent::BuyCredits)));
        assert_eq!(parse("/confirm"), Ok(Input::Event(WidgetEvent::ConfirmPurchase)));
        assert_eq!(parse("/close"), Ok(Input::Event(WidgetEvent::CloseCredits)));
        assert_eq!(parse("/free"), Ok(Input::Event(WidgetEvent::ContinueFree)));
        assert_eq!(parse("/quit"), Ok(Input::Quit));
        assert_eq!(parse("/help"), Ok(Input::Help));
    }

    #[test]
    fn test_buy_selects_package() {
        assert_eq!(
            parse("/buy 50"),
            Ok(Input::Event(WidgetEvent::SelectCredits {
                option: CreditOption::Credits50
            }))
        );
        assert_eq!(
            parse("/buy sub"),
            Ok(Input::Event(WidgetEvent::SelectCredits {
                option: CreditOption::Subscription
            }))
        );
    }

    #[test]
    fn test_bad_commands() {
        assert_eq!(
            parse("/buy"),
            Err(CommandError::MissingArgument("buy", "25, 50 or sub"))
        );
        assert!(matches!(parse("/buy 99"), Err(CommandError::BadOption(_))));
        assert_eq!(parse("/dance"), Err(CommandError::Unknown("dance".into())));
    }
}
