//! Slash-command parsing and replies.

use crate::settings::{size_catalog, ImageSize, SessionSettings, MAX_IMAGE_COUNT, MIN_IMAGE_COUNT};

/// `/cmd[@bot] args` split into its parts. The command name is lowercased.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub addressee: Option<String>,
    pub args: Vec<String>,
}

pub fn parse_command(text: &str) -> Option<ParsedCommand> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;

    let mut parts = rest.split_whitespace();
    let head = parts.next()?;
    let (name, addressee) = match head.split_once('@') {
        Some((name, bot)) => (name, Some(bot.to_string())),
        None => (head, None),
    };
    if name.is_empty() {
        return None;
    }

    Some(ParsedCommand {
        name: name.to_lowercase(),
        addressee,
        args: parts.map(str::to_string).collect(),
    })
}

impl ParsedCommand {
    /// Commands explicitly addressed to another bot (group chats) are not ours.
    pub fn is_for(&self, bot_username: &str) -> bool {
        match &self.addressee {
            Some(name) => name.eq_ignore_ascii_case(bot_username.trim_start_matches('@')),
            None => true,
        }
    }
}

pub fn start_text(alias: &str) -> String {
    format!(
        "Welcome! I'm a bot that turns your messages into images using fal.ai.\n\n\
To use me, send a message containing \"{alias}\" and I'll process it for you."
    )
}

pub fn help_text(alias: &str) -> String {
    format!(
        "How to use this bot:\n\n\
1. Include \"{alias}\" in your message\n\
2. Send your message\n\
3. Wait for the generated image(s)\n\n\
Available commands:\n\
/start - Start the bot\n\
/help - Show this help message\n\
/setsize <size> - Set image size\n\
/setcount <number> - Set number of images ({MIN_IMAGE_COUNT}-{MAX_IMAGE_COUNT})\n\
/settings - Show current settings\n\n\
Available image sizes:\n\
{catalog}\n\n\
Examples:\n\
/setsize landscape_16_9 - Set to wide landscape\n\
/setsize portrait_4_3 - Set to portrait\n\
/setcount 4 - Generate 4 images per prompt",
        catalog = size_catalog()
    )
}

pub fn setsize_usage() -> String {
    format!(
        "Usage: /setsize <size>\n\nAvailable sizes:\n{}",
        size_catalog()
    )
}

pub fn setcount_usage() -> String {
    "Usage: /setcount <number>\nExample: /setcount 4".to_string()
}

pub fn invalid_count_text() -> String {
    format!(
        "Invalid count. Please choose a number between {MIN_IMAGE_COUNT} and {MAX_IMAGE_COUNT}."
    )
}

/// Execute a command against the session settings.
///
/// Returns `None` for commands this bot does not handle (they are ignored silently).
pub async fn execute(
    cmd: &ParsedCommand,
    settings: &SessionSettings,
    alias: &str,
) -> Option<String> {
    let reply = match cmd.name.as_str() {
        "start" => start_text(alias),
        "help" => help_text(alias),
        "setsize" => setsize(cmd, settings).await,
        "setcount" => setcount(cmd, settings).await,
        "settings" => {
            let s = settings.snapshot().await;
            format!(
                "Current settings:\nSize: {}\nNumber of images: {}",
                s.image_size, s.num_images
            )
        }
        _ => return None,
    };
    Some(reply)
}

async fn setsize(cmd: &ParsedCommand, settings: &SessionSettings) -> String {
    let [arg] = cmd.args.as_slice() else {
        return setsize_usage();
    };
    match arg.parse::<ImageSize>() {
        Ok(size) => {
            settings.set_size(size).await;
            tracing::info!(size = %size, "image size changed");
            format!("Image size set to {size}")
        }
        Err(_) => format!(
            "Unknown size \"{arg}\".\n\nAvailable sizes:\n{}",
            size_catalog()
        ),
    }
}

async fn setcount(cmd: &ParsedCommand, settings: &SessionSettings) -> String {
    let [arg] = cmd.args.as_slice() else {
        return setcount_usage();
    };
    let Ok(count) = arg.parse::<u8>() else {
        return invalid_count_text();
    };
    match settings.set_count(count).await {
        Ok(count) => {
            tracing::info!(count, "image count changed");
            format!("Number of images set to {count}")
        }
        Err(_) => invalid_count_text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(text: &str, settings: &SessionSettings) -> Option<String> {
        let cmd = parse_command(text).unwrap();
        execute(&cmd, settings, "xyz").await
    }

    #[test]
    fn parses_name_addressee_and_args() {
        assert_eq!(
            parse_command("/SetSize@LoraBot  square_hd ").unwrap(),
            ParsedCommand {
                name: "setsize".to_string(),
                addressee: Some("LoraBot".to_string()),
                args: vec!["square_hd".to_string()],
            }
        );
        assert!(parse_command("hello").is_none());
        assert!(parse_command("/").is_none());
        assert!(parse_command("/@bot").is_none());
    }

    #[test]
    fn addressee_filter() {
        let cmd = parse_command("/settings@lorabot").unwrap();
        assert!(cmd.is_for("LoraBot"));
        assert!(cmd.is_for("@lorabot"));
        assert!(!parse_command("/settings@otherbot").unwrap().is_for("lorabot"));
        assert!(parse_command("/settings").unwrap().is_for("lorabot"));
    }

    #[tokio::test]
    async fn setcount_rejects_out_of_range_and_keeps_value() {
        let settings = SessionSettings::default();
        assert_eq!(
            run("/setcount 2", &settings).await.unwrap(),
            "Number of images set to 2"
        );
        for bad in ["/setcount 0", "/setcount 5", "/setcount two", "/setcount -1"] {
            assert_eq!(run(bad, &settings).await.unwrap(), invalid_count_text());
        }
        assert_eq!(run("/setcount", &settings).await.unwrap(), setcount_usage());
        assert_eq!(settings.snapshot().await.num_images, 2);
    }

    #[tokio::test]
    async fn setsize_validates_name() {
        let settings = SessionSettings::default();
        assert_eq!(
            run("/setsize portrait_16_9", &settings).await.unwrap(),
            "Image size set to portrait_16_9"
        );

        let reply = run("/setsize huge", &settings).await.unwrap();
        assert!(reply.starts_with("Unknown size \"huge\""));
        assert!(reply.contains("- square_hd (1024×1024)"));
        assert_eq!(
            settings.snapshot().await.image_size,
            ImageSize::Portrait16x9
        );

        assert_eq!(run("/setsize a b", &settings).await.unwrap(), setsize_usage());
    }

    #[tokio::test]
    async fn settings_and_help_texts() {
        let settings = SessionSettings::default();
        assert_eq!(
            run("/settings", &settings).await.unwrap(),
            "Current settings:\nSize: landscape_4_3\nNumber of images: 1"
        );

        let help = run("/help", &settings).await.unwrap();
        assert!(help.contains("Include \"xyz\" in your message"));
        assert!(help.contains(&size_catalog()));
        assert!(setsize_usage().contains(&size_catalog()));

        assert!(run("/start", &settings).await.unwrap().contains("\"xyz\""));
        assert!(run("/unknown", &settings).await.is_none());
    }
}
