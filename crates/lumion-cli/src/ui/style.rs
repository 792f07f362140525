//! Message styling for CLI output.
//!
//! | Prefix   | Meaning     | Color  |
//! |----------|-------------|--------|
//! | `[ok]`   | Success     | Green  |
//! | `[err]`  | Error       | Red    |
//! | `[warn]` | Warning     | Yellow |
//! | `[info]` | Information | Blue   |
//! | `[hint]` | Suggestion  | Cyan   |
//! | `[skip]` | Skipped     | Dim    |

use owo_colors::OwoColorize;

use super::color::ColorMode;

/// Message severity for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Ok,
    Err,
    Warn,
    Info,
    Hint,
    Skip,
}

impl MessageType {
    /// Prefix text for this message type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Ok => "[ok]",
            Self::Err => "[err]",
            Self::Warn => "[warn]",
            Self::Info => "[info]",
            Self::Hint => "[hint]",
            Self::Skip => "[skip]",
        }
    }
}

/// Styling interface for CLI output.
#[derive(Debug, Clone)]
pub struct Style {
    color_mode: ColorMode,
}

impl Style {
    pub fn new(color_mode: ColorMode) -> Self {
        Self { color_mode }
    }

    pub fn colors_enabled(&self) -> bool {
        self.color_mode.is_enabled()
    }

    /// A message with its type prefix, e.g. `[ok] Done`.
    pub fn message(&self, msg_type: MessageType, text: &str) -> String {
        let prefix = msg_type.prefix();
        if !self.colors_enabled() {
            return format!("{} {}", prefix, text);
        }
        let colored = match msg_type {
            MessageType::Ok => prefix.green().to_string(),
            MessageType::Err => prefix.red().to_string(),
            MessageType::Warn => prefix.yellow().to_string(),
            MessageType::Info => prefix.blue().to_string(),
            MessageType::Hint => prefix.cyan().to_string(),
            MessageType::Skip => prefix.dimmed().to_string(),
        };
        format!("{} {}", colored, text)
    }

    /// A detail line under a message, indented past the prefix.
    pub fn message_detail(&self, label: &str, value: &str) -> String {
        format!("     {}: {}", label, value)
    }

    /// A section header such as `ANSWER`.
    pub fn section(&self, title: &str) -> String {
        if self.colors_enabled() {
            title.bold().to_string()
        } else {
            title.to_string()
        }
    }

    /// An error with optional cause and hint lines.
    pub fn error_with_context(&self, msg: &str, cause: Option<&str>, hint: Option<&str>) -> String {
        let mut output = self.message(MessageType::Err, msg);
        if let Some(cause) = cause {
            output.push_str(&format!("\n      Cause: {}", cause));
        }
        if let Some(hint) = hint {
            output.push_str(&format!("\n      Hint: {}", hint));
        }
        output
    }

    /// A bulleted list item.
    pub fn list_item(&self, text: &str) -> String {
        if self.colors_enabled() {
            format!("  {} {}", "-".dimmed(), text)
        } else {
            format!("  - {}", text)
        }
    }

    pub fn key_value(&self, key: &str, value: &str) -> String {
        if self.colors_enabled() {
            format!("{}: {}", key.dimmed(), value)
        } else {
            format!("{}: {}", key, value)
        }
    }

    /// A file or document path (cyan).
    pub fn file_path(&self, path: &str) -> String {
        if self.colors_enabled() {
            path.cyan().to_string()
        } else {
            path.to_string()
        }
    }

    /// An answer confidence, green when grounded in retrieved context.
    pub fn confidence(&self, value: f64) -> String {
        let formatted = format!("{:.2}", value);
        if !self.colors_enabled() {
            return formatted;
        }
        if value >= 0.5 {
            formatted.green().to_string()
        } else {
            formatted.yellow().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> Style {
        Style::new(ColorMode::Never)
    }

    #[test]
    fn test_message_prefixes() {
        let style = plain();
        assert_eq!(style.message(MessageType::Ok, "Done"), "[ok] Done");
        assert_eq!(style.message(MessageType::Skip, "Nothing to do"), "[skip] Nothing to do");
    }

    #[test]
    fn test_error_with_context() {
        let output = plain().error_with_context(
            "Failed to load configuration",
            Some("indexPath cannot be empty"),
            Some("Check ~/.lumion/config.yaml"),
        );
        assert_eq!(
            output,
            "[err] Failed to load configuration\n      Cause: indexPath cannot be empty\n      Hint: Check ~/.lumion/config.yaml"
        );
    }

    #[test]
    fn test_plain_values() {
        let style = plain();
        assert_eq!(style.key_value("Artifacts", "out/1/artifacts"), "Artifacts: out/1/artifacts");
        assert_eq!(style.list_item("src/app"), "  - src/app");
        assert_eq!(style.confidence(0.5), "0.50");
    }
}
