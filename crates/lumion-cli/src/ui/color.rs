//! Color mode detection for CLI output.
//!
//! Honors `NO_COLOR` (https://no-color.org/) and TTY detection.

use std::io::IsTerminal;
use std::str::FromStr;

/// Color output mode for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Always use colors, even when output is not a TTY.
    Always,
    /// Never use colors.
    Never,
    /// Colors when stdout is a terminal and `NO_COLOR` is unset.
    #[default]
    Auto,
}

impl FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown color mode '{}' (expected always, never or auto)", other)),
        }
    }
}

impl ColorMode {
    /// Whether output should be colored.
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal(),
        }
    }
}

/// Current terminal width, or 100 columns when unknown.
pub fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_mode_parse() {
        assert_eq!("always".parse::<ColorMode>(), Ok(ColorMode::Always));
        assert_eq!("NEVER".parse::<ColorMode>(), Ok(ColorMode::Never));
        assert_eq!(" auto ".parse::<ColorMode>(), Ok(ColorMode::Auto));
        assert!("sometimes".parse::<ColorMode>().is_err());
    }

    #[test]
    fn test_explicit_modes() {
        assert!(ColorMode::Always.is_enabled());
        assert!(!ColorMode::Never.is_enabled());
    }
}
