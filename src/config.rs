use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use ratatui::style::Color;

use crate::error::RemGitError;

/// How fetched README images are turned into terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageProtocol {
    #[default]
    Halfblocks,
    Ascii,
}

impl FromStr for ImageProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "halfblocks" | "auto" | "" => Ok(ImageProtocol::Halfblocks),
            "ascii" => Ok(ImageProtocol::Ascii),
            // Graphics protocols cannot live inside a scrolled text buffer
            "kitty" | "sixel" | "iterm2" => {
                tracing::warn!(protocol = s, "image protocol not supported inline, using halfblocks");
                Ok(ImageProtocol::Halfblocks)
            }
            other => Err(format!("unknown image style '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSettings {
    pub protocol: ImageProtocol,
    /// Target size in terminal cells
    pub width: u16,
    pub height: u16,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            protocol: ImageProtocol::default(),
            width: 60,
            height: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub subtle: Color,
    pub highlight: Color,
    pub text: Color,
    pub warning: Color,
    pub special: Color,
    pub danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            subtle: Color::Rgb(0x56, 0x5f, 0x89),
            highlight: Color::Rgb(0x7d, 0x56, 0xf4),
            text: Color::Rgb(0xc0, 0xca, 0xf5),
            warning: Color::Rgb(0xe0, 0xaf, 0x68),
            special: Color::Rgb(0x43, 0xbf, 0x6d),
            danger: Color::Rgb(0xf7, 0x76, 0x8e),
        }
    }
}

/// Immutable settings snapshot, built once at startup and shared with every page.
pub struct Config {
    pub token: Option<String>,
    pub show_home: bool,
    pub image: ImageSettings,
    pub theme: Theme,
    pub clone_dir: PathBuf,
    /// Lines that could not be applied. Startup never fails on these.
    pub issues: Vec<RemGitError>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("show_home", &self.show_home)
            .field("image", &self.image)
            .field("theme", &self.theme)
            .field("clone_dir", &self.clone_dir)
            .field("issues", &self.issues.len())
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            show_home: true,
            image: ImageSettings::default(),
            theme: Theme::default(),
            clone_dir: PathBuf::from("."),
            issues: Vec::new(),
        }
    }
}

fn config_path() -> Option<PathBuf> {
    Some(dirs::home_dir()?.join(".remgit.conf"))
}

impl Config {
    pub fn load() -> Self {
        let mut config = match config_path().map(std::fs::read_to_string) {
            Some(Ok(content)) => Config::parse(&content),
            _ => Config::default(),
        };

        if config.token.is_none() {
            config.token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
        }

        for issue in &config.issues {
            tracing::warn!("{}", issue);
        }

        config
    }

    /// Parse the flat `key=value` format. Unknown keys and bad values are
    /// collected in `issues` instead of aborting.
    pub fn parse(content: &str) -> Self {
        let mut config = Config::default();

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line_no = idx + 1;
            let Some((key, value)) = line.split_once('=') else {
                config.issues.push(RemGitError::ConfigParse {
                    line: line_no,
                    reason: "expected key=value".to_string(),
                });
                continue;
            };

            if let Err(reason) = config.apply(key.trim(), value.trim()) {
                config.issues.push(RemGitError::ConfigParse {
                    line: line_no,
                    reason,
                });
            }
        }

        config
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key.to_ascii_lowercase().as_str() {
            "pat" => {
                self.token = (!value.is_empty()).then(|| value.to_string());
            }
            "showhome" => self.show_home = parse_bool(value)?,
            "imgstyle" => self.image.protocol = value.parse()?,
            "imgwidth" => self.image.width = parse_cells(value)?,
            "imgheight" => self.image.height = parse_cells(value)?,
            "subtle" => self.theme.subtle = parse_color(value)?,
            "highlight" => self.theme.highlight = parse_color(value)?,
            "text" => self.theme.text = parse_color(value)?,
            "warning" => self.theme.warning = parse_color(value)?,
            "special" => self.theme.special = parse_color(value)?,
            "danger" => self.theme.danger = parse_color(value)?,
            "clonedir" => self.clone_dir = expand_home(value),
            other => return Err(format!("unknown key '{}'", other)),
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        other => Err(format!("expected a boolean, got '{}'", other)),
    }
}

fn parse_cells(value: &str) -> Result<u16, String> {
    match value.parse::<u16>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("expected a positive cell count, got '{}'", value)),
    }
}

fn parse_color(value: &str) -> Result<Color, String> {
    Color::from_str(value).map_err(|_| format!("invalid color '{}'", value))
}

fn expand_home(value: &str) -> PathBuf {
    if let Some(rest) = value.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let content = r#"
# remgit settings
PAT=ghp_secret
Showhome=false
Imgstyle=ascii
Imgwidth=40
Imgheight=12
Highlight=#ff00ff
Warning=yellow
"#;
        let config = Config::parse(content);
        assert!(config.issues.is_empty());
        assert_eq!(config.token.as_deref(), Some("ghp_secret"));
        assert!(!config.show_home);
        assert_eq!(config.image.protocol, ImageProtocol::Ascii);
        assert_eq!(config.image.width, 40);
        assert_eq!(config.image.height, 12);
        assert_eq!(config.theme.highlight, Color::Rgb(0xff, 0x00, 0xff));
        assert_eq!(config.theme.warning, Color::Yellow);
    }

    #[test]
    fn malformed_lines_are_collected_not_fatal() {
        let content = "PAT=abc\nthis line is junk\nImgwidth=zero\nColour=red\n";
        let config = Config::parse(content);
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.issues.len(), 3);
        assert!(matches!(
            config.issues[0],
            RemGitError::ConfigParse { line: 2, .. }
        ));
        assert!(matches!(
            config.issues[2],
            RemGitError::ConfigParse { line: 4, .. }
        ));
        assert_eq!(config.image.width, ImageSettings::default().width);
    }

    #[test]
    fn keys_are_case_insensitive() {
        let config = Config::parse("showHOME=no\nimgstyle=Kitty");
        assert!(!config.show_home);
        assert_eq!(config.image.protocol, ImageProtocol::Halfblocks);
        assert!(config.issues.is_empty());
    }

    #[test]
    fn empty_pat_means_no_token() {
        let config = Config::parse("PAT=");
        assert!(config.token.is_none());
    }

    #[test]
    fn debug_redacts_token() {
        let config = Config::parse("PAT=ghp_secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("ghp_secret"));
    }

    #[test]
    fn value_may_contain_equals() {
        let config = Config::parse("PAT=abc=def");
        assert_eq!(config.token.as_deref(), Some("abc=def"));
    }
}
