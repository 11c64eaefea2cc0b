//! Configuration file support for piano-keys
//!
//! Configuration is stored in TOML format at:
//! - Linux: `~/.config/piano-keys/config.toml`
//! - macOS: `~/Library/Application Support/piano-keys/config.toml`
//! - Windows: `%APPDATA%\piano-keys\config.toml`

use crate::error::{Error, Result};
use crate::keyboard::{KeyboardConfig, DEFAULT_HEIGHT, DEFAULT_VELOCITY, MAX_CHANNEL, MAX_HEIGHT};
use crate::registry::NoteNumber;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Keyboard configuration
    pub keyboard: KeyboardSettings,
    /// MIDI configuration
    pub midi: MidiSettings,
    /// UI/Theme configuration
    pub theme: Theme,
}

impl Config {
    /// Load configuration from the default config file location
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Err(Error::Config(format!("Config file not found at {:?}", path)))
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration or return default if not found
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Save configuration to the default config file location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "piano-keys") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            Err(Error::Config("Could not determine config directory".to_string()))
        }
    }

    /// Create a default config file with comments
    pub fn create_default_config_file() -> Result<PathBuf> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, DEFAULT_CONFIG_FILE)?;
        Ok(path)
    }

    /// Convert to KeyboardConfig for the keyboard builder
    pub fn to_keyboard_config(&self) -> KeyboardConfig {
        KeyboardConfig {
            channel: self.keyboard.channel.min(MAX_CHANNEL),
            velocity: self.keyboard.velocity.clamp(1, 127),
            height: self.keyboard.height.min(MAX_HEIGHT),
            note_low: self.keyboard.note_low,
            note_high: self.keyboard.note_high,
        }
    }

    /// Label for a drum pad: configured label, else the General MIDI name
    pub fn drum_label(&self, note: NoteNumber) -> String {
        self.keyboard
            .drum_labels
            .as_ref()
            .and_then(|labels| labels.get(&note.to_string()).cloned())
            .unwrap_or_else(|| crate::keyboard::gm_drum_name(note))
    }
}

const DEFAULT_CONFIG_FILE: &str = r#"# piano-keys configuration file

[keyboard]
# "piano" or "drums"
mode = "piano"

# Note range (inclusive, 60 = C4)
note_low = 48
note_high = 72

# Default velocity (1-127)
velocity = 100

# MIDI channel (0-15)
channel = 0

# Keyboard height in terminal rows
height = 12

# Drum pad labels by note (drums mode only, defaults to General MIDI names)
# [keyboard.drum_labels]
# 36 = "Kick"
# 38 = "Snare"

[midi]
# JACK client name
client_name = "piano-keys"

# MIDI output port name
port_name = "midi_out"

# Auto-connect to these JACK MIDI inputs (optional)
# auto_connect = ["a2j:Hydrogen"]

[theme]
white_key_color = "white"
black_key_color = "dark_gray"
drum_pad_color = "blue"
pressed_key_color = "cyan"
border_color = "cyan"

# Show note names on keys
show_note_names = true
"#;

/// Keyboard mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyboardMode {
    /// Black and white piano keys
    #[default]
    Piano,
    /// Labelled drum pads
    Drums,
}

/// Keyboard settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardSettings {
    /// Piano or drum pads
    pub mode: KeyboardMode,
    /// Lowest note (inclusive)
    pub note_low: u8,
    /// Highest note (inclusive)
    pub note_high: u8,
    /// Default velocity (1-127)
    pub velocity: u8,
    /// MIDI channel (0-15)
    pub channel: u8,
    /// Height in terminal rows
    pub height: u16,
    /// Drum pad labels keyed by note number (TOML keys are strings)
    pub drum_labels: Option<BTreeMap<String, String>>,
}

impl Default for KeyboardSettings {
    fn default() -> Self {
        let keyboard = KeyboardConfig::default();
        Self {
            mode: KeyboardMode::Piano,
            note_low: keyboard.note_low,
            note_high: keyboard.note_high,
            velocity: DEFAULT_VELOCITY,
            channel: 0,
            height: DEFAULT_HEIGHT,
            drum_labels: None,
        }
    }
}

/// MIDI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiSettings {
    /// JACK client name
    pub client_name: String,
    /// MIDI output port name
    pub port_name: String,
    /// Auto-connect to these JACK MIDI inputs
    pub auto_connect: Option<Vec<String>>,
}

impl Default for MidiSettings {
    fn default() -> Self {
        Self {
            client_name: "piano-keys".to_string(),
            port_name: "midi_out".to_string(),
            auto_connect: None,
        }
    }
}

/// Theme/UI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    /// White key color
    pub white_key_color: String,
    /// Black key color
    pub black_key_color: String,
    /// Drum pad color
    pub drum_pad_color: String,
    /// Pressed key color
    pub pressed_key_color: String,
    /// Border color
    pub border_color: String,
    /// Show note names on keys
    pub show_note_names: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            white_key_color: "white".to_string(),
            black_key_color: "dark_gray".to_string(),
            drum_pad_color: "blue".to_string(),
            pressed_key_color: "cyan".to_string(),
            border_color: "cyan".to_string(),
            show_note_names: true,
        }
    }
}

impl Theme {
    /// Parse a color string to ratatui Color
    pub fn parse_color(s: &str) -> ratatui::style::Color {
        use ratatui::style::Color;
        match s.to_lowercase().as_str() {
            "black" => Color::Black,
            "red" => Color::Red,
            "green" => Color::Green,
            "yellow" => Color::Yellow,
            "blue" => Color::Blue,
            "magenta" => Color::Magenta,
            "cyan" => Color::Cyan,
            "gray" | "grey" => Color::Gray,
            "dark_gray" | "dark_grey" | "darkgray" | "darkgrey" => Color::DarkGray,
            "light_red" | "lightred" => Color::LightRed,
            "light_green" | "lightgreen" => Color::LightGreen,
            "light_blue" | "lightblue" => Color::LightBlue,
            "light_cyan" | "lightcyan" => Color::LightCyan,
            "white" => Color::White,
            s if s.starts_with('#') && s.len() == 7 => {
                match (
                    u8::from_str_radix(&s[1..3], 16),
                    u8::from_str_radix(&s[3..5], 16),
                    u8::from_str_radix(&s[5..7], 16),
                ) {
                    (Ok(r), Ok(g), Ok(b)) => Color::Rgb(r, g, b),
                    _ => Color::White,
                }
            }
            _ => Color::White,
        }
    }

    /// Get white key color
    pub fn white_key(&self) -> ratatui::style::Color {
        Self::parse_color(&self.white_key_color)
    }

    /// Get black key color
    pub fn black_key(&self) -> ratatui::style::Color {
        Self::parse_color(&self.black_key_color)
    }

    /// Get drum pad color
    pub fn drum_pad(&self) -> ratatui::style::Color {
        Self::parse_color(&self.drum_pad_color)
    }

    /// Get pressed key color
    pub fn pressed_key(&self) -> ratatui::style::Color {
        Self::parse_color(&self.pressed_key_color)
    }

    /// Get border color
    pub fn border(&self) -> ratatui::style::Color {
        Self::parse_color(&self.border_color)
    }
}
