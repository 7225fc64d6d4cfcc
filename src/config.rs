//! Configuration: customizable shortcuts and playback settings.
//!
//! Plain INI, created from the bundled template on first run. Unknown keys
//! are ignored so older files keep working.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use tracing::warn;

use crate::mode::MachineTuning;
use crate::playback::PlaybackTuning;

const DEFAULT_CONFIG_INI: &str = include_str!("../config.ini");

/// All configurable actions in the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    PlayPause,
    Mute,
    SkipForward,
    SkipBackward,
    VolumeUp,
    VolumeDown,
    TheaterMode,
    MiniMode,
    MinimizeMode,
    PictureInPicture,
    Close,
}

impl Action {
    pub fn from_str(s: &str) -> Option<Action> {
        match s.to_lowercase().as_str() {
            "play_pause" | "playpause" | "toggle_play" => Some(Action::PlayPause),
            "mute" | "toggle_mute" => Some(Action::Mute),
            "skip_forward" | "seek_forward" => Some(Action::SkipForward),
            "skip_backward" | "seek_backward" => Some(Action::SkipBackward),
            "volume_up" => Some(Action::VolumeUp),
            "volume_down" => Some(Action::VolumeDown),
            "theater" | "theater_mode" => Some(Action::TheaterMode),
            "mini" | "mini_mode" | "mini_player" => Some(Action::MiniMode),
            "minimize" | "minimized_mode" => Some(Action::MinimizeMode),
            "picture_in_picture" | "pip" => Some(Action::PictureInPicture),
            "close" | "quit" | "exit" => Some(Action::Close),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::PlayPause => "play_pause",
            Action::Mute => "mute",
            Action::SkipForward => "skip_forward",
            Action::SkipBackward => "skip_backward",
            Action::VolumeUp => "volume_up",
            Action::VolumeDown => "volume_down",
            Action::TheaterMode => "theater",
            Action::MiniMode => "mini",
            Action::MinimizeMode => "minimize",
            Action::PictureInPicture => "picture_in_picture",
            Action::Close => "close",
        }
    }
}

/// A key with optional modifiers, the unit of the shortcut table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InputBinding {
    Key(egui::Key),
    KeyWithCtrl(egui::Key),
    KeyWithShift(egui::Key),
    KeyWithAlt(egui::Key),
}

/// Parse an input binding from its config-file spelling.
pub fn parse_input_binding(s: &str) -> Option<InputBinding> {
    let s = s.trim().to_lowercase();

    if let Some(key_str) = s.strip_prefix("ctrl+") {
        return parse_key(key_str).map(InputBinding::KeyWithCtrl);
    }
    if let Some(key_str) = s.strip_prefix("shift+") {
        return parse_key(key_str).map(InputBinding::KeyWithShift);
    }
    if let Some(key_str) = s.strip_prefix("alt+") {
        return parse_key(key_str).map(InputBinding::KeyWithAlt);
    }
    parse_key(&s).map(InputBinding::Key)
}

fn parse_key(s: &str) -> Option<egui::Key> {
    match s.to_lowercase().as_str() {
        "f" => Some(egui::Key::F),
        "i" => Some(egui::Key::I),
        "j" => Some(egui::Key::J),
        "k" => Some(egui::Key::K),
        "l" => Some(egui::Key::L),
        "m" => Some(egui::Key::M),
        "n" => Some(egui::Key::N),
        "p" => Some(egui::Key::P),
        "q" => Some(egui::Key::Q),
        "t" => Some(egui::Key::T),
        "w" => Some(egui::Key::W),
        "left" | "arrow_left" | "arrowleft" => Some(egui::Key::ArrowLeft),
        "right" | "arrow_right" | "arrowright" => Some(egui::Key::ArrowRight),
        "up" | "arrow_up" | "arrowup" => Some(egui::Key::ArrowUp),
        "down" | "arrow_down" | "arrowdown" => Some(egui::Key::ArrowDown),
        "escape" | "esc" => Some(egui::Key::Escape),
        "enter" | "return" => Some(egui::Key::Enter),
        "space" | "spacebar" => Some(egui::Key::Space),
        _ => None,
    }
}

/// Application configuration loaded from the INI file.
pub struct Config {
    /// Map from input binding to action.
    pub bindings: HashMap<InputBinding, Action>,
    /// Reverse map for looking up bindings for an action.
    pub action_bindings: HashMap<Action, Vec<InputBinding>>,
    /// How long theater controls stay visible after the last activity, in
    /// seconds.
    pub controls_hide_delay: f32,
    /// Seconds moved per skip.
    pub skip_seconds: f64,
    /// How long the skip indicator stays up, in milliseconds.
    pub skip_indicator_ms: u64,
    /// Volume change per key press.
    pub volume_step: f64,
    /// Initial volume (0.0 to 1.0).
    pub default_volume: f64,
    /// Whether playback starts muted.
    pub muted_by_default: bool,
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Config {
            bindings: HashMap::new(),
            action_bindings: HashMap::new(),
            controls_hide_delay: 3.0,
            skip_seconds: 10.0,
            skip_indicator_ms: 1000,
            volume_step: 0.05,
            default_volume: 1.0,
            muted_by_default: false,
        };
        config.set_defaults();
        config
    }
}

impl Config {
    fn set_defaults(&mut self) {
        self.add_binding(InputBinding::Key(egui::Key::Space), Action::PlayPause);
        self.add_binding(InputBinding::Key(egui::Key::K), Action::PlayPause);
        self.add_binding(InputBinding::Key(egui::Key::M), Action::Mute);
        self.add_binding(InputBinding::Key(egui::Key::ArrowRight), Action::SkipForward);
        self.add_binding(InputBinding::Key(egui::Key::L), Action::SkipForward);
        self.add_binding(InputBinding::Key(egui::Key::ArrowLeft), Action::SkipBackward);
        self.add_binding(InputBinding::Key(egui::Key::J), Action::SkipBackward);
        self.add_binding(InputBinding::Key(egui::Key::ArrowUp), Action::VolumeUp);
        self.add_binding(InputBinding::Key(egui::Key::ArrowDown), Action::VolumeDown);
        self.add_binding(InputBinding::Key(egui::Key::T), Action::TheaterMode);
        self.add_binding(InputBinding::Key(egui::Key::I), Action::MiniMode);
        self.add_binding(InputBinding::Key(egui::Key::N), Action::MinimizeMode);
        self.add_binding(InputBinding::Key(egui::Key::P), Action::PictureInPicture);
        self.add_binding(InputBinding::Key(egui::Key::Escape), Action::Close);
        self.add_binding(InputBinding::KeyWithCtrl(egui::Key::W), Action::Close);
    }

    fn add_binding(&mut self, input: InputBinding, action: Action) {
        self.bindings.insert(input.clone(), action);
        self.action_bindings.entry(action).or_default().push(input);
    }

    /// Per-user data directory, created on demand.
    pub fn data_dir() -> PathBuf {
        let dir = ProjectDirs::from("", "", "rust-stream-player")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        let _ = fs::create_dir_all(&dir);
        dir
    }

    fn config_path() -> PathBuf {
        let dir = ProjectDirs::from("", "", "rust-stream-player")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        let _ = fs::create_dir_all(&dir);
        dir.join("config.ini")
    }

    /// Where the floating-window placement database lives.
    pub fn placement_db_path() -> PathBuf {
        Self::data_dir().join("placement.redb")
    }

    /// Load the configuration, writing the bundled template on first run.
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            if let Err(e) = fs::write(&path, DEFAULT_CONFIG_INI) {
                warn!("could not write default config to {}: {e}", path.display());
            }
            return Self::parse_ini(DEFAULT_CONFIG_INI);
        }
        match fs::read_to_string(&path) {
            Ok(content) => Self::parse_ini(&content),
            Err(e) => {
                warn!("could not read {}: {e}", path.display());
                Self::parse_ini(DEFAULT_CONFIG_INI)
            }
        }
    }

    fn parse_ini(content: &str) -> Self {
        // Start from an empty shortcut table; defaults backfill at the end.
        let mut config = Config {
            bindings: HashMap::new(),
            action_bindings: HashMap::new(),
            ..Config::default()
        };

        let mut in_playback = false;
        let mut in_shortcuts = false;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                let section = &line[1..line.len() - 1];
                in_playback = section.eq_ignore_ascii_case("playback");
                in_shortcuts = section.eq_ignore_ascii_case("shortcuts");
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if in_playback {
                match key.as_str() {
                    "controls_hide_delay" => {
                        if let Ok(v) = value.parse::<f32>() {
                            config.controls_hide_delay = v.clamp(0.5, 60.0);
                        }
                    }
                    "skip_seconds" => {
                        if let Ok(v) = value.parse::<f64>() {
                            config.skip_seconds = v.clamp(1.0, 120.0);
                        }
                    }
                    "skip_indicator_ms" => {
                        if let Ok(v) = value.parse::<u64>() {
                            config.skip_indicator_ms = v.clamp(100, 5000);
                        }
                    }
                    "volume_step" => {
                        if let Ok(v) = value.parse::<f64>() {
                            config.volume_step = v.clamp(0.01, 0.5);
                        }
                    }
                    "default_volume" | "volume" => {
                        if let Ok(v) = value.parse::<f64>() {
                            config.default_volume = v.clamp(0.0, 1.0);
                        }
                    }
                    "muted_by_default" | "muted" => {
                        if let Some(v) = parse_bool(value) {
                            config.muted_by_default = v;
                        }
                    }
                    _ => {}
                }
            }

            if in_shortcuts {
                if let Some(action) = Action::from_str(&key) {
                    // Comma-separated for multiple bindings.
                    for binding_str in value.split(',') {
                        if let Some(binding) = parse_input_binding(binding_str) {
                            config.add_binding(binding, action);
                        }
                    }
                }
            }
        }

        // Fill in defaults for any actions the file left unbound.
        let defaults = Config::default();
        for (action, default_bindings) in defaults.action_bindings.iter() {
            if !config.action_bindings.contains_key(action) {
                for binding in default_bindings {
                    config.add_binding(binding.clone(), *action);
                }
            }
        }

        config
    }

    /// Timing knobs derived from this config.
    pub fn machine_tuning(&self) -> MachineTuning {
        MachineTuning {
            controls_hide_delay: Duration::from_secs_f32(self.controls_hide_delay),
            playback: PlaybackTuning {
                skip_seconds: self.skip_seconds,
                skip_indicator: Duration::from_millis(self.skip_indicator_ms),
            },
        }
    }

    /// The action bound to `input`, if any.
    pub fn action_for(&self, input: &InputBinding) -> Option<Action> {
        self.bindings.get(input).copied()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_to_defaults() {
        let config = Config::parse_ini(DEFAULT_CONFIG_INI);
        assert_eq!(config.controls_hide_delay, 3.0);
        assert_eq!(config.skip_seconds, 10.0);
        assert_eq!(
            config.action_for(&InputBinding::Key(egui::Key::Space)),
            Some(Action::PlayPause)
        );
    }

    #[test]
    fn custom_values_override_defaults() {
        let config = Config::parse_ini(
            "[Playback]\ncontrols_hide_delay = 5\nskip_seconds = 15\nmuted_by_default = yes\n",
        );
        assert_eq!(config.controls_hide_delay, 5.0);
        assert_eq!(config.skip_seconds, 15.0);
        assert!(config.muted_by_default);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = Config::parse_ini("[Playback]\nskip_seconds = 9999\nvolume_step = 0.0001\n");
        assert_eq!(config.skip_seconds, 120.0);
        assert_eq!(config.volume_step, 0.01);
    }

    #[test]
    fn custom_shortcut_replaces_default_for_that_action() {
        let config = Config::parse_ini("[Shortcuts]\nplay_pause = enter\n");
        assert_eq!(
            config.action_for(&InputBinding::Key(egui::Key::Enter)),
            Some(Action::PlayPause)
        );
        // Other actions keep their defaults.
        assert_eq!(
            config.action_for(&InputBinding::Key(egui::Key::M)),
            Some(Action::Mute)
        );
    }

    #[test]
    fn modifier_bindings_parse() {
        assert_eq!(
            parse_input_binding("ctrl+w"),
            Some(InputBinding::KeyWithCtrl(egui::Key::W))
        );
        assert_eq!(
            parse_input_binding("shift+space"),
            Some(InputBinding::KeyWithShift(egui::Key::Space))
        );
        assert_eq!(parse_input_binding("bogus"), None);
    }
}
