use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::hotkey::{Hotkey, KeyCode, Modifiers};

pub fn config_file() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".tabwise.toml")
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_trigger")]
    pub trigger: Hotkey,
    #[serde(default = "default_minimize")]
    pub minimize: Hotkey,
    /// Monochrome template icon for the status item instead of the colored one.
    #[serde(default = "yes")]
    pub template_icon: bool,
    #[serde(default)]
    pub thumbnail: ThumbnailSettings,
    #[serde(default)]
    pub timing: TimingSettings,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ThumbnailSettings {
    #[serde(default = "default_thumbnail_width")]
    pub width: u32,
    #[serde(default = "default_thumbnail_height")]
    pub height: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SettleMode {
    /// Re-check the expected window state until it holds or the timeout passes.
    #[default]
    Poll,
    /// Wait the configured settle time unconditionally.
    Fixed,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TimingSettings {
    #[serde(default = "default_commit_delay_ms")]
    pub commit_delay_ms: u64,
    #[serde(default = "default_unminimize_settle_ms")]
    pub unminimize_settle_ms: u64,
    #[serde(default = "default_activate_settle_ms")]
    pub activate_settle_ms: u64,
    #[serde(default)]
    pub settle: SettleMode,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    #[serde(default = "default_permission_probe_interval_ms")]
    pub permission_probe_interval_ms: u64,
}

fn yes() -> bool { true }

fn default_trigger() -> Hotkey { Hotkey::new(Modifiers::ALT, KeyCode::Tab) }

fn default_minimize() -> Hotkey { Hotkey::new(Modifiers::ALT, KeyCode::KeyQ) }

fn default_thumbnail_width() -> u32 { 320 }

fn default_thumbnail_height() -> u32 { 200 }

fn default_commit_delay_ms() -> u64 { 50 }

fn default_unminimize_settle_ms() -> u64 { 300 }

fn default_activate_settle_ms() -> u64 { 150 }

fn default_poll_interval_ms() -> u64 { 20 }

fn default_poll_timeout_ms() -> u64 { 600 }

fn default_permission_probe_interval_ms() -> u64 { 2000 }

impl Default for Config {
    fn default() -> Self {
        Self {
            trigger: default_trigger(),
            minimize: default_minimize(),
            template_icon: true,
            thumbnail: ThumbnailSettings::default(),
            timing: TimingSettings::default(),
        }
    }
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            width: default_thumbnail_width(),
            height: default_thumbnail_height(),
        }
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            commit_delay_ms: default_commit_delay_ms(),
            unminimize_settle_ms: default_unminimize_settle_ms(),
            activate_settle_ms: default_activate_settle_ms(),
            settle: SettleMode::default(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_ms: default_poll_timeout_ms(),
            permission_probe_interval_ms: default_permission_probe_interval_ms(),
        }
    }
}

pub const MIN_THUMBNAIL_EDGE: u32 = 16;
/// Larger than any cell the overlay lays out on a single screen.
pub const MAX_THUMBNAIL_EDGE: u32 = 2048;

impl ThumbnailSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.width < MIN_THUMBNAIL_EDGE || self.height < MIN_THUMBNAIL_EDGE {
            issues.push(format!(
                "thumbnail size {}x{} is too small (minimum {MIN_THUMBNAIL_EDGE}x{MIN_THUMBNAIL_EDGE})",
                self.width, self.height
            ));
        }
        if self.width > MAX_THUMBNAIL_EDGE || self.height > MAX_THUMBNAIL_EDGE {
            issues.push(format!(
                "thumbnail size {}x{} is too large (maximum {MAX_THUMBNAIL_EDGE}x{MAX_THUMBNAIL_EDGE})",
                self.width, self.height
            ));
        }
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        if self.validate().is_empty() {
            return 0;
        }
        *self = Self::default();
        1
    }
}

impl TimingSettings {
    pub fn commit_delay(&self) -> Duration { Duration::from_millis(self.commit_delay_ms) }

    pub fn unminimize_settle(&self) -> Duration { Duration::from_millis(self.unminimize_settle_ms) }

    pub fn activate_settle(&self) -> Duration { Duration::from_millis(self.activate_settle_ms) }

    pub fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval_ms) }

    pub fn poll_timeout(&self) -> Duration { Duration::from_millis(self.poll_timeout_ms) }

    pub fn permission_probe_interval(&self) -> Duration {
        Duration::from_millis(self.permission_probe_interval_ms)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.poll_interval_ms == 0 {
            issues.push("timing.poll_interval_ms must be greater than zero".to_string());
        }
        if self.poll_timeout_ms < self.poll_interval_ms {
            issues.push("timing.poll_timeout_ms must not be shorter than poll_interval_ms".to_string());
        }
        if self.permission_probe_interval_ms < 100 {
            issues.push("timing.permission_probe_interval_ms must be at least 100".to_string());
        }
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;
        if self.poll_interval_ms == 0 {
            self.poll_interval_ms = default_poll_interval_ms();
            fixes += 1;
        }
        if self.poll_timeout_ms < self.poll_interval_ms {
            self.poll_timeout_ms = self.poll_interval_ms.max(default_poll_timeout_ms());
            fixes += 1;
        }
        if self.permission_probe_interval_ms < 100 {
            self.permission_probe_interval_ms = default_permission_probe_interval_ms();
            fixes += 1;
        }
        fixes
    }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    /// Reads `path` if it exists, falling back to the built-in defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() { Self::read(path) } else { Ok(Config::default()) }
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> { Ok(toml::from_str(buf)?) }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;
        Ok(())
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.trigger.modifiers.is_empty() {
            issues.push(format!(
                "trigger {} has no modifier; releasing the modifier is what commits a selection",
                self.trigger
            ));
        }
        if self.trigger == self.minimize {
            issues.push(format!("trigger and minimize are both bound to {}", self.trigger));
        }
        issues.extend(self.thumbnail.validate());
        issues.extend(self.timing.validate());

        issues
    }

    /// Resets invalid values to their defaults and returns how many were fixed.
    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if self.trigger.modifiers.is_empty() {
            self.trigger = default_trigger();
            fixes += 1;
        }
        if self.trigger == self.minimize {
            self.minimize =
                if self.trigger == default_minimize() { default_trigger() } else { default_minimize() };
            fixes += 1;
        }
        fixes += self.thumbnail.auto_fix_values();
        fixes += self.timing.auto_fix_values();

        fixes
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.trigger.to_string(), "Alt + Tab");
        assert_eq!(config.minimize.to_string(), "Alt + Q");
        assert!(config.template_icon);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn it_parses_all_sections() {
        let config = Config::parse(
            r#"
            trigger = "Cmd + Tab"
            minimize = "Option + M"
            template_icon = false

            [thumbnail]
            width = 240

            [timing]
            settle = "fixed"
            commit_delay_ms = 80
            "#,
        )
        .unwrap();

        assert_eq!(config.trigger, Hotkey::new(Modifiers::META, KeyCode::Tab));
        assert_eq!(config.minimize, Hotkey::new(Modifiers::ALT, KeyCode::KeyM));
        assert!(!config.template_icon);
        assert_eq!(config.thumbnail.width, 240);
        assert_eq!(config.thumbnail.height, 200);
        assert_eq!(config.timing.settle, SettleMode::Fixed);
        assert_eq!(config.timing.commit_delay(), Duration::from_millis(80));
        assert_eq!(config.timing.poll_interval_ms, 20);
    }

    #[test]
    fn it_rejects_unknown_keys_and_bad_hotkeys() {
        assert!(Config::parse("trigger_key = \"Tab\"").is_err());
        assert!(Config::parse("trigger = \"Alt + Nope\"").is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_empty());

        config.trigger = Hotkey::new(Modifiers::empty(), KeyCode::Tab);
        config.timing.poll_interval_ms = 0;
        let issues = config.validate();
        assert_eq!(issues.len(), 2, "{issues:?}");
        assert!(issues[0].contains("no modifier"));

        let fixes = config.auto_fix_values();
        assert_eq!(fixes, 2);
        assert_eq!(config.trigger, default_trigger());
        assert_eq!(config.timing.poll_interval_ms, 20);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn conflicting_bindings_are_separated() {
        let mut config = Config::default();
        config.minimize = config.trigger;
        assert_eq!(config.validate().len(), 1);
        assert_eq!(config.auto_fix_values(), 1);
        assert_eq!(config.minimize, default_minimize());
    }

    #[test]
    fn oversized_thumbnails_are_reset() {
        let mut config = Config::parse("[thumbnail]\nwidth = 100000\nheight = 200").unwrap();
        let issues = config.validate();
        assert_eq!(issues.len(), 1, "{issues:?}");
        assert!(issues[0].contains("too large"));

        assert_eq!(config.auto_fix_values(), 1);
        assert_eq!(config.thumbnail, ThumbnailSettings::default());

        config.thumbnail.width = MAX_THUMBNAIL_EDGE;
        assert!(config.validate().is_empty());
    }

    #[test]
    fn save_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tabwise.toml");

        let mut config = Config::default();
        config.trigger = "Ctrl + Tab".parse().unwrap();
        config.thumbnail.height = 180;
        config.save(&path).unwrap();

        assert_eq!(Config::read(&path).unwrap(), config);
        assert_eq!(
            Config::load_or_default(&dir.path().join("missing.toml")).unwrap(),
            Config::default()
        );
    }
}
