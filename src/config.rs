//! Runtime configuration: paths for the two session files and the
//! export directory, MIDI port name filters, and the autosave toggle.
//! Parsed from CLI flags with `clap`.

use clap::Parser;
use std::path::PathBuf;

fn default_decaloop_dir() -> PathBuf {
    dirs_home().join(".decaloop")
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "decaloop", about = "Ten-track MIDI loop sequencer engine")]
pub struct Config {
    /// Path to the normal session file.
    #[arg(long)]
    pub session_path: Option<PathBuf>,

    /// Path to the Super Looper session file.
    #[arg(long)]
    pub super_looper_session_path: Option<PathBuf>,

    /// Directory Standard MIDI File exports are written into.
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    /// Substring filter for the MIDI input port to open.
    #[arg(long)]
    pub midi_in: Option<String>,

    /// Substring filter for the MIDI output port to open.
    #[arg(long)]
    pub midi_out: Option<String>,

    /// Start with Super Looper enabled.
    #[arg(long)]
    pub super_looper: bool,

    /// Disable autosave at transport-idle boundaries.
    #[arg(long)]
    pub no_autosave: bool,
}

impl Config {
    pub fn session_path(&self) -> PathBuf {
        self.session_path
            .clone()
            .unwrap_or_else(|| default_decaloop_dir().join("session.json"))
    }

    pub fn super_looper_session_path(&self) -> PathBuf {
        self.super_looper_session_path
            .clone()
            .unwrap_or_else(|| default_decaloop_dir().join("super_looper_session.json"))
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(|| default_decaloop_dir().join("exports"))
    }

    pub fn autosave_enabled(&self) -> bool {
        !self.no_autosave
    }

    /// The session file in effect for the current Super Looper setting:
    /// the normal and Super Looper sessions are always kept in separate
    /// files, never mixed into one.
    pub fn active_session_path(&self, super_looper_enabled: bool) -> PathBuf {
        if super_looper_enabled {
            self.super_looper_session_path()
        } else {
            self.session_path()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_live_under_decaloop_home_dir() {
        let config = Config::parse_from(["decaloop"]);
        assert!(config.session_path().ends_with("session.json"));
        assert!(config
            .super_looper_session_path()
            .ends_with("super_looper_session.json"));
        assert!(config.autosave_enabled());
    }

    #[test]
    fn no_autosave_flag_disables_autosave() {
        let config = Config::parse_from(["decaloop", "--no-autosave"]);
        assert!(!config.autosave_enabled());
    }
}
