// Froth: host configuration
//
// Copyright (C) 2019  Brandon Lewis
//
// This program is free software: you can redistribute it and/or
// modify it under the terms of the GNU Lesser General Public License
// as published by the Free Software Foundation, either version 3 of
// the License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public
// License along with this program.  If not, see
// <https://www.gnu.org/licenses/>.

//! A thin deserialized settings layer for hosts that embed the VM. The
//! core itself takes its configuration as constructor arguments; this
//! module only exists so a host binary can keep those arguments in a
//! file instead of hard-coding them, the same relationship the teacher's
//! `v1.rs` has to `config.rs`'s in-memory types.

use std::fs::File;
use std::path::Path;

use ron::de::from_reader;
use serde::Deserialize;

use crate::vm::DEFAULT_MAX_LINE_TOKENS;

/// Host-level settings layered on top of the VM's own defaults. Every
/// field is optional in the file; a missing file is not an error, an
/// absent field falls back to the VM's built-in default.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    /// Identifiers the host reserves for its own words, so a program
    /// that happens to define a macro or variable of the same name
    /// fails loudly at load time instead of silently shadowing a word
    /// the host expected to be able to rely on.
    #[serde(default)]
    pub reserved_words: Vec<String>,

    /// Cells to `alloc` before the program's first line runs.
    #[serde(default)]
    pub initial_memory: usize,

    /// Milliseconds to sleep between `tick` calls in `froth run`.
    pub step_delay_ms: Option<u64>,

    /// Cap on the current-line token buffer (see `DEPTH_EXCEEDED`).
    pub max_line_tokens: Option<usize>,
}

impl Config {
    pub fn max_line_tokens(&self) -> usize {
        self.max_line_tokens.unwrap_or(DEFAULT_MAX_LINE_TOKENS)
    }

    /// Load a RON-formatted config file. A missing file yields the
    /// default configuration rather than an error -- the file is
    /// optional, not required, for a host to run a program.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        match File::open(path) {
            Ok(file) => from_reader(file).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(ron::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "couldn't read config file: {}", err),
            ConfigError::Parse(err) => write!(f, "couldn't parse config file: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_default_config() {
        let config = Config::load("/nonexistent/path/to/froth.ron").unwrap();
        assert_eq!(config.initial_memory, 0);
        assert_eq!(config.max_line_tokens(), DEFAULT_MAX_LINE_TOKENS);
    }

    #[test]
    fn parses_a_ron_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"(
                reserved_words: ["drawline", "recv"],
                initial_memory: 16,
                step_delay_ms: Some(10),
                max_line_tokens: None,
            )"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.reserved_words, vec!["drawline", "recv"]);
        assert_eq!(config.initial_memory, 16);
        assert_eq!(config.step_delay_ms, Some(10));
        assert_eq!(config.max_line_tokens(), DEFAULT_MAX_LINE_TOKENS);
    }
}
