//! Deterministic input replay from a TOML scenario file.
//!
//! A script maps frame numbers to input events.  The same script against the
//! same cluster layout produces the same event stream on every run, which is
//! what integration tests and benchmarks need.  Example:
//!
//! ```toml
//! [[event]]
//! kind = "key"
//! frame = 10
//! key_code = 9
//! modifiers = 64
//! down = true
//!
//! [[event]]
//! kind = "close"
//! frame = 120
//! ```
//!
//! Steps are sorted by frame on load, and [`ScriptedSource::poll`] releases
//! every step due at or before the frame it is asked about, so a stalled
//! frame loop catches up instead of silently skipping input.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use framelock_core::protocol::event::{
    AxisData, ButtonData, ClickData, InputData, KeyData, Mods, PointData,
};
use framelock_core::Event;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::InputSource;

/// Error type for script file operations.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// A file system I/O error occurred.
    #[error("I/O error reading script at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse script TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Script schema types ───────────────────────────────────────────────────────

/// Top-level scenario file: a list of `[[event]]` tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default, rename = "event")]
    pub events: Vec<ScriptStep>,
}

/// One scheduled input event.  The `kind` field selects the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptStep {
    Point {
        frame: u64,
        #[serde(default)]
        source: u8,
        position: [f64; 3],
        #[serde(default = "default_orientation")]
        orientation: [f64; 4],
    },
    Click {
        frame: u64,
        button: u8,
        #[serde(default)]
        modifiers: Mods,
        down: bool,
    },
    Key {
        frame: u64,
        #[serde(default)]
        char_code: i32,
        key_code: i32,
        #[serde(default)]
        modifiers: Mods,
        down: bool,
    },
    Axis {
        frame: u64,
        device: u8,
        axis: u8,
        value: f64,
    },
    Button {
        frame: u64,
        device: u8,
        button: u8,
        down: bool,
    },
    Input {
        frame: u64,
        text: String,
    },
    User {
        frame: u64,
        value: i64,
    },
    /// Ends the run.
    Close {
        frame: u64,
    },
}

impl ScriptStep {
    /// The frame this step is due at.
    pub fn frame(&self) -> u64 {
        match self {
            ScriptStep::Point { frame, .. }
            | ScriptStep::Click { frame, .. }
            | ScriptStep::Key { frame, .. }
            | ScriptStep::Axis { frame, .. }
            | ScriptStep::Button { frame, .. }
            | ScriptStep::Input { frame, .. }
            | ScriptStep::User { frame, .. }
            | ScriptStep::Close { frame } => *frame,
        }
    }

    /// Builds the protocol event this step injects.
    pub fn to_event(&self) -> Event {
        match self {
            ScriptStep::Point {
                source,
                position,
                orientation,
                ..
            } => Event::Point(PointData {
                source: *source,
                position: *position,
                orientation: *orientation,
            }),
            ScriptStep::Click {
                button,
                modifiers,
                down,
                ..
            } => Event::Click(ClickData {
                button: *button,
                modifiers: *modifiers,
                down: *down,
            }),
            ScriptStep::Key {
                char_code,
                key_code,
                modifiers,
                down,
                ..
            } => Event::Key(KeyData {
                char_code: *char_code,
                key_code: *key_code,
                modifiers: *modifiers,
                down: *down,
            }),
            ScriptStep::Axis {
                device,
                axis,
                value,
                ..
            } => Event::Axis(AxisData {
                device: *device,
                axis: *axis,
                value: *value,
            }),
            ScriptStep::Button {
                device,
                button,
                down,
                ..
            } => Event::Button(ButtonData {
                device: *device,
                button: *button,
                down: *down,
            }),
            ScriptStep::Input { text, .. } => Event::Input(InputData { text: text.clone() }),
            ScriptStep::User { value, .. } => Event::User(*value),
            ScriptStep::Close { .. } => Event::Close,
        }
    }
}

fn default_orientation() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

// ── Scripted source ───────────────────────────────────────────────────────────

/// An [`InputSource`] replaying a parsed [`Script`].
#[derive(Debug)]
pub struct ScriptedSource {
    pending: VecDeque<(u64, Event)>,
}

impl ScriptedSource {
    /// Reads and parses a scenario file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let script: Script = toml::from_str(&content)?;
        Ok(Self::from_script(script))
    }

    /// Builds a source from an already-parsed script.
    pub fn from_script(script: Script) -> Self {
        let mut steps: Vec<(u64, Event)> = script
            .events
            .iter()
            .map(|step| (step.frame(), step.to_event()))
            .collect();
        // Stable sort keeps same-frame steps in file order.
        steps.sort_by_key(|(frame, _)| *frame);
        Self {
            pending: steps.into(),
        }
    }

    /// Steps not yet delivered.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl InputSource for ScriptedSource {
    fn poll(&mut self, frame: u64) -> Option<Event> {
        match self.pending.front() {
            Some((due, _)) if *due <= frame => self.pending.pop_front().map(|(_, event)| event),
            _ => None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
[[event]]
kind = "key"
frame = 2
key_code = 9
modifiers = 64
down = true

[[event]]
kind = "close"
frame = 5

[[event]]
kind = "user"
frame = 0
value = -3
"#;

    #[test]
    fn test_script_parses_and_sorts_by_frame() {
        // Arrange / Act
        let script: Script = toml::from_str(SCENARIO).expect("parse");
        let mut source = ScriptedSource::from_script(script);

        // Assert: the frame-0 user event comes out first despite being last
        // in the file.
        assert_eq!(source.poll(0), Some(Event::User(-3)));
        assert_eq!(source.poll(0), None);
    }

    #[test]
    fn test_poll_releases_everything_due() {
        let script: Script = toml::from_str(SCENARIO).expect("parse");
        let mut source = ScriptedSource::from_script(script);

        // A loop that jumped straight to frame 10 still sees all three
        // steps, in frame order.
        assert_eq!(source.poll(10), Some(Event::User(-3)));
        assert!(matches!(source.poll(10), Some(Event::Key(_))));
        assert_eq!(source.poll(10), Some(Event::Close));
        assert_eq!(source.poll(10), None);
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn test_key_step_carries_modifiers_and_defaults() {
        let script: Script = toml::from_str(SCENARIO).expect("parse");
        let key = script
            .events
            .iter()
            .find(|s| matches!(s, ScriptStep::Key { .. }))
            .expect("key step present");

        match key.to_event() {
            Event::Key(data) => {
                assert_eq!(data.key_code, 9);
                assert_eq!(data.modifiers, Mods(0x0040));
                // char_code was omitted from the file.
                assert_eq!(data.char_code, 0);
                assert!(data.down);
            }
            other => panic!("expected key event, got {other:?}"),
        }
    }

    #[test]
    fn test_point_step_defaults_orientation() {
        let toml_str = r#"
[[event]]
kind = "point"
frame = 1
position = [1.0, 2.0, 3.0]
"#;
        let script: Script = toml::from_str(toml_str).expect("parse");
        match script.events[0].to_event() {
            Event::Point(data) => {
                assert_eq!(data.position, [1.0, 2.0, 3.0]);
                assert_eq!(data.orientation, [0.0, 0.0, 0.0, 1.0]);
                assert_eq!(data.source, 0);
            }
            other => panic!("expected point event, got {other:?}"),
        }
    }

    #[test]
    fn test_same_frame_steps_keep_file_order() {
        let toml_str = r#"
[[event]]
kind = "user"
frame = 3
value = 1

[[event]]
kind = "user"
frame = 3
value = 2
"#;
        let script: Script = toml::from_str(toml_str).expect("parse");
        let mut source = ScriptedSource::from_script(script);

        assert_eq!(source.poll(3), Some(Event::User(1)));
        assert_eq!(source.poll(3), Some(Event::User(2)));
    }

    #[test]
    fn test_unknown_kind_is_a_parse_error() {
        let toml_str = r#"
[[event]]
kind = "teleport"
frame = 1
"#;
        let result: Result<Script, toml::de::Error> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file_reports_the_path() {
        let result = ScriptedSource::load("/nonexistent/scenario.toml");
        match result {
            Err(ScriptError::Io { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/scenario.toml"));
            }
            other => panic!(
                "expected io error, got {:?}",
                other.map(|s| s.remaining())
            ),
        }
    }
}
