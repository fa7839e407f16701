//! Owned settings state with a Clean/Dirty save state machine.

use tracing::debug;

use super::{SettingValue, Settings, SettingsError, SettingsPath, ValueKind};

/// Whether the in-memory settings match what was last persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    /// Matches the last acknowledged save (or the initial value).
    Clean,
    /// Edited since the last acknowledged save.
    Dirty,
}

/// A copy of the settings handed to the persistence layer.
///
/// The revision lets [`SettingsStore::acknowledge`] tell whether the user
/// kept editing while the save was in flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaveTicket {
    pub settings: Settings,
    pub revision: u64,
}

/// Holds the settings for one settings view.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    current: Settings,
    state: SaveState,
    revision: u64,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl SettingsStore {
    /// Start from `initial`, which counts as persisted.
    pub fn new(initial: Settings) -> Self {
        Self {
            current: initial,
            state: SaveState::Clean,
            revision: 0,
        }
    }

    pub fn current(&self) -> &Settings {
        &self.current
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state == SaveState::Dirty
    }

    /// Replace the leaf at `path`.
    ///
    /// On error the current value is retained and the state is unchanged.
    /// Writing the value a leaf already has is a no-op and does not mark the
    /// store dirty.
    pub fn update(
        &mut self,
        path: SettingsPath,
        value: SettingValue,
    ) -> Result<&Settings, SettingsError> {
        let next = self.current.with(path, value)?;
        if next != self.current {
            self.current = next;
            self.revision += 1;
            self.state = SaveState::Dirty;
            debug!(path = %path, revision = self.revision, "settings updated");
        }
        Ok(&self.current)
    }

    /// Parse raw user input for `path` and apply it.
    ///
    /// Numeric input that does not parse is rejected with
    /// [`SettingsError::InvalidThreshold`] instead of becoming `NaN`.
    pub fn update_raw(&mut self, path: SettingsPath, raw: &str) -> Result<&Settings, SettingsError> {
        let value = parse_raw(path, raw)?;
        self.update(path, value)
    }

    /// Snapshot the current settings for persistence.
    ///
    /// Does not change any state; the store stays dirty until the save is
    /// acknowledged.
    pub fn begin_save(&self) -> SaveTicket {
        SaveTicket {
            settings: self.current,
            revision: self.revision,
        }
    }

    /// Record a successful save.
    ///
    /// Returns `true` when the store became clean. If edits happened after
    /// the ticket was taken the store stays dirty, since the persisted copy
    /// is already stale.
    pub fn acknowledge(&mut self, ticket: &SaveTicket) -> bool {
        if ticket.revision == self.revision {
            self.state = SaveState::Clean;
            true
        } else {
            false
        }
    }
}

fn parse_raw(path: SettingsPath, raw: &str) -> Result<SettingValue, SettingsError> {
    let trimmed = raw.trim();
    match path.kind() {
        ValueKind::Number => trimmed
            .parse::<f64>()
            .map(SettingValue::Number)
            .map_err(|_| SettingsError::InvalidThreshold {
                path,
                input: raw.to_string(),
            }),
        ValueKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Ok(SettingValue::Bool(true)),
            "false" | "off" | "no" | "0" => Ok(SettingValue::Bool(false)),
            _ => Err(SettingsError::TypeMismatch {
                path,
                expected: ValueKind::Bool,
            }),
        },
        ValueKind::Choice => Ok(SettingValue::Text(trimmed.to_string())),
    }
}
