//! Settings state management.
//!
//! [`Settings`] is a plain value; every edit produces a new value through
//! [`Settings::with`]. [`SettingsStore`] owns the current value for one
//! settings view and tracks whether it has been persisted.

mod model;
mod store;

pub use model::{
    CheckInterval, Monitoring, Notifications, Retention, SettingValue, Settings, SettingsPath,
    ThemeChoice, Thresholds, ValueKind,
};
pub use store::{SaveState, SaveTicket, SettingsStore};

use thiserror::Error;

/// Errors raised at the settings input boundary.
///
/// Any of these leaves the current settings value untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    /// The dotted path does not name a settings leaf.
    #[error("unknown settings path: {0}")]
    UnknownPath(String),

    /// The value has the wrong type for the path.
    #[error("{path} expects a {expected} value")]
    TypeMismatch {
        path: SettingsPath,
        expected: ValueKind,
    },

    /// A threshold was not a finite, non-negative number.
    #[error("invalid threshold for {path}: {input:?}")]
    InvalidThreshold { path: SettingsPath, input: String },

    /// The text is not one of the allowed choices.
    #[error("{value:?} is not a valid choice for {path}")]
    InvalidChoice { path: SettingsPath, value: String },
}
