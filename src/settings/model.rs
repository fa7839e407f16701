//! The settings document and its path-scoped update rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::SettingsError;

/// Dashboard color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    #[default]
    Light,
    Dark,
    /// Follow the terminal background.
    System,
}

impl ThemeChoice {
    pub const ALL: [ThemeChoice; 3] = [ThemeChoice::Light, ThemeChoice::Dark, ThemeChoice::System];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeChoice::Light => "light",
            ThemeChoice::Dark => "dark",
            ThemeChoice::System => "system",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ThemeChoice::Light => "Light",
            ThemeChoice::Dark => "Dark",
            ThemeChoice::System => "System",
        }
    }
}

/// How often the backend checks the monitored site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CheckInterval {
    #[serde(rename = "1m")]
    OneMinute,
    #[default]
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
}

impl CheckInterval {
    pub const ALL: [CheckInterval; 5] = [
        CheckInterval::OneMinute,
        CheckInterval::FiveMinutes,
        CheckInterval::FifteenMinutes,
        CheckInterval::ThirtyMinutes,
        CheckInterval::OneHour,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckInterval::OneMinute => "1m",
            CheckInterval::FiveMinutes => "5m",
            CheckInterval::FifteenMinutes => "15m",
            CheckInterval::ThirtyMinutes => "30m",
            CheckInterval::OneHour => "1h",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CheckInterval::OneMinute => "1 minute",
            CheckInterval::FiveMinutes => "5 minutes",
            CheckInterval::FifteenMinutes => "15 minutes",
            CheckInterval::ThirtyMinutes => "30 minutes",
            CheckInterval::OneHour => "1 hour",
        }
    }
}

/// How long the backend keeps collected samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Retention {
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "14d")]
    FourteenDays,
    #[default]
    #[serde(rename = "30d")]
    ThirtyDays,
    #[serde(rename = "90d")]
    NinetyDays,
}

impl Retention {
    pub const ALL: [Retention; 4] = [
        Retention::SevenDays,
        Retention::FourteenDays,
        Retention::ThirtyDays,
        Retention::NinetyDays,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Retention::SevenDays => "7d",
            Retention::FourteenDays => "14d",
            Retention::ThirtyDays => "30d",
            Retention::NinetyDays => "90d",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Retention::SevenDays => "7 days",
            Retention::FourteenDays => "14 days",
            Retention::ThirtyDays => "30 days",
            Retention::NinetyDays => "90 days",
        }
    }
}

/// Enabled notification channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notifications {
    pub email: bool,
    pub slack: bool,
    pub webhook: bool,
}

/// Backend monitoring cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Monitoring {
    pub interval: CheckInterval,
    pub retention: Retention,
}

/// Alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Largest Contentful Paint, seconds.
    pub lcp: f64,
    /// Total Blocking Time, milliseconds.
    pub tbt: f64,
    /// Interaction to Next Paint, milliseconds.
    pub inp: f64,
}

impl Default for Notifications {
    fn default() -> Self {
        Self {
            email: true,
            slack: true,
            webhook: false,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            lcp: 2.5,
            tbt: 300.0,
            inp: 200.0,
        }
    }
}

/// The full settings document, as sent to `PUT /settings`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Settings {
    pub theme: ThemeChoice,
    pub notifications: Notifications,
    pub monitoring: Monitoring,
    pub thresholds: Thresholds,
}

/// Addresses one leaf of [`Settings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsPath {
    Theme,
    NotificationsEmail,
    NotificationsSlack,
    NotificationsWebhook,
    MonitoringInterval,
    MonitoringRetention,
    ThresholdsLcp,
    ThresholdsTbt,
    ThresholdsInp,
}

/// The type of value a path accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Number,
    Choice,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Bool => write!(f, "boolean"),
            ValueKind::Number => write!(f, "numeric"),
            ValueKind::Choice => write!(f, "choice"),
        }
    }
}

impl SettingsPath {
    /// Every path, in form order.
    pub const ALL: [SettingsPath; 9] = [
        SettingsPath::Theme,
        SettingsPath::NotificationsEmail,
        SettingsPath::NotificationsSlack,
        SettingsPath::NotificationsWebhook,
        SettingsPath::MonitoringInterval,
        SettingsPath::MonitoringRetention,
        SettingsPath::ThresholdsLcp,
        SettingsPath::ThresholdsTbt,
        SettingsPath::ThresholdsInp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingsPath::Theme => "theme",
            SettingsPath::NotificationsEmail => "notifications.email",
            SettingsPath::NotificationsSlack => "notifications.slack",
            SettingsPath::NotificationsWebhook => "notifications.webhook",
            SettingsPath::MonitoringInterval => "monitoring.interval",
            SettingsPath::MonitoringRetention => "monitoring.retention",
            SettingsPath::ThresholdsLcp => "thresholds.lcp",
            SettingsPath::ThresholdsTbt => "thresholds.tbt",
            SettingsPath::ThresholdsInp => "thresholds.inp",
        }
    }

    /// Form label.
    pub fn label(&self) -> &'static str {
        match self {
            SettingsPath::Theme => "Theme",
            SettingsPath::NotificationsEmail => "Email Notifications",
            SettingsPath::NotificationsSlack => "Slack Notifications",
            SettingsPath::NotificationsWebhook => "Webhook Notifications",
            SettingsPath::MonitoringInterval => "Check Interval",
            SettingsPath::MonitoringRetention => "Data Retention",
            SettingsPath::ThresholdsLcp => "Largest Contentful Paint (LCP)",
            SettingsPath::ThresholdsTbt => "Total Blocking Time (TBT)",
            SettingsPath::ThresholdsInp => "Interaction to Next Paint (INP)",
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            SettingsPath::NotificationsEmail
            | SettingsPath::NotificationsSlack
            | SettingsPath::NotificationsWebhook => ValueKind::Bool,
            SettingsPath::ThresholdsLcp | SettingsPath::ThresholdsTbt | SettingsPath::ThresholdsInp => {
                ValueKind::Number
            }
            SettingsPath::Theme
            | SettingsPath::MonitoringInterval
            | SettingsPath::MonitoringRetention => ValueKind::Choice,
        }
    }
}

impl fmt::Display for SettingsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingsPath {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        SettingsPath::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| SettingsError::UnknownPath(s.to_string()))
    }
}

/// A scalar value destined for one settings leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(true) => f.write_str("on"),
            SettingValue::Bool(false) => f.write_str("off"),
            SettingValue::Number(n) => write!(f, "{}", n),
            SettingValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        SettingValue::Number(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(value.to_string())
    }
}

impl Settings {
    /// Return a copy of `self` with only the leaf at `path` replaced.
    ///
    /// Every sibling field is carried over unchanged. The original value is
    /// never modified; on error nothing is produced.
    pub fn with(&self, path: SettingsPath, value: SettingValue) -> Result<Settings, SettingsError> {
        let next = match (path, value) {
            (SettingsPath::Theme, SettingValue::Text(raw)) => Settings {
                theme: parse_choice(path, &raw, &ThemeChoice::ALL, ThemeChoice::as_str)?,
                ..*self
            },
            (SettingsPath::NotificationsEmail, SettingValue::Bool(email)) => Settings {
                notifications: Notifications {
                    email,
                    ..self.notifications
                },
                ..*self
            },
            (SettingsPath::NotificationsSlack, SettingValue::Bool(slack)) => Settings {
                notifications: Notifications {
                    slack,
                    ..self.notifications
                },
                ..*self
            },
            (SettingsPath::NotificationsWebhook, SettingValue::Bool(webhook)) => Settings {
                notifications: Notifications {
                    webhook,
                    ..self.notifications
                },
                ..*self
            },
            (SettingsPath::MonitoringInterval, SettingValue::Text(raw)) => Settings {
                monitoring: Monitoring {
                    interval: parse_choice(path, &raw, &CheckInterval::ALL, CheckInterval::as_str)?,
                    ..self.monitoring
                },
                ..*self
            },
            (SettingsPath::MonitoringRetention, SettingValue::Text(raw)) => Settings {
                monitoring: Monitoring {
                    retention: parse_choice(path, &raw, &Retention::ALL, Retention::as_str)?,
                    ..self.monitoring
                },
                ..*self
            },
            (SettingsPath::ThresholdsLcp, SettingValue::Number(lcp)) => Settings {
                thresholds: Thresholds {
                    lcp: check_threshold(path, lcp)?,
                    ..self.thresholds
                },
                ..*self
            },
            (SettingsPath::ThresholdsTbt, SettingValue::Number(tbt)) => Settings {
                thresholds: Thresholds {
                    tbt: check_threshold(path, tbt)?,
                    ..self.thresholds
                },
                ..*self
            },
            (SettingsPath::ThresholdsInp, SettingValue::Number(inp)) => Settings {
                thresholds: Thresholds {
                    inp: check_threshold(path, inp)?,
                    ..self.thresholds
                },
                ..*self
            },
            (path, _) => {
                return Err(SettingsError::TypeMismatch {
                    path,
                    expected: path.kind(),
                })
            }
        };
        Ok(next)
    }

    /// Read the leaf at `path` as a value suitable for display or editing.
    pub fn get(&self, path: SettingsPath) -> SettingValue {
        match path {
            SettingsPath::Theme => SettingValue::Text(self.theme.as_str().to_string()),
            SettingsPath::NotificationsEmail => SettingValue::Bool(self.notifications.email),
            SettingsPath::NotificationsSlack => SettingValue::Bool(self.notifications.slack),
            SettingsPath::NotificationsWebhook => SettingValue::Bool(self.notifications.webhook),
            SettingsPath::MonitoringInterval => {
                SettingValue::Text(self.monitoring.interval.as_str().to_string())
            }
            SettingsPath::MonitoringRetention => {
                SettingValue::Text(self.monitoring.retention.as_str().to_string())
            }
            SettingsPath::ThresholdsLcp => SettingValue::Number(self.thresholds.lcp),
            SettingsPath::ThresholdsTbt => SettingValue::Number(self.thresholds.tbt),
            SettingsPath::ThresholdsInp => SettingValue::Number(self.thresholds.inp),
        }
    }

    /// Next value in the cycle for a choice or boolean leaf.
    ///
    /// Numeric leaves have no cycle and return `None`.
    pub fn cycled(&self, path: SettingsPath, forward: bool) -> Option<SettingValue> {
        fn step<T: Copy + PartialEq>(all: &[T], current: T, forward: bool) -> T {
            let pos = all.iter().position(|v| *v == current).unwrap_or(0);
            let len = all.len();
            let next = if forward { (pos + 1) % len } else { (pos + len - 1) % len };
            all[next]
        }

        match path {
            SettingsPath::Theme => Some(SettingValue::from(
                step(&ThemeChoice::ALL, self.theme, forward).as_str(),
            )),
            SettingsPath::MonitoringInterval => Some(SettingValue::from(
                step(&CheckInterval::ALL, self.monitoring.interval, forward).as_str(),
            )),
            SettingsPath::MonitoringRetention => Some(SettingValue::from(
                step(&Retention::ALL, self.monitoring.retention, forward).as_str(),
            )),
            SettingsPath::NotificationsEmail
            | SettingsPath::NotificationsSlack
            | SettingsPath::NotificationsWebhook => match self.get(path) {
                SettingValue::Bool(b) => Some(SettingValue::Bool(!b)),
                _ => None,
            },
            SettingsPath::ThresholdsLcp | SettingsPath::ThresholdsTbt | SettingsPath::ThresholdsInp => {
                None
            }
        }
    }

    /// Check document-level invariants.
    ///
    /// The typed fields already guarantee valid choices; only thresholds can
    /// be out of range when a document arrives from outside.
    pub fn validate(&self) -> Result<(), SettingsError> {
        check_threshold(SettingsPath::ThresholdsLcp, self.thresholds.lcp)?;
        check_threshold(SettingsPath::ThresholdsTbt, self.thresholds.tbt)?;
        check_threshold(SettingsPath::ThresholdsInp, self.thresholds.inp)?;
        Ok(())
    }
}

fn parse_choice<T: Copy>(
    path: SettingsPath,
    raw: &str,
    all: &[T],
    as_str: fn(&T) -> &'static str,
) -> Result<T, SettingsError> {
    let raw = raw.trim();
    all.iter()
        .find(|v| as_str(*v).eq_ignore_ascii_case(raw))
        .copied()
        .ok_or_else(|| SettingsError::InvalidChoice {
            path,
            value: raw.to_string(),
        })
}

fn check_threshold(path: SettingsPath, value: f64) -> Result<f64, SettingsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(SettingsError::InvalidThreshold {
            path,
            input: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// Flatten a settings document into `dotted.path -> json leaf`.
    fn leaves(settings: &Settings) -> BTreeMap<String, serde_json::Value> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut BTreeMap<String, serde_json::Value>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (key, child) in map {
                        let path = if prefix.is_empty() {
                            key.clone()
                        } else {
                            format!("{}.{}", prefix, key)
                        };
                        walk(&path, child, out);
                    }
                }
                leaf => {
                    out.insert(prefix.to_string(), leaf.clone());
                }
            }
        }

        let mut out = BTreeMap::new();
        walk("", &serde_json::to_value(settings).unwrap(), &mut out);
        out
    }

    fn sample_value(path: SettingsPath) -> SettingValue {
        match path {
            SettingsPath::Theme => "dark".into(),
            SettingsPath::NotificationsEmail => false.into(),
            SettingsPath::NotificationsSlack => false.into(),
            SettingsPath::NotificationsWebhook => true.into(),
            SettingsPath::MonitoringInterval => "1h".into(),
            SettingsPath::MonitoringRetention => "90d".into(),
            SettingsPath::ThresholdsLcp => 4.0.into(),
            SettingsPath::ThresholdsTbt => 600.0.into(),
            SettingsPath::ThresholdsInp => 500.0.into(),
        }
    }

    #[test]
    fn test_defaults_match_dashboard_defaults() {
        let s = Settings::default();
        assert_eq!(s.theme, ThemeChoice::Light);
        assert!(s.notifications.email);
        assert!(s.notifications.slack);
        assert!(!s.notifications.webhook);
        assert_eq!(s.monitoring.interval, CheckInterval::FiveMinutes);
        assert_eq!(s.monitoring.retention, Retention::ThirtyDays);
        assert_eq!(s.thresholds.lcp, 2.5);
        assert_eq!(s.thresholds.tbt, 300.0);
        assert_eq!(s.thresholds.inp, 200.0);
    }

    #[test]
    fn test_each_update_changes_exactly_one_leaf() {
        let base = Settings::default();
        let before = leaves(&base);

        for path in SettingsPath::ALL {
            let next = base.with(path, sample_value(path)).unwrap();
            let after = leaves(&next);

            let changed: Vec<&String> =
                before.keys().filter(|k| before.get(*k) != after.get(*k)).collect();
            assert_eq!(changed, vec![&path.as_str().to_string()], "path {}", path);
        }
    }

    #[test]
    fn test_update_lcp_threshold_scenario() {
        let base = Settings::default();
        let next = base.with(SettingsPath::ThresholdsLcp, 3.0.into()).unwrap();

        assert_eq!(
            next.thresholds,
            Thresholds {
                lcp: 3.0,
                tbt: 300.0,
                inp: 200.0
            }
        );
        assert_eq!(next.theme, base.theme);
        assert_eq!(next.notifications, base.notifications);
        assert_eq!(next.monitoring, base.monitoring);
        // The source value is untouched.
        assert_eq!(base.thresholds.lcp, 2.5);
    }

    #[test]
    fn test_rejects_non_finite_threshold() {
        let base = Settings::default();
        for bad in [f64::NAN, f64::INFINITY, -1.0] {
            let err = base.with(SettingsPath::ThresholdsTbt, bad.into()).unwrap_err();
            assert!(matches!(
                err,
                SettingsError::InvalidThreshold {
                    path: SettingsPath::ThresholdsTbt,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_type_mismatch() {
        let err = Settings::default()
            .with(SettingsPath::NotificationsSlack, "yes".into())
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::TypeMismatch {
                expected: ValueKind::Bool,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_choice() {
        let err = Settings::default()
            .with(SettingsPath::MonitoringInterval, "2m".into())
            .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidChoice { .. }));
    }

    #[test]
    fn test_path_round_trip_through_str() {
        for path in SettingsPath::ALL {
            assert_eq!(path.as_str().parse::<SettingsPath>().unwrap(), path);
        }
        assert!(matches!(
            "thresholds.cls".parse::<SettingsPath>(),
            Err(SettingsError::UnknownPath(_))
        ));
    }

    #[test]
    fn test_cycle_wraps() {
        let mut s = Settings::default();
        s.monitoring.interval = CheckInterval::OneHour;
        assert_eq!(
            s.cycled(SettingsPath::MonitoringInterval, true),
            Some(SettingValue::from("1m"))
        );
        assert_eq!(
            Settings::default().cycled(SettingsPath::Theme, false),
            Some(SettingValue::from("system"))
        );
        assert_eq!(
            Settings::default().cycled(SettingsPath::NotificationsWebhook, true),
            Some(SettingValue::Bool(true))
        );
        assert_eq!(Settings::default().cycled(SettingsPath::ThresholdsInp, true), None);
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["theme"], "light");
        assert_eq!(json["monitoring"]["interval"], "5m");
        assert_eq!(json["monitoring"]["retention"], "30d");
        assert_eq!(json["notifications"]["webhook"], false);
        assert_eq!(json["thresholds"]["tbt"], 300.0);
    }

    #[test]
    fn test_validate_rejects_negative_document() {
        let mut s = Settings::default();
        s.thresholds.inp = -5.0;
        assert!(s.validate().is_err());
        assert!(Settings::default().validate().is_ok());
    }
}
