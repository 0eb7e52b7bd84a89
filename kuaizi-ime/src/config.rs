//! Option storage.
//!
//! # Overview
//!
//! [`Configuration`] is a two-layer option map: the entries set on a store
//! itself, and an optional parent store that answers every key the store has
//! not set. [`Configuration::copy`] creates such a child; it is meant for
//! scoped "pending settings" edits that can be merged back or discarded.
//!
//! Change notification is explicit. Every `set`/`unset`/`merge` that
//! actually changes the effective value of a key records one
//! [`ConfigChange`] in the store, drained with [`Configuration::take_changes`].
//! Writing the value a key already has records nothing.
//!
//! ## Persistence
//!
//! A [`PersistenceLayer`] exposes raw persisted entries as JSON values.
//! [`Configuration::bind`] fills every known option with its default and then
//! applies the persisted entries through [`ConfigKey::parse`];
//! [`Configuration::sync`] applies later change notifications the same way.
//! Values that fail to parse fall back to the option's default.
//!
//! ## Usage
//!
//! ```
//! use kuaizi_ime::config::{ConfigKey, ConfigValue, Configuration, HandMode};
//!
//! let config = Configuration::new();
//! assert!(config.set(ConfigKey::HandMode, HandMode::Left));
//! assert!(!config.set(ConfigKey::HandMode, HandMode::Left));
//!
//! let scratch = config.copy();
//! scratch.set(ConfigKey::EnableXInputPad, true);
//! assert_eq!(scratch.hand_mode(), HandMode::Left);
//! assert!(!config.is_enabled(ConfigKey::EnableXInputPad));
//!
//! assert_eq!(config.merge(&scratch), 1);
//! assert_eq!(config.get(ConfigKey::EnableXInputPad), Some(ConfigValue::Bool(true)));
//! ```

use std::{collections::VecDeque, sync::Arc, time::Duration};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Maximum number of undrained change records kept by a store.
const KEEP_CHANGES_COUNT: usize = 64;

/// Which hand holds the device; the control column sits on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandMode {
    /// Left hand mode.
    Left,
    /// Right hand mode.
    #[default]
    Right,
}

impl HandMode {
    /// The other hand.
    pub fn flipped(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Screen orientation the keyboard is laid out for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Portrait.
    #[default]
    Portrait,
    /// Landscape.
    Landscape,
}

/// Keyboard color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    /// Light theme.
    Light,
    /// Night theme.
    Night,
    /// Follow the system setting.
    #[default]
    FollowSystem,
}

/// Input method subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImeSubtype {
    /// Simplified Chinese.
    #[default]
    Hans,
    /// Traditional Chinese.
    Hant,
}

/// A typed option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConfigValue {
    /// A switch.
    Bool(bool),
    /// An integer amount.
    Int(i64),
    /// Free text.
    Text(String),
    /// A [`HandMode`].
    HandMode(HandMode),
    /// An [`Orientation`].
    Orientation(Orientation),
    /// A [`Theme`].
    Theme(Theme),
    /// An [`ImeSubtype`].
    Subtype(ImeSubtype),
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<HandMode> for ConfigValue {
    fn from(value: HandMode) -> Self {
        Self::HandMode(value)
    }
}

impl From<Orientation> for ConfigValue {
    fn from(value: Orientation) -> Self {
        Self::Orientation(value)
    }
}

impl From<Theme> for ConfigValue {
    fn from(value: Theme) -> Self {
        Self::Theme(value)
    }
}

impl From<ImeSubtype> for ConfigValue {
    fn from(value: ImeSubtype) -> Self {
        Self::Subtype(value)
    }
}

/// Why a persisted raw value could not be used for an option.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigParseError {
    /// The raw value has the wrong JSON type.
    #[error("option `{key}` expects {expected}, found `{found}`")]
    TypeMismatch {
        /// Persisted option name.
        key: &'static str,
        /// Expected value kind.
        expected: &'static str,
        /// The raw value.
        found: String,
    },
    /// The raw value names no variant of the option's enumeration.
    #[error("option `{key}` has no variant named `{value}`")]
    UnknownVariant {
        /// Persisted option name.
        key: &'static str,
        /// The unmatched name.
        value: String,
    },
}

/// The known options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigKey {
    /// Input method subtype.
    ImeSubtype,
    /// Screen orientation.
    Orientation,
    /// Whether the host field is single line.
    SingleLineInput,
    /// Color theme.
    Theme,
    /// Left or right hand mode.
    HandMode,
    /// Do not keep user input statistics.
    DisableUserInputData,
    /// No click sound on key activity.
    DisableKeyClickedAudio,
    /// No key animations.
    DisableKeyAnimation,
    /// No sound when paging candidates.
    DisableInputCandidatesPagingAudio,
    /// No popup tips over pressed keys.
    DisableInputKeyPopupTips,
    /// No slide trail rendering.
    DisableGestureSlippingTrail,
    /// Prefer the variant form of candidates.
    EnableCandidateVariantFirst,
    /// Use the radial pad on the pinyin keyboard.
    EnableXInputPad,
    /// Share the pinyin pad layout with latin input.
    EnableLatinUsePinyinKeysInXInputPad,
    /// Work around the desktop swipe-up gesture.
    AdaptDesktopSwipeUpGesture,
    /// Hold time before a press becomes a long press, in milliseconds.
    LongPressTimeoutMs,
    /// Interval between long press ticks, in milliseconds.
    LongPressTickIntervalMs,
    /// Maximum gap between consecutive taps, in milliseconds.
    DoubleTapTimeoutMs,
    /// Maximum slide duration reported as a flip, in milliseconds.
    FlipTimeoutMs,
    /// Slop radius before a slide starts, in pixels.
    SlideThresholdPx,
}

impl ConfigKey {
    /// Every known option.
    pub const ALL: [ConfigKey; 20] = [
        Self::ImeSubtype,
        Self::Orientation,
        Self::SingleLineInput,
        Self::Theme,
        Self::HandMode,
        Self::DisableUserInputData,
        Self::DisableKeyClickedAudio,
        Self::DisableKeyAnimation,
        Self::DisableInputCandidatesPagingAudio,
        Self::DisableInputKeyPopupTips,
        Self::DisableGestureSlippingTrail,
        Self::EnableCandidateVariantFirst,
        Self::EnableXInputPad,
        Self::EnableLatinUsePinyinKeysInXInputPad,
        Self::AdaptDesktopSwipeUpGesture,
        Self::LongPressTimeoutMs,
        Self::LongPressTickIntervalMs,
        Self::DoubleTapTimeoutMs,
        Self::FlipTimeoutMs,
        Self::SlideThresholdPx,
    ];

    /// Name of the option in the persistence layer.
    pub fn name(self) -> &'static str {
        match self {
            Self::ImeSubtype => "ime_subtype",
            Self::Orientation => "orientation",
            Self::SingleLineInput => "single_line_input",
            Self::Theme => "theme",
            Self::HandMode => "hand_mode",
            Self::DisableUserInputData => "disable_user_input_data",
            Self::DisableKeyClickedAudio => "disable_key_clicked_audio",
            Self::DisableKeyAnimation => "disable_key_animation",
            Self::DisableInputCandidatesPagingAudio => "disable_input_candidates_paging_audio",
            Self::DisableInputKeyPopupTips => "disable_input_key_popup_tips",
            Self::DisableGestureSlippingTrail => "disable_gesture_slipping_trail",
            Self::EnableCandidateVariantFirst => "enable_candidate_variant_first",
            Self::EnableXInputPad => "enable_x_input_pad",
            Self::EnableLatinUsePinyinKeysInXInputPad => {
                "enable_latin_use_pinyin_keys_in_x_input_pad"
            }
            Self::AdaptDesktopSwipeUpGesture => "adapt_desktop_swipe_up_gesture",
            Self::LongPressTimeoutMs => "long_press_timeout_ms",
            Self::LongPressTickIntervalMs => "long_press_tick_interval_ms",
            Self::DoubleTapTimeoutMs => "double_tap_timeout_ms",
            Self::FlipTimeoutMs => "flip_timeout_ms",
            Self::SlideThresholdPx => "slide_threshold_px",
        }
    }

    /// Looks an option up by its persisted name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }

    /// The value an option has when nothing set it.
    pub fn default_value(self) -> ConfigValue {
        match self {
            Self::ImeSubtype => ImeSubtype::default().into(),
            Self::Orientation => Orientation::default().into(),
            Self::Theme => Theme::default().into(),
            Self::HandMode => HandMode::default().into(),
            Self::LongPressTimeoutMs => ConfigValue::Int(200),
            Self::LongPressTickIntervalMs => ConfigValue::Int(100),
            Self::DoubleTapTimeoutMs => ConfigValue::Int(300),
            Self::FlipTimeoutMs => ConfigValue::Int(400),
            Self::SlideThresholdPx => ConfigValue::Int(8),
            _ => ConfigValue::Bool(false),
        }
    }

    /// Whether changing this option requires rebuilding the keyboard.
    pub fn affects_keyboard(self) -> bool {
        matches!(
            self,
            Self::HandMode
                | Self::Orientation
                | Self::Theme
                | Self::EnableXInputPad
                | Self::EnableLatinUsePinyinKeysInXInputPad
                | Self::LongPressTimeoutMs
                | Self::LongPressTickIntervalMs
                | Self::DoubleTapTimeoutMs
                | Self::FlipTimeoutMs
                | Self::SlideThresholdPx
        )
    }

    /// Parses a raw persisted value for this option.
    ///
    /// A raw value of the option's own type is taken as is, enumerations also
    /// match by variant name.
    pub fn parse(self, raw: &serde_json::Value) -> Result<ConfigValue, ConfigParseError> {
        let mismatch = |expected: &'static str| ConfigParseError::TypeMismatch {
            key: self.name(),
            expected,
            found: raw.to_string(),
        };

        match self.default_value() {
            ConfigValue::Bool(_) => raw.as_bool().map(ConfigValue::Bool).ok_or_else(|| mismatch("a boolean")),
            ConfigValue::Int(_) => raw
                .as_i64()
                .filter(|value| *value >= 0)
                .map(ConfigValue::Int)
                .ok_or_else(|| mismatch("a non-negative integer")),
            ConfigValue::Text(_) => raw
                .as_str()
                .map(ConfigValue::from)
                .ok_or_else(|| mismatch("a string")),
            ConfigValue::HandMode(_) => self.parse_variant::<HandMode>(raw).map(ConfigValue::HandMode),
            ConfigValue::Orientation(_) => {
                self.parse_variant::<Orientation>(raw).map(ConfigValue::Orientation)
            }
            ConfigValue::Theme(_) => self.parse_variant::<Theme>(raw).map(ConfigValue::Theme),
            ConfigValue::Subtype(_) => self.parse_variant::<ImeSubtype>(raw).map(ConfigValue::Subtype),
        }
    }

    fn parse_variant<T: serde::de::DeserializeOwned>(
        self,
        raw: &serde_json::Value,
    ) -> Result<T, ConfigParseError> {
        let Some(name) = raw.as_str() else {
            return Err(ConfigParseError::TypeMismatch {
                key: self.name(),
                expected: "a variant name",
                found: raw.to_string(),
            });
        };
        serde_json::from_value(raw.clone()).map_err(|_| ConfigParseError::UnknownVariant {
            key: self.name(),
            value: name.to_owned(),
        })
    }
}

/// A real change of an option's effective value.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigChange {
    /// The changed option.
    pub key: ConfigKey,
    /// Value before the change, `None` when unset.
    pub old: Option<ConfigValue>,
    /// Value after the change, `None` when unset.
    pub new: Option<ConfigValue>,
}

#[derive(Debug, Default)]
struct ConfigLayer {
    vars: FxHashMap<ConfigKey, ConfigValue>,
    parent: Option<Configuration>,
    changes: VecDeque<ConfigChange>,
}

impl ConfigLayer {
    fn push_change(&mut self, change: ConfigChange) {
        debug!(key = change.key.name(), old = ?change.old, new = ?change.new, "config changed");
        self.changes.push_back(change);
        if self.changes.len() > KEEP_CHANGES_COUNT {
            warn!("config change queue overflow, dropping the oldest change");
            self.changes.pop_front();
        }
    }
}

/// A shared option store.
///
/// Cloning yields another handle to the same store.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    inner: Arc<RwLock<ConfigLayer>>,
}

impl Configuration {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a child store reading through to this one.
    ///
    /// The child sees later changes of the parent for every key it has not
    /// set itself. Writes to the child stay local, and changes of the parent
    /// are recorded only in the parent.
    pub fn copy(&self) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ConfigLayer {
                parent: Some(self.clone()),
                ..ConfigLayer::default()
            })),
        }
    }

    /// Whether the option has a value here or in a parent.
    pub fn has(&self, key: ConfigKey) -> bool {
        let inner = self.inner.read();
        inner.vars.contains_key(&key) || inner.parent.as_ref().is_some_and(|parent| parent.has(key))
    }

    /// The effective value of the option.
    pub fn get(&self, key: ConfigKey) -> Option<ConfigValue> {
        let inner = self.inner.read();
        match inner.vars.get(&key) {
            Some(value) => Some(value.clone()),
            None => inner.parent.as_ref().and_then(|parent| parent.get(key)),
        }
    }

    /// The effective value, or the option's default.
    pub fn get_or_default(&self, key: ConfigKey) -> ConfigValue {
        self.get(key).unwrap_or_else(|| key.default_value())
    }

    /// Sets the option locally.
    ///
    /// Returns `false`, recording nothing, when the effective value already
    /// equals `value`.
    pub fn set(&self, key: ConfigKey, value: impl Into<ConfigValue>) -> bool {
        let value = value.into();
        let old = self.get(key);
        if old.as_ref() == Some(&value) {
            return false;
        }

        let mut inner = self.inner.write();
        inner.vars.insert(key, value.clone());
        inner.push_change(ConfigChange {
            key,
            old,
            new: Some(value),
        });
        true
    }

    /// Removes the local value of the option.
    ///
    /// Returns whether a local value existed. A change is recorded only when
    /// the effective value differs afterwards.
    pub fn unset(&self, key: ConfigKey) -> bool {
        let old = self.get(key);
        let removed = self.inner.write().vars.remove(&key).is_some();
        if !removed {
            return false;
        }

        let new = self.get(key);
        if new != old {
            self.inner.write().push_change(ConfigChange { key, old, new });
        }
        true
    }

    /// The options set on this store itself, excluding the parent's.
    pub fn local_entries(&self) -> Vec<(ConfigKey, ConfigValue)> {
        let inner = self.inner.read();
        let mut entries: Vec<_> = inner
            .vars
            .iter()
            .map(|(key, value)| (*key, value.clone()))
            .collect();
        entries.sort_by_key(|(key, _)| ConfigKey::ALL.iter().position(|k| k == key));
        entries
    }

    /// Applies every local entry of `other` through [`set`](Self::set).
    ///
    /// Returns the number of options whose effective value changed.
    pub fn merge(&self, other: &Configuration) -> usize {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return 0;
        }
        other
            .local_entries()
            .into_iter()
            .filter(|(key, value)| self.set(*key, value.clone()))
            .count()
    }

    /// Removes and returns the recorded changes in order.
    pub fn take_changes(&self) -> Vec<ConfigChange> {
        self.inner.write().changes.drain(..).collect()
    }

    /// Whether a switch option is on.
    pub fn is_enabled(&self, key: ConfigKey) -> bool {
        matches!(self.get_or_default(key), ConfigValue::Bool(true))
    }

    /// The configured hand mode.
    pub fn hand_mode(&self) -> HandMode {
        match self.get_or_default(ConfigKey::HandMode) {
            ConfigValue::HandMode(mode) => mode,
            _ => HandMode::default(),
        }
    }

    /// The configured orientation.
    pub fn orientation(&self) -> Orientation {
        match self.get_or_default(ConfigKey::Orientation) {
            ConfigValue::Orientation(orientation) => orientation,
            _ => Orientation::default(),
        }
    }

    /// The configured theme.
    pub fn theme(&self) -> Theme {
        match self.get_or_default(ConfigKey::Theme) {
            ConfigValue::Theme(theme) => theme,
            _ => Theme::default(),
        }
    }

    /// The configured subtype.
    pub fn subtype(&self) -> ImeSubtype {
        match self.get_or_default(ConfigKey::ImeSubtype) {
            ConfigValue::Subtype(subtype) => subtype,
            _ => ImeSubtype::default(),
        }
    }

    /// An integer option read as milliseconds.
    pub fn millis(&self, key: ConfigKey) -> Duration {
        Duration::from_millis(self.non_negative(key))
    }

    /// An integer option read as pixels.
    pub fn pixels(&self, key: ConfigKey) -> f32 {
        self.non_negative(key) as f32
    }

    fn non_negative(&self, key: ConfigKey) -> u64 {
        let value = match (self.get_or_default(key), key.default_value()) {
            (ConfigValue::Int(value), _) | (_, ConfigValue::Int(value)) => value,
            _ => 0,
        };
        value.max(0) as u64
    }

    /// Binds the store to a persistence layer.
    ///
    /// Every known option without a value gets its default, then every
    /// persisted entry is parsed and applied. Returns the number of real
    /// changes.
    pub fn bind(&self, layer: &impl PersistenceLayer) -> usize {
        let defaults = ConfigKey::ALL
            .into_iter()
            .filter(|key| !self.has(*key))
            .filter(|key| self.set(*key, key.default_value()))
            .count();

        let persisted = layer
            .entries()
            .into_iter()
            .filter(|(name, raw)| self.apply_raw(name, raw))
            .count();

        defaults + persisted
    }

    /// Applies the pending change notifications of a bound persistence layer.
    ///
    /// A `null` raw value resets the option to its default. Returns the
    /// number of real changes.
    pub fn sync(&self, layer: &mut impl PersistenceLayer) -> usize {
        layer
            .take_notifications()
            .into_iter()
            .filter(|(name, raw)| self.apply_raw(name, raw))
            .count()
    }

    fn apply_raw(&self, name: &str, raw: &serde_json::Value) -> bool {
        let Some(key) = ConfigKey::from_name(name) else {
            debug!(name, "ignoring unknown persisted option");
            return false;
        };

        let value = if raw.is_null() {
            key.default_value()
        } else {
            key.parse(raw).unwrap_or_else(|error| {
                warn!(%error, "falling back to the default value");
                key.default_value()
            })
        };
        self.set(key, value)
    }
}

/// Storage the configuration is persisted in.
pub trait PersistenceLayer {
    /// Every persisted entry as `(option name, raw value)`.
    fn entries(&self) -> Vec<(String, serde_json::Value)>;

    /// Removes and returns the entries changed since the last call.
    fn take_notifications(&mut self) -> Vec<(String, serde_json::Value)>;
}

/// An in-memory [`PersistenceLayer`].
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    entries: FxHashMap<String, serde_json::Value>,
    notifications: VecDeque<(String, serde_json::Value)>,
}

impl MemoryPersistence {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a raw value and queues a change notification for it.
    pub fn store(&mut self, name: impl Into<String>, raw: serde_json::Value) {
        let name = name.into();
        self.entries.insert(name.clone(), raw.clone());
        self.notifications.push_back((name, raw));
    }

    /// Removes a stored value, notifying it as `null`.
    pub fn remove(&mut self, name: &str) {
        if self.entries.remove(name).is_some() {
            self.notifications
                .push_back((name.to_owned(), serde_json::Value::Null));
        }
    }
}

impl PersistenceLayer for MemoryPersistence {
    fn entries(&self) -> Vec<(String, serde_json::Value)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(name, raw)| (name.clone(), raw.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    fn take_notifications(&mut self) -> Vec<(String, serde_json::Value)> {
        self.notifications.drain(..).collect()
    }
}
