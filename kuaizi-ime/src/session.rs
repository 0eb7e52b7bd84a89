//! The composition session.
//!
//! # Overview
//!
//! [`ImeSession`] owns everything one input method instance needs and is the
//! only entry point a host calls into:
//!
//! - pointer samples and timer ticks go through the [`GestureClassifier`]
//!   against the current [`KeyLayout`];
//! - the resulting gestures are resolved to keys and dispatched to the
//!   active [`KeyboardMode`];
//! - the layout is rebuilt when the keyboard, its candidates or a keyboard
//!   affecting option change;
//! - everything the host should react to is queued as [`InputMsg`]s and
//!   drained with [`take_msgs`](ImeSession::take_msgs).
//!
//! The session is single threaded and owned by the host's input thread.
//!
//! ## Failure semantics
//!
//! The input list is validated after every dispatch. A violated invariant is
//! logged at error level and ends the session: the call that broke it returns
//! [`ImeError::Invariant`] and every later call returns
//! [`ImeError::SessionAborted`]. The host is expected to start a new session.
//!
//! ## Usage
//!
//! ```
//! use std::time::{Duration, Instant};
//!
//! use kuaizi_ime::{
//!     ImeSession, KeyTable, KeyboardType,
//!     candidate::StaticCandidates,
//!     config::Configuration,
//!     gesture::PointerSample,
//! };
//!
//! let dict = StaticCandidates::new().with_words("ni", ["你", "泥"]);
//! let mut session = ImeSession::new(Configuration::new(), KeyTable::default(), dict);
//! session.start(KeyboardType::Pinyin)?;
//!
//! let mut now = Instant::now();
//! for letter in ["n", "i"] {
//!     let at = session.key_center(|key| key.text() == Some(letter)).expect("letter key");
//!     session.on_pointer(PointerSample::down(at, now))?;
//!     session.on_pointer(PointerSample::up(at, now + Duration::from_millis(50)))?;
//!     now += Duration::from_millis(500);
//! }
//!
//! assert_eq!(session.input_list().text(), "你");
//! # Ok::<(), kuaizi_ime::ImeError>(())
//! ```

use std::{mem, time::Instant};

use tracing::{debug, error};

use crate::{
    candidate::CandidateProvider,
    config::{ConfigKey, ConfigValue, Configuration, PersistenceLayer},
    error::ImeError,
    gesture::{GestureClassifier, GestureConfig, GestureEvent, GestureKind, PointerSample},
    input_list::InputList,
    key::{Key, KeyId, KeyboardType},
    key_layout::{KeyLayout, KeyLayoutSource, LayoutRequest},
    keyboard::{self, KeyMsg, KeyboardContext, KeyboardMode},
    msg::{InputMsg, KeyboardSnapshot, MsgBus},
    px::PxPosition,
    tree_log::TreeLog,
};

/// What the current layout was built from, besides the snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
struct LayoutInputs {
    candidates: Vec<String>,
    has_input: bool,
    can_revoke: bool,
}

/// One input method instance.
pub struct ImeSession {
    config: Configuration,
    layouts: Box<dyn KeyLayoutSource>,
    provider: Box<dyn CandidateProvider>,
    classifier: GestureClassifier,
    layout: KeyLayout,
    snapshot: KeyboardSnapshot,
    layout_inputs: LayoutInputs,
    mode: KeyboardMode,
    input_list: InputList,
    bus: MsgBus,
    log: TreeLog,
    pressed: Option<KeyId>,
    aborted: bool,
}

impl ImeSession {
    /// Creates a session on the pinyin keyboard.
    ///
    /// Changes already recorded in `config` are considered applied.
    pub fn new(
        config: Configuration,
        layouts: impl KeyLayoutSource + 'static,
        provider: impl CandidateProvider + 'static,
    ) -> Self {
        config.take_changes();
        let mode = KeyboardMode::default();
        let snapshot = KeyboardSnapshot {
            keyboard: mode.keyboard(),
            generation: 0,
            hand_mode: config.hand_mode(),
            xpad_enabled: config.is_enabled(ConfigKey::EnableXInputPad),
        };

        let mut session = Self {
            classifier: GestureClassifier::new(GestureConfig::from_configuration(&config)),
            layout: KeyLayout::new(mode.keyboard(), 0),
            snapshot,
            layout_inputs: LayoutInputs::default(),
            mode,
            input_list: InputList::new(),
            bus: MsgBus::new(),
            log: TreeLog::new(),
            pressed: None,
            aborted: false,
            config,
            layouts: Box::new(layouts),
            provider: Box::new(provider),
        };
        session.rebuild_layout();
        session
    }

    /// Starts `keyboard` with an empty input list.
    pub fn start(&mut self, keyboard: KeyboardType) -> Result<(), ImeError> {
        self.ensure_alive()?;
        self.classifier.reset();
        self.pressed = None;
        self.input_list.clear();
        self.mode = KeyboardMode::start(keyboard);
        self.rebuild_layout();
        self.bus.push(InputMsg::KeyboardStartDone {
            keyboard: self.snapshot,
        });
        Ok(())
    }

    /// Feeds a pointer sample.
    pub fn on_pointer(&mut self, sample: PointerSample) -> Result<(), ImeError> {
        self.ensure_alive()?;
        self.classifier.handle_sample(sample, &self.layout);
        self.drain_gestures()
    }

    /// Advances the long press timer to `now`.
    ///
    /// Hosts call this periodically while a press is in progress.
    pub fn on_timer(&mut self, now: Instant) -> Result<(), ImeError> {
        self.ensure_alive()?;
        self.classifier.handle_timer(now, &self.layout);
        self.drain_gestures()
    }

    /// Chooses the input at `position`, listing candidates for pinyin inputs.
    pub fn choose_input(&mut self, position: usize) -> Result<(), ImeError> {
        self.ensure_alive()?;
        self.run(|mode, ctx| (keyboard::choose_input(mode, position, ctx), ()));
        self.after_dispatch()?;
        self.refresh_layout();
        Ok(())
    }

    /// Inserts the offered completion at `index`.
    pub fn apply_completion(&mut self, index: usize) -> Result<bool, ImeError> {
        self.ensure_alive()?;
        let applied = self.run(|mode, ctx| {
            let applied = keyboard::apply_completion(index, ctx);
            (mode, applied)
        });
        self.after_dispatch()?;
        self.refresh_layout();
        Ok(applied)
    }

    /// Sets an option, returning whether its value changed.
    pub fn update_config(&mut self, key: ConfigKey, value: impl Into<ConfigValue>) -> Result<bool, ImeError> {
        self.ensure_alive()?;
        let changed = self.config.set(key, value);
        self.after_dispatch()?;
        Ok(changed)
    }

    /// Applies option changes made through other handles of the configuration.
    pub fn refresh_config(&mut self) -> Result<(), ImeError> {
        self.ensure_alive()?;
        self.after_dispatch()
    }

    /// Loads persisted options, returning the number of options that changed.
    pub fn bind_persistence(&mut self, layer: &impl PersistenceLayer) -> Result<usize, ImeError> {
        self.ensure_alive()?;
        let changed = self.config.bind(layer);
        self.after_dispatch()?;
        Ok(changed)
    }

    /// Applies the change notifications of a bound persistence layer.
    pub fn sync_persistence(&mut self, layer: &mut impl PersistenceLayer) -> Result<usize, ImeError> {
        self.ensure_alive()?;
        let changed = self.config.sync(layer);
        self.after_dispatch()?;
        Ok(changed)
    }

    /// Removes and returns the queued messages.
    pub fn take_msgs(&mut self) -> Vec<InputMsg> {
        self.bus.take_msgs()
    }

    /// The composition buffer.
    pub fn input_list(&self) -> &InputList {
        &self.input_list
    }

    /// The keys on screen.
    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    /// The keyboard on screen.
    pub fn snapshot(&self) -> KeyboardSnapshot {
        self.snapshot
    }

    /// The active keyboard.
    pub fn keyboard(&self) -> KeyboardType {
        self.mode.keyboard()
    }

    /// State of the dispatcher.
    pub fn mode(&self) -> &KeyboardMode {
        &self.mode
    }

    /// The options of this session.
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// The last rendered dispatch log.
    pub fn last_log(&self) -> Option<&str> {
        self.log.last_rendered()
    }

    /// Whether an invariant violation ended the session.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Center of the first key on screen matching `predicate`.
    pub fn key_center(&self, predicate: impl Fn(&Key) -> bool) -> Option<PxPosition> {
        self.layout
            .keys()
            .filter(|laid| predicate(&laid.key))
            .find_map(|laid| laid.bounds)
            .map(|bounds| bounds.center())
    }

    fn ensure_alive(&self) -> Result<(), ImeError> {
        if self.aborted {
            Err(ImeError::SessionAborted)
        } else {
            Ok(())
        }
    }

    fn run<R>(&mut self, f: impl FnOnce(KeyboardMode, &mut KeyboardContext<'_>) -> (KeyboardMode, R)) -> R {
        let mode = mem::take(&mut self.mode);
        let mut ctx = KeyboardContext {
            input_list: &mut self.input_list,
            config: &self.config,
            provider: self.provider.as_ref(),
            bus: &mut self.bus,
            log: &mut self.log,
        };
        let (mode, result) = f(mode, &mut ctx);
        self.mode = mode;
        result
    }

    fn drain_gestures(&mut self) -> Result<(), ImeError> {
        for event in self.classifier.take_events() {
            self.handle_gesture(event);
            self.after_dispatch()?;
        }
        if !self.classifier.is_pressed() {
            self.refresh_layout();
        }
        Ok(())
    }

    fn handle_gesture(&mut self, event: GestureEvent) {
        if event.kind == GestureKind::PressStart {
            self.pressed = event.target;
        }
        let key_id = match event.kind {
            GestureKind::PressStart | GestureKind::SingleTap { .. } | GestureKind::DoubleTap => event.target,
            _ => self.pressed.or(event.target),
        };
        if matches!(event.kind, GestureKind::PressEnd | GestureKind::PressCancel) {
            self.pressed = None;
        }

        // Keys of an older build never resolve: the gesture raced a rebuild.
        let Some(key) = key_id.and_then(|id| self.layout.find(id)).cloned() else {
            debug!(kind = ?event.kind, ?key_id, "gesture without a live key dropped");
            return;
        };
        let over = event
            .target
            .or(event.closed)
            .and_then(|id| self.layout.find(id))
            .cloned();

        let msg = KeyMsg {
            kind: event.kind,
            key: &key,
            over: over.as_ref(),
            position: event.position,
            timestamp: event.timestamp,
        };
        self.run(|mode, ctx| (keyboard::dispatch(mode, &msg, ctx), ()));
    }

    fn after_dispatch(&mut self) -> Result<(), ImeError> {
        self.apply_config_changes();

        let stale = self.mode.keyboard() != self.snapshot.keyboard
            || self.mode.candidates() != self.layout_inputs.candidates.as_slice();
        if stale {
            self.rebuild_layout();
        }

        if let Err(violation) = self.input_list.check_invariants() {
            error!(%violation, "input list invariant violated, aborting the session");
            self.aborted = true;
            return Err(violation.into());
        }
        Ok(())
    }

    fn apply_config_changes(&mut self) {
        let changes = self.config.take_changes();
        if changes.is_empty() {
            return;
        }

        let mut affects_keyboard = false;
        for change in changes {
            affects_keyboard |= change.key.affects_keyboard();
            self.bus.push(InputMsg::ConfigUpdateDone { change });
        }
        self.classifier
            .set_config(GestureConfig::from_configuration(&self.config));

        if affects_keyboard {
            let before = self.snapshot;
            self.rebuild_layout();
            self.bus.push(InputMsg::KeyboardConfigUpdateDone {
                before,
                after: self.snapshot,
            });
        }
    }

    /// Rebuilds when the state the control keys show has changed.
    fn refresh_layout(&mut self) {
        let has_input = !self.input_list.is_empty();
        let can_revoke = self.input_list.can_revoke_commit();
        if has_input != self.layout_inputs.has_input || can_revoke != self.layout_inputs.can_revoke {
            self.rebuild_layout();
        }
    }

    fn rebuild_layout(&mut self) {
        let inputs = LayoutInputs {
            candidates: self.mode.candidates().to_vec(),
            has_input: !self.input_list.is_empty(),
            can_revoke: self.input_list.can_revoke_commit(),
        };
        let snapshot = KeyboardSnapshot {
            keyboard: self.mode.keyboard(),
            generation: self.snapshot.generation.wrapping_add(1),
            hand_mode: self.config.hand_mode(),
            xpad_enabled: self.config.is_enabled(ConfigKey::EnableXInputPad),
        };
        let request = LayoutRequest {
            keyboard: snapshot.keyboard,
            generation: snapshot.generation,
            hand_mode: snapshot.hand_mode,
            xpad_enabled: snapshot.xpad_enabled,
            candidates: &inputs.candidates,
            has_input: inputs.has_input,
            can_revoke: inputs.can_revoke,
        };

        self.layout = self.layouts.build(&request);
        debug!(
            keyboard = ?snapshot.keyboard,
            generation = snapshot.generation,
            keys = self.layout.len(),
            "layout rebuilt"
        );
        self.snapshot = snapshot;
        self.layout_inputs = inputs;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        candidate::StaticCandidates,
        config::{HandMode, MemoryPersistence},
        key::CtrlKind,
        key_table::KeyTable,
    };

    struct Driver {
        session: ImeSession,
        now: Instant,
    }

    impl Driver {
        fn new(keyboard: KeyboardType) -> Self {
            let dict = StaticCandidates::new()
                .with_words("ni", ["你", "泥"])
                .with_words("hao", ["好", "号"]);
            let mut session = ImeSession::new(Configuration::new(), KeyTable::default(), dict);
            session.start(keyboard).expect("session starts");
            session.take_msgs();
            Self {
                session,
                now: Instant::now(),
            }
        }

        fn center(&self, predicate: impl Fn(&Key) -> bool) -> PxPosition {
            self.session.key_center(predicate).expect("key on screen")
        }

        fn tap_at(&mut self, at: PxPosition) {
            self.session
                .on_pointer(PointerSample::down(at, self.now))
                .expect("down");
            self.session
                .on_pointer(PointerSample::up(at, self.now + Duration::from_millis(40)))
                .expect("up");
            self.now += Duration::from_millis(500);
        }

        fn tap_text(&mut self, text: &str) {
            let at = self.center(|key| key.text() == Some(text) && key.char_kind().is_some());
            self.tap_at(at);
        }

        fn tap_ctrl(&mut self, ctrl: CtrlKind) {
            let at = self.center(|key| key.ctrl_kind() == Some(ctrl));
            self.tap_at(at);
        }
    }

    #[test]
    fn test_direct_tap_commits_character() {
        let mut driver = Driver::new(KeyboardType::Latin);

        driver.tap_text("a");

        let list = driver.session.input_list();
        assert_eq!(list.text(), "a");
        assert_eq!(list.len(), 3);
        assert!(!list.has_pending());
    }

    #[test]
    fn test_pinyin_commit_flow() {
        let mut driver = Driver::new(KeyboardType::Pinyin);

        for letter in ["n", "i", "h", "a", "o"] {
            driver.tap_text(letter);
        }
        // "nihao" is no known spelling, so confirm drops it.
        driver.tap_ctrl(CtrlKind::ConfirmInput);
        assert!(driver.session.input_list().is_empty());

        for letter in ["n", "i"] {
            driver.tap_text(letter);
        }
        driver.tap_ctrl(CtrlKind::Space);
        driver.tap_ctrl(CtrlKind::CommitInputList);

        let msgs = driver.session.take_msgs();
        assert!(msgs.contains(&InputMsg::InputListCommitDoing {
            text: "你".to_owned(),
            replacements: Vec::new(),
        }));
        assert!(driver.session.input_list().is_empty());
        assert!(driver.session.input_list().can_revoke_commit());
    }

    #[test]
    fn test_cancelled_slide_leaves_list_untouched() {
        let mut driver = Driver::new(KeyboardType::Pinyin);
        let n = driver.center(|key| key.text() == Some("n"));
        let i = driver.center(|key| key.text() == Some("i"));
        let t0 = driver.now;

        let session = &mut driver.session;
        session.on_pointer(PointerSample::down(n, t0)).expect("down");
        session
            .on_pointer(PointerSample::moved(i, t0 + Duration::from_millis(20)))
            .expect("move");
        assert_eq!(session.input_list().pending_spelling().as_deref(), Some("ni"));
        session
            .on_pointer(PointerSample::cancel(i, t0 + Duration::from_millis(60)))
            .expect("cancel");

        assert!(session.input_list().is_empty());
        assert!(!session.input_list().has_pending());
        assert!(!session
            .take_msgs()
            .iter()
            .any(|msg| matches!(msg, InputMsg::InputCandidateChooseDone { .. })));
    }

    #[test]
    fn test_commit_key_follows_list_state() {
        let mut driver = Driver::new(KeyboardType::Latin);
        let commit_enabled = |session: &ImeSession| {
            session
                .layout()
                .find_by(|key| key.ctrl_kind() == Some(CtrlKind::CommitInputList))
                .is_some_and(|key| !key.is_disabled())
        };
        assert!(!commit_enabled(&driver.session));
        let generation = driver.session.snapshot().generation;

        driver.tap_text("a");

        assert!(commit_enabled(&driver.session));
        assert!(driver.session.snapshot().generation > generation);
    }

    #[test]
    fn test_switch_keyboard_rebuilds_layout() {
        let mut driver = Driver::new(KeyboardType::Pinyin);

        driver.tap_ctrl(CtrlKind::SwitchKeyboard(KeyboardType::Math));

        assert_eq!(driver.session.keyboard(), KeyboardType::Math);
        assert_eq!(driver.session.layout().keyboard(), KeyboardType::Math);
        assert!(driver.session.take_msgs().contains(&InputMsg::KeyboardSwitchDone {
            from: KeyboardType::Pinyin,
            to: KeyboardType::Math,
        }));
    }

    #[test]
    fn test_stale_key_is_dropped() {
        let mut driver = Driver::new(KeyboardType::Latin);
        let old_a = driver
            .session
            .layout()
            .find_by(|key| key.text() == Some("a"))
            .map(Key::id)
            .expect("a on screen");

        driver.session.update_config(ConfigKey::HandMode, HandMode::Left).expect("config");

        assert!(driver.session.layout().find(old_a).is_none());
        let event = GestureEvent::tap(old_a, PxPosition::default(), driver.now);
        driver.session.handle_gesture(event);
        assert!(driver.session.input_list().is_empty());
    }

    #[test]
    fn test_config_update_reports_keyboard_change() {
        let mut driver = Driver::new(KeyboardType::Pinyin);

        assert!(driver.session.update_config(ConfigKey::HandMode, HandMode::Left).expect("config"));
        assert!(!driver.session.update_config(ConfigKey::HandMode, HandMode::Left).expect("config"));

        let msgs = driver.session.take_msgs();
        let updates = msgs
            .iter()
            .filter(|msg| matches!(msg, InputMsg::ConfigUpdateDone { .. }))
            .count();
        assert_eq!(updates, 1);
        let rebuilt = msgs.iter().find_map(|msg| match msg {
            InputMsg::KeyboardConfigUpdateDone { before, after } => Some((*before, *after)),
            _ => None,
        });
        let (before, after) = rebuilt.expect("keyboard rebuilt");
        assert_eq!(before.hand_mode, HandMode::Right);
        assert_eq!(after.hand_mode, HandMode::Left);
    }

    #[test]
    fn test_non_keyboard_option_keeps_layout() {
        let mut driver = Driver::new(KeyboardType::Pinyin);
        let generation = driver.session.snapshot().generation;

        driver
            .session
            .update_config(ConfigKey::DisableKeyClickedAudio, true)
            .expect("config");

        assert_eq!(driver.session.snapshot().generation, generation);
    }

    #[test]
    fn test_bind_persistence_applies_values() {
        let mut driver = Driver::new(KeyboardType::Pinyin);
        let mut layer = MemoryPersistence::new();
        layer.store("hand_mode", serde_json::json!("left"));

        driver.session.bind_persistence(&layer).expect("bind");

        assert_eq!(driver.session.config().hand_mode(), HandMode::Left);
        assert_eq!(driver.session.snapshot().hand_mode, HandMode::Left);
    }

    #[test]
    fn test_long_press_backspace_repeats() {
        let mut driver = Driver::new(KeyboardType::Latin);
        driver.tap_text("a");
        driver.tap_ctrl(CtrlKind::Space);
        driver.tap_text("b");
        assert_eq!(driver.session.input_list().text(), "a b");

        let at = driver.center(|key| key.ctrl_kind() == Some(CtrlKind::Backspace));
        let start = driver.now;
        driver.session.on_pointer(PointerSample::down(at, start)).expect("down");
        driver
            .session
            .on_timer(start + Duration::from_millis(520))
            .expect("timer");
        driver
            .session
            .on_pointer(PointerSample::up(at, start + Duration::from_millis(530)))
            .expect("up");

        assert!(driver.session.input_list().is_empty());
    }

    #[test]
    fn test_calls_after_abort_fail() {
        let mut driver = Driver::new(KeyboardType::Pinyin);
        driver.session.aborted = true;

        assert_eq!(driver.session.start(KeyboardType::Latin), Err(ImeError::SessionAborted));
        assert_eq!(
            driver.session.on_timer(Instant::now()),
            Err(ImeError::SessionAborted)
        );
    }
}
