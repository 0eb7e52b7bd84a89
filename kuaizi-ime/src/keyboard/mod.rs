//! Key message dispatch.
//!
//! # Overview
//!
//! Every active keyboard runs one state machine, modeled as the
//! [`KeyboardMode`] value. [`dispatch`] is a total function of the current
//! mode and a [`KeyMsg`]: it mutates the [`InputList`], pushes outward
//! messages onto the [`MsgBus`] and returns the next mode.
//!
//! Control keys behave the same on every keyboard and are handled here; the
//! per keyboard transition tables live in the submodules:
//!
//! - `direct`: latin, number, symbol and emoji keys committed as typed
//! - `pinyin`: spelling composition, by taps or by sliding over letters
//! - `candidates`: choosing a ranked word for a pinyin input
//! - `math`: arithmetic expressions composed in a nested list
//! - `editor`: cursor locating and range selecting in the host editor
//!
//! ## Failure semantics
//!
//! Nothing here fails. Messages that make no sense in the current state
//! (a commit with nothing to commit, a candidate for an input that is gone)
//! leave everything as it was.

mod candidates;
mod direct;
mod editor;
mod math;
mod pinyin;

use std::{mem, time::Instant};

use tracing::debug;

use crate::{
    candidate::CandidateProvider,
    config::{ConfigKey, Configuration},
    gesture::GestureKind,
    input::{CharInput, Input},
    input_list::InputList,
    key::{CharKind, CtrlKind, EditorAction, Key, KeyId, KeyKind, KeyboardType},
    key_table::MAX_CANDIDATES,
    motion::Motion,
    msg::{InputAudio, InputMsg, MsgBus},
    px::PxPosition,
    tree_log::TreeLog,
};

/// State of the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyboardMode {
    /// Keys are committed as typed.
    Direct(KeyboardType),
    /// Pinyin spelling.
    Pinyin {
        /// The letter last appended by slide-to-spell, while a slide lasts.
        slide: Option<KeyId>,
    },
    /// Choosing a word for the pinyin input at `position`.
    Candidates {
        /// Position of the input the candidates are for.
        position: usize,
        /// Ranked candidates on the keyboard.
        candidates: Vec<String>,
    },
    /// Arithmetic expression composition.
    Math,
    /// Host editor operations.
    Editor {
        /// Start and current motion of a range selection slide.
        anchors: Option<(Motion, Motion)>,
    },
    /// Sliding the cursor locator key.
    CursorLocating {
        /// Where the slide started.
        anchor: Motion,
        /// The mode to return to when the slide ends.
        resume: Box<KeyboardMode>,
    },
}

impl Default for KeyboardMode {
    fn default() -> Self {
        Self::start(KeyboardType::Pinyin)
    }
}

impl KeyboardMode {
    /// The initial mode of a keyboard.
    pub fn start(keyboard: KeyboardType) -> Self {
        match keyboard {
            KeyboardType::Pinyin => Self::Pinyin { slide: None },
            KeyboardType::PinyinCandidates => Self::Candidates {
                position: 0,
                candidates: Vec::new(),
            },
            KeyboardType::Math => Self::Math,
            KeyboardType::Editor => Self::Editor { anchors: None },
            KeyboardType::Latin | KeyboardType::Number | KeyboardType::Symbol | KeyboardType::Emoji => {
                Self::Direct(keyboard)
            }
        }
    }

    /// The keyboard this mode runs on.
    pub fn keyboard(&self) -> KeyboardType {
        match self {
            Self::Direct(keyboard) => *keyboard,
            Self::Pinyin { .. } => KeyboardType::Pinyin,
            Self::Candidates { .. } => KeyboardType::PinyinCandidates,
            Self::Math => KeyboardType::Math,
            Self::Editor { .. } => KeyboardType::Editor,
            Self::CursorLocating { resume, .. } => resume.keyboard(),
        }
    }

    /// Candidates the keyboard lists.
    pub fn candidates(&self) -> &[String] {
        match self {
            Self::Candidates { candidates, .. } => candidates,
            Self::CursorLocating { resume, .. } => resume.candidates(),
            _ => &[],
        }
    }

    /// The mode a finished interaction returns to.
    fn home(&self) -> Self {
        match self {
            Self::Candidates { .. } => Self::start(KeyboardType::Pinyin),
            Self::CursorLocating { resume, .. } => resume.home(),
            mode => Self::start(mode.keyboard()),
        }
    }
}

/// A gesture resolved against the current layout.
#[derive(Debug, Clone, Copy)]
pub struct KeyMsg<'a> {
    /// What happened.
    pub kind: GestureKind,
    /// The key the gesture belongs to: the tapped key, or the pressed key for
    /// long presses and slides.
    pub key: &'a Key,
    /// The key under or nearest to the finger.
    pub over: Option<&'a Key>,
    /// Where it happened.
    pub position: PxPosition,
    /// When it happened.
    pub timestamp: Instant,
}

impl KeyMsg<'_> {
    fn is_tap(&self) -> bool {
        matches!(self.kind, GestureKind::SingleTap { .. })
    }
}

/// What a dispatch may touch.
pub struct KeyboardContext<'a> {
    /// The composition buffer.
    pub input_list: &'a mut InputList,
    /// Options.
    pub config: &'a Configuration,
    /// The dictionary.
    pub provider: &'a dyn CandidateProvider,
    /// Outward messages.
    pub bus: &'a mut MsgBus,
    /// Nested debug log.
    pub log: &'a mut TreeLog,
}

impl KeyboardContext<'_> {
    fn notify_list_update(&mut self) {
        self.bus.push(InputMsg::InputListUpdateDone {
            text: self.input_list.text(),
            selected: self.input_list.selected_position(),
        });
    }
}

/// Feeds one key message to the mode's state machine.
#[tracing::instrument(level = "debug", skip_all, fields(keyboard = ?mode.keyboard(), key = ?msg.key.id()))]
pub fn dispatch(mode: KeyboardMode, msg: &KeyMsg<'_>, ctx: &mut KeyboardContext<'_>) -> KeyboardMode {
    ctx.log.begin(format!("{:?} on {:?}", msg.kind, msg.key.kind()));
    feedback(msg, ctx);

    let previous = mode.clone();
    let next = if msg.key.is_disabled() {
        ctx.log.debug("key is disabled");
        mode
    } else {
        match mode {
            KeyboardMode::CursorLocating { anchor, resume } => {
                editor::on_cursor_locating(anchor, *resume, msg, ctx)
            }
            mode if msg.key.ctrl_kind().is_some() => on_ctrl(mode, msg, ctx),
            KeyboardMode::Direct(keyboard) => direct::on_msg(keyboard, msg, ctx),
            KeyboardMode::Pinyin { slide } => pinyin::on_msg(slide, msg, ctx),
            KeyboardMode::Candidates {
                position,
                candidates,
            } => candidates::on_msg(position, candidates, msg, ctx),
            KeyboardMode::Math => math::on_msg(msg, ctx),
            KeyboardMode::Editor { anchors } => editor::on_msg(anchors, msg, ctx),
        }
    };

    report_transition(&previous, &next, ctx);
    ctx.log.end();
    next
}

/// Chooses the input at `position`.
///
/// Choosing a pinyin input lists its candidates on the candidate keyboard.
pub fn choose_input(mode: KeyboardMode, position: usize, ctx: &mut KeyboardContext<'_>) -> KeyboardMode {
    ctx.log.begin(format!("choose input at {position}"));
    finalize(&mode, ctx);

    let previous = mode.clone();
    let next = if position >= ctx.input_list.len() {
        ctx.log.debug("position out of range");
        mode
    } else {
        ctx.input_list.select(position);
        ctx.bus.push(InputMsg::InputChooseDone { position });
        ctx.notify_list_update();

        let spelling = ctx
            .input_list
            .get_input(position)
            .filter(|input| input.is_pinyin())
            .and_then(Input::as_char)
            .map(CharInput::spelling);
        match spelling {
            Some(spelling) => {
                let candidates: Vec<String> =
                    ctx.provider.candidates(&spelling).take(MAX_CANDIDATES).collect();
                ctx.log.debug(format!("{} candidates for {spelling}", candidates.len()));
                ctx.bus.push(InputMsg::InputCandidateChooseDoing {
                    position,
                    candidates: candidates.clone(),
                });
                if !ctx.config.is_enabled(ConfigKey::DisableInputCandidatesPagingAudio) {
                    ctx.bus.push(InputMsg::InputAudioPlayDoing {
                        audio: InputAudio::PagingTick,
                    });
                }
                KeyboardMode::Candidates {
                    position,
                    candidates,
                }
            }
            None => mode.home(),
        }
    };

    report_transition(&previous, &next, ctx);
    ctx.log.end();
    next
}

/// Inserts the words of an offered completion.
pub fn apply_completion(index: usize, ctx: &mut KeyboardContext<'_>) -> bool {
    if !ctx.input_list.apply_completion(index) {
        return false;
    }
    ctx.bus.push(InputMsg::InputCompletionApplyDone { index });
    ctx.notify_list_update();
    true
}

fn report_transition(previous: &KeyboardMode, next: &KeyboardMode, ctx: &mut KeyboardContext<'_>) {
    let (from, to) = (previous.keyboard(), next.keyboard());
    if from != to {
        debug!(?from, ?to, "keyboard switched");
        ctx.bus.push(InputMsg::KeyboardSwitchDone { from, to });
    } else if mem::discriminant(previous) != mem::discriminant(next) {
        ctx.bus.push(InputMsg::KeyboardStateChangeDone { mode: next.clone() });
    }
}

/// Click and popup hints for key activity.
fn feedback(msg: &KeyMsg<'_>, ctx: &mut KeyboardContext<'_>) {
    let audio = !ctx.config.is_enabled(ConfigKey::DisableKeyClickedAudio);
    let popup = !ctx.config.is_enabled(ConfigKey::DisableInputKeyPopupTips);

    match msg.kind {
        GestureKind::PressStart => {
            ctx.bus.push(InputMsg::InputCharsInputDoing { key: msg.key.id() });
            if audio {
                ctx.bus.push(InputMsg::InputAudioPlayDoing {
                    audio: InputAudio::SingleTick,
                });
            }
            let text = msg.key.char_kind().and(msg.key.text());
            if let Some(text) = text.filter(|_| popup) {
                ctx.bus.push(InputMsg::InputCharsInputPopupShowDoing {
                    key: msg.key.id(),
                    text: text.to_owned(),
                });
            }
        }
        GestureKind::DoubleTap if audio => {
            ctx.bus.push(InputMsg::InputAudioPlayDoing {
                audio: InputAudio::DoubleTick,
            });
        }
        GestureKind::PressEnd | GestureKind::PressCancel if popup && msg.key.char_kind().is_some() => {
            ctx.bus.push(InputMsg::InputCharsInputPopupHideDoing);
        }
        _ => {}
    }
}

/// Merges whatever the mode is composing into the list.
fn finalize(mode: &KeyboardMode, ctx: &mut KeyboardContext<'_>) -> bool {
    let done = match mode {
        KeyboardMode::Pinyin { .. } | KeyboardMode::Candidates { .. } => pinyin::finalize(ctx),
        KeyboardMode::Math => math::finalize(ctx),
        KeyboardMode::CursorLocating { resume, .. } => return finalize(resume, ctx),
        KeyboardMode::Direct(_) | KeyboardMode::Editor { .. } => {
            ctx.input_list.confirm_pending_and_select_next()
        }
    };
    if done {
        ctx.notify_list_update();
    }
    done
}

/// Inserts a committed input at the gap of the cursor, or after the selected
/// content. The cursor ends on the gap after the new input.
fn insert_after_cursor(list: &mut InputList, input: Input) -> Option<usize> {
    list.confirm_pending();
    let mut pos = list.selected_position();
    if !list.is_gap_selected() {
        pos += 1;
        list.select(pos);
    }
    list.insert_at(pos, input)
}

/// Inserts a bracket or quote pair around the cursor.
fn insert_pair_symbol(key: &Key, ctx: &mut KeyboardContext<'_>) -> bool {
    let KeyKind::PairSymbol { left, right } = key.kind() else {
        return false;
    };
    let id = key.id();
    let left = Key::char(id, CharKind::Symbol, left.as_str());
    let right = Key::char(id, CharKind::Symbol, right.as_str());

    let inserted = ctx
        .input_list
        .insert_pair(CharInput::from_key(left), CharInput::from_key(right));
    if inserted {
        ctx.notify_list_update();
    }
    inserted
}

fn on_ctrl(mode: KeyboardMode, msg: &KeyMsg<'_>, ctx: &mut KeyboardContext<'_>) -> KeyboardMode {
    let Some(ctrl) = msg.key.ctrl_kind() else {
        return mode;
    };
    match ctrl {
        CtrlKind::EditorCursorLocator => return editor::on_cursor_locator(mode, msg, ctx),
        CtrlKind::EditorRangeSelector => return editor::on_range_selector(mode, msg, ctx),
        _ => {}
    }

    let repeat = ctrl == CtrlKind::Backspace && matches!(msg.kind, GestureKind::LongPressTick { .. });
    if !msg.is_tap() && !repeat {
        return mode;
    }
    ctx.log.debug(format!("control {ctrl:?}"));

    match ctrl {
        CtrlKind::Backspace => {
            backspace(ctx);
            mode
        }
        CtrlKind::Space | CtrlKind::Enter => {
            whitespace(&mode, msg.key, ctx);
            mode
        }
        CtrlKind::CommitInputList => commit(mode, ctx),
        CtrlKind::RevokeInput => {
            if ctx.input_list.revoke_commit() {
                ctx.bus.push(InputMsg::InputListCommittedRevokeDoing {
                    text: ctx.input_list.text(),
                });
                ctx.notify_list_update();
            }
            mode
        }
        CtrlKind::DropInput => {
            if ctx.input_list.drop_pending().is_some() {
                ctx.bus.push(InputMsg::InputPendingDropDone);
                ctx.notify_list_update();
            }
            mode.home()
        }
        CtrlKind::ConfirmInput => {
            finalize(&mode, ctx);
            mode.home()
        }
        CtrlKind::CleanInputList => {
            if ctx.input_list.clean() {
                ctx.bus.push(InputMsg::InputListCleanDone);
                ctx.notify_list_update();
            }
            mode.home()
        }
        CtrlKind::CancelCleanInputList => {
            if ctx.input_list.cancel_clean() {
                ctx.bus.push(InputMsg::InputListCleanedCancelDone);
                ctx.notify_list_update();
            }
            mode
        }
        CtrlKind::SwitchKeyboard(keyboard) => {
            if keyboard == mode.keyboard() {
                return mode;
            }
            finalize(&mode, ctx);
            KeyboardMode::start(keyboard)
        }
        CtrlKind::SwitchHandMode => {
            let hand_mode = ctx.config.hand_mode().flipped();
            ctx.config.set(ConfigKey::HandMode, hand_mode);
            ctx.bus.push(InputMsg::KeyboardHandModeSwitchDone { hand_mode });
            mode
        }
        CtrlKind::EditorEdit(action) => {
            ctx.bus.push(InputMsg::EditorEditDoing { action });
            mode
        }
        CtrlKind::Exit => {
            finalize(&mode, ctx);
            if mode.keyboard() == KeyboardType::Pinyin {
                ctx.bus.push(InputMsg::KeyboardExitDone);
                mode.home()
            } else {
                KeyboardMode::start(KeyboardType::Pinyin)
            }
        }
        CtrlKind::EditorCursorLocator | CtrlKind::EditorRangeSelector => mode,
    }
}

fn backspace(ctx: &mut KeyboardContext<'_>) {
    let list = &mut *ctx.input_list;

    if let Some(expr) = list.pending_mut().and_then(Input::as_math_expr_mut) {
        expr.inner_mut().delete_backward();
        let emptied = expr.is_empty();
        if emptied {
            list.drop_pending();
        }
        ctx.notify_list_update();
        return;
    }

    if list.is_empty() {
        list.drop_pending();
        ctx.bus.push(InputMsg::EditorEditDoing {
            action: EditorAction::Backspace,
        });
        return;
    }

    let on_content = !list.is_gap_selected();
    let len = list.len();
    if list.delete_backward() {
        if on_content && list.len() < len {
            ctx.bus.push(InputMsg::InputSelectedDeleteDone);
        }
        ctx.notify_list_update();
    }
}

/// Space and enter resolve a composition; on direct keyboards, or with
/// nothing composed, they also input themselves.
fn whitespace(mode: &KeyboardMode, key: &Key, ctx: &mut KeyboardContext<'_>) {
    if ctx.input_list.has_pending() {
        finalize(mode, ctx);
        if !matches!(mode, KeyboardMode::Direct(_)) {
            return;
        }
    }

    let text = key.text().unwrap_or(" ");
    if ctx.input_list.is_empty() {
        ctx.bus.push(InputMsg::InputCharsInputDone {
            text: text.to_owned(),
            replacements: key.variants(),
        });
        return;
    }

    if insert_after_cursor(ctx.input_list, Input::key(key.clone())).is_some() {
        ctx.notify_list_update();
    }
}

/// Variants of the last key when the list ends with the text of its keys.
fn last_key_variants(list: &InputList) -> Vec<String> {
    (0..list.len())
        .rev()
        .filter_map(|pos| list.effective_input(pos))
        .find(|input| !input.is_gap())
        .and_then(Input::as_char)
        .filter(|input| !input.is_pinyin())
        .and_then(CharInput::last_key)
        .map(Key::variants)
        .unwrap_or_default()
}

fn commit(mode: KeyboardMode, ctx: &mut KeyboardContext<'_>) -> KeyboardMode {
    finalize(&mode, ctx);
    if ctx.input_list.is_empty() {
        ctx.log.debug("nothing to commit");
        return mode.home();
    }

    let replacements = last_key_variants(ctx.input_list);
    let text = ctx.input_list.commit(true);
    ctx.log.debug(format!("committed {text:?}"));
    ctx.bus.push(InputMsg::InputListCommitDoing { text, replacements });
    ctx.notify_list_update();
    mode.home()
}
