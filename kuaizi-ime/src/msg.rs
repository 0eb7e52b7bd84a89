//! Outward notifications.
//!
//! Everything the core wants a renderer or the host editor to know is pushed
//! as an [`InputMsg`] value onto the session's [`MsgBus`] and drained by the
//! host after each call. Messages carry the data needed to re-render, so a
//! consumer never has to query the core while handling one.

use std::collections::VecDeque;

use tracing::warn;

use crate::{
    config::{ConfigChange, HandMode},
    input::CompletionInput,
    key::{EditorAction, KeyId, KeyboardType},
    keyboard::KeyboardMode,
    motion::Motion,
};

/// Maximum number of undrained messages kept on a bus.
const KEEP_MSGS_COUNT: usize = 64;

/// Clicks the host may play on key activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAudio {
    /// A key was pressed.
    SingleTick,
    /// A key was double tapped.
    DoubleTick,
    /// The candidate list was paged.
    PagingTick,
}

/// What the keyboard looks like, for before/after comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyboardSnapshot {
    /// Active keyboard.
    pub keyboard: KeyboardType,
    /// Layout generation on screen.
    pub generation: u32,
    /// Side of the control column.
    pub hand_mode: HandMode,
    /// Whether the radial pad is in use.
    pub xpad_enabled: bool,
}

/// A notification for the renderer or the host editor.
#[derive(Debug, Clone, PartialEq)]
pub enum InputMsg {
    /// Play a click.
    InputAudioPlayDoing {
        /// Which click.
        audio: InputAudio,
    },
    /// A key is being pressed or slid over.
    InputCharsInputDoing {
        /// The key under the finger.
        key: KeyId,
    },
    /// Text goes straight to the host, bypassing the input list.
    InputCharsInputDone {
        /// Text to insert.
        text: String,
        /// Alternatives the host may offer instead.
        replacements: Vec<String>,
    },
    /// Show the popup tip over a pressed key.
    InputCharsInputPopupShowDoing {
        /// The pressed key.
        key: KeyId,
        /// Text of the tip.
        text: String,
    },
    /// Hide the popup tip.
    InputCharsInputPopupHideDoing,
    /// Ranked candidates are offered for an input.
    InputCandidateChooseDoing {
        /// Position of the input in the list.
        position: usize,
        /// Candidates, best first.
        candidates: Vec<String>,
    },
    /// A candidate was chosen for an input.
    InputCandidateChooseDone {
        /// Position of the input in the list.
        position: usize,
        /// The chosen word.
        word: String,
    },
    /// An input of the list was chosen by the user.
    InputChooseDone {
        /// Position of the chosen input.
        position: usize,
    },
    /// The pending overlay was dropped.
    InputPendingDropDone,
    /// The selected input was deleted.
    InputSelectedDeleteDone,
    /// Phrase completions are offered.
    InputCompletionUpdateDone {
        /// The offered completions.
        completions: Vec<CompletionInput>,
    },
    /// A completion was inserted.
    InputCompletionApplyDone {
        /// Index of the applied completion.
        index: usize,
    },
    /// The input list changed.
    InputListUpdateDone {
        /// Rendered text of the list.
        text: String,
        /// Position of the cursor.
        selected: usize,
    },
    /// The list was cleared with an undo snapshot.
    InputListCleanDone,
    /// The cleared list was restored.
    InputListCleanedCancelDone,
    /// Commit text to the host.
    InputListCommitDoing {
        /// The committed text.
        text: String,
        /// Variants of the last key typed, for the host to swap the
        /// committed tail with. Empty unless the text ends with such a key.
        replacements: Vec<String>,
    },
    /// Take back the text of the last commit.
    InputListCommittedRevokeDoing {
        /// The text the host should remove.
        text: String,
    },
    /// Move the host cursor.
    EditorCursorMoveDoing {
        /// Where the slide started.
        anchor: Motion,
        /// Where the finger is now, measured from the anchor.
        motion: Motion,
    },
    /// Extend the host selection.
    EditorRangeSelectDoing {
        /// Where the selection slide started.
        anchor: Motion,
        /// Where the finger is now, measured from the anchor.
        motion: Motion,
    },
    /// Perform an editor operation.
    EditorEditDoing {
        /// The operation.
        action: EditorAction,
    },
    /// A keyboard was started.
    KeyboardStartDone {
        /// The started keyboard.
        keyboard: KeyboardSnapshot,
    },
    /// The keyboard was switched.
    KeyboardSwitchDone {
        /// Keyboard before the switch.
        from: KeyboardType,
        /// Keyboard after the switch.
        to: KeyboardType,
    },
    /// The dispatcher changed state within a keyboard.
    KeyboardStateChangeDone {
        /// The new state.
        mode: KeyboardMode,
    },
    /// The hand mode was toggled.
    KeyboardHandModeSwitchDone {
        /// The new hand mode.
        hand_mode: HandMode,
    },
    /// A keyboard affecting option changed and the keyboard was rebuilt.
    KeyboardConfigUpdateDone {
        /// Keyboard before the change.
        before: KeyboardSnapshot,
        /// Keyboard after the change.
        after: KeyboardSnapshot,
    },
    /// The user left the input method.
    KeyboardExitDone,
    /// An option changed.
    ConfigUpdateDone {
        /// The change.
        change: ConfigChange,
    },
}

/// Bounded queue of outward messages.
#[derive(Debug, Clone, Default)]
pub struct MsgBus {
    msgs: VecDeque<InputMsg>,
}

impl MsgBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a message, dropping the oldest one when the bus is full.
    pub fn push(&mut self, msg: InputMsg) {
        self.msgs.push_back(msg);
        if self.msgs.len() > KEEP_MSGS_COUNT {
            warn!("message bus overflow, dropping the oldest message");
            self.msgs.pop_front();
        }
    }

    /// Number of undrained messages.
    pub fn len(&self) -> usize {
        self.msgs.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.msgs.is_empty()
    }

    /// Removes and returns all queued messages in order.
    pub fn take_msgs(&mut self) -> Vec<InputMsg> {
        self.msgs.drain(..).collect()
    }
}
