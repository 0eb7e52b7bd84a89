//! kuaizi-ime is the input composition core of the Kuaizi Chinese input method.
//!
//! # Overview
//!
//! The crate turns raw pointer samples on a virtual keyboard into committed
//! text. It has no platform code: a host feeds it pointer samples and timer
//! ticks, renders the [`KeyLayout`] it exposes, and reacts to the
//! [`InputMsg`]s it queues.
//!
//! The pipeline, bottom-up:
//!
//! - [`gesture`] classifies pointer samples against the layout into taps,
//!   long presses, slides and flips, with the radial [`xpad`] layered on top;
//! - [`keyboard`] dispatches each gesture to the active keyboard mode (pinyin,
//!   direct characters, candidates, math, editor);
//! - the modes edit an [`InputList`], the gap and content buffer holding the
//!   composition and its pending overlays;
//! - [`ImeSession`] ties these together, rebuilds layouts through a
//!   [`KeyLayoutSource`] and validates the list after every dispatch.
//!
//! Options live in a shared [`Configuration`] which records every change so
//! the session can react to it.
//!
//! # Logging
//!
//! Everything is reported through `tracing`. [`logging::init_tracing`]
//! installs a subscriber for hosts that don't bring their own, and each
//! dispatch additionally renders a nested [`TreeLog`].

#![deny(missing_docs, clippy::unwrap_used)]

pub mod block_tracker;
pub mod candidate;
pub mod config;
pub mod error;
pub mod gesture;
pub mod input;
pub mod input_list;
pub mod key;
pub mod key_layout;
pub mod key_table;
pub mod keyboard;
pub mod logging;
pub mod math_expr;
pub mod motion;
pub mod msg;
pub mod px;
pub mod session;
pub mod tree_log;
pub mod xpad;

pub use crate::{
    block_tracker::BlockTracker,
    candidate::{CandidateProvider, StaticCandidates},
    config::{ConfigKey, ConfigValue, Configuration, HandMode, MemoryPersistence, PersistenceLayer},
    error::{ImeError, InvariantViolation},
    gesture::{GestureClassifier, GestureConfig, GestureEvent, GestureKind, PointerSample},
    input::{CharInput, Input, MathExprInput},
    input_list::{InputId, InputList},
    key::{CharKind, CtrlKind, Key, KeyId, KeyKind, KeyboardType, MathOp},
    key_layout::{KeyLayout, KeyLayoutSource, LaidKey, LayoutRequest},
    key_table::KeyTable,
    keyboard::KeyboardMode,
    motion::{Direction, Motion},
    msg::{InputMsg, KeyboardSnapshot, MsgBus},
    px::{Px, PxPosition, PxRect},
    session::ImeSession,
    tree_log::TreeLog,
    xpad::{XPad, XPadLayout},
};
