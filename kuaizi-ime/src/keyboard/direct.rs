//! Latin, number, symbol and emoji keyboards.
//!
//! A key typed on a gap is committed at once, except that letters and digits
//! typed after latin text extend it as a pending composition. With an input
//! selected the key becomes a pending replacement for it. Repeated
//! taps on a key with variants cycle the last input through them, and a flip
//! on a letter inputs its first variant.

use crate::{
    gesture::GestureKind,
    input::{CharInput, Input},
    input_list::InputList,
    key::{Key, KeyKind, KeyboardType},
};

use super::{KeyMsg, KeyboardContext, KeyboardMode, insert_after_cursor, insert_pair_symbol};

pub(super) fn on_msg(keyboard: KeyboardType, msg: &KeyMsg<'_>, ctx: &mut KeyboardContext<'_>) -> KeyboardMode {
    match (msg.kind, msg.key.kind()) {
        (GestureKind::SingleTap { tick }, KeyKind::Char { .. }) => input_char(msg.key, tick, ctx),
        (GestureKind::SingleTap { .. }, KeyKind::PairSymbol { .. }) => {
            insert_pair_symbol(msg.key, ctx);
        }
        (GestureKind::Flip { .. }, KeyKind::Char { .. }) if msg.key.is_alphabet() => {
            if let Some(variant) = msg.key.replacement(1) {
                input_char(&variant, 0, ctx);
            }
        }
        _ => {}
    }
    KeyboardMode::Direct(keyboard)
}

pub(super) fn input_char(key: &Key, tick: u32, ctx: &mut KeyboardContext<'_>) {
    if tick > 0 && key.has_replacements() && replace_last(key, tick, ctx) {
        ctx.notify_list_update();
        return;
    }

    let list = &mut *ctx.input_list;
    if key.is_latin() && extend_latin(list, key) {
        ctx.log.debug("latin composition extended");
    } else if list.is_gap_selected() {
        insert_after_cursor(list, Input::key(key.clone()));
    } else if list.has_pending() {
        list.confirm_pending();
        insert_after_cursor(list, Input::key(key.clone()));
    } else {
        list.new_pending(Input::key(key.clone()));
    }
    ctx.notify_list_update();
}

/// Appends a letter or digit to the latin word before the cursor, turning it
/// into a pending composition.
fn extend_latin(list: &mut InputList, key: &Key) -> bool {
    if !list.is_gap_selected() {
        return match list.pending_mut().and_then(Input::as_char_mut) {
            Some(pending) if pending.is_latin() => {
                pending.append_key(key.clone());
                true
            }
            _ => false,
        };
    }

    let pos = list.selected_position();
    if pos == 0 || list.has_pending() || !list.get_input(pos - 1).is_some_and(Input::is_latin) {
        return false;
    }
    list.select(pos - 1);
    match list.ensure_pending().as_char_mut() {
        Some(pending) => {
            pending.append_key(key.clone());
            true
        }
        None => false,
    }
}

/// Swaps the last key typed by `key` for its `tick`-th variant.
fn replace_last(key: &Key, tick: u32, ctx: &mut KeyboardContext<'_>) -> bool {
    let Some(variant) = key.replacement(tick) else {
        return false;
    };
    let typed_by_key = |input: Option<&Input>| {
        input
            .and_then(Input::as_char)
            .and_then(CharInput::last_key)
            .is_some_and(|last| last.id() == key.id())
    };

    ctx.log.debug(format!("replace with {:?}", variant.text()));
    let list = &mut *ctx.input_list;
    if !list.is_gap_selected() {
        if !typed_by_key(list.pending()) {
            return false;
        }
        if let Some(pending) = list.pending_mut().and_then(Input::as_char_mut) {
            pending.replace_last_key(variant);
        }
        return true;
    }

    let pos = list.selected_position();
    if pos == 0 || !typed_by_key(list.effective_input(pos - 1)) {
        return false;
    }
    list.select(pos - 1);
    if let Some(input) = list.ensure_pending().as_char_mut() {
        input.replace_last_key(variant);
    }
    list.confirm_pending_and_select_next()
}
