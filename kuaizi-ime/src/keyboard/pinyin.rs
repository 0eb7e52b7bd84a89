//! Pinyin spelling.
//!
//! Letters build a pending spelling on the gap of the cursor, previewed with
//! the best candidate. The spelling is resolved when something else happens:
//! a known spelling takes its best candidate and is committed, an unknown one
//! is dropped. Sliding from a letter spells by passing over the following
//! letters, and lifting the finger resolves the slide's spelling.

use crate::{
    config::ConfigKey,
    gesture::GestureKind,
    input::{CharInput, Input},
    key::{Key, KeyId, KeyKind},
    msg::InputMsg,
};

use super::{KeyMsg, KeyboardContext, KeyboardMode, insert_after_cursor, insert_pair_symbol};

pub(super) fn on_msg(slide: Option<KeyId>, msg: &KeyMsg<'_>, ctx: &mut KeyboardContext<'_>) -> KeyboardMode {
    let key = msg.key;
    let slide_to_spell = !ctx.config.is_enabled(ConfigKey::EnableXInputPad);

    let slide = match msg.kind {
        GestureKind::SingleTap { .. } if key.is_alphabet() => {
            append_letter(key, ctx);
            slide
        }
        GestureKind::SingleTap { .. } if matches!(key.kind(), KeyKind::PairSymbol { .. }) => {
            finalize(ctx);
            insert_pair_symbol(key, ctx);
            slide
        }
        GestureKind::SingleTap { .. } if key.char_kind().is_some() => {
            finalize(ctx);
            if insert_after_cursor(ctx.input_list, Input::key(key.clone())).is_some() {
                ctx.notify_list_update();
            }
            slide
        }
        GestureKind::SlideStart if slide_to_spell && key.is_alphabet() => {
            finalize(ctx);
            append_letter(key, ctx);
            Some(key.id())
        }
        GestureKind::Slide { .. } => match (slide, msg.over) {
            (Some(last), Some(over)) if over.is_alphabet() && over.id() != last => {
                ctx.bus.push(InputMsg::InputCharsInputDoing { key: over.id() });
                append_letter(over, ctx);
                Some(over.id())
            }
            (slide, _) => slide,
        },
        GestureKind::SlideStop | GestureKind::PressEnd if slide.is_some() => {
            finalize(ctx);
            None
        }
        GestureKind::PressCancel if slide.is_some() => {
            if ctx.input_list.drop_pending().is_some() {
                ctx.log.debug("slide cancelled, spelling dropped");
                ctx.bus.push(InputMsg::InputPendingDropDone);
                ctx.notify_list_update();
            }
            None
        }
        _ => slide,
    };
    KeyboardMode::Pinyin { slide }
}

/// Appends a letter to the spelling under composition, starting one if
/// needed, and previews the best candidate.
fn append_letter(key: &Key, ctx: &mut KeyboardContext<'_>) {
    let list = &mut *ctx.input_list;
    ctx.log.debug(format!("letter {:?}", key.text()));

    let composing = list.pending().is_some_and(|pending| pending.as_char().is_some());
    if !composing {
        list.confirm_pending();
        if !list.is_gap_selected() {
            let next = list.selected_position() + 1;
            list.select(next);
        }
        list.new_pending(Input::Char(CharInput::new()));
    }
    if let Some(pending) = list.pending_mut().and_then(Input::as_char_mut) {
        pending.append_key(key.clone());
        pending.set_word(None);
    }

    if let Some(spelling) = list.pending_spelling() {
        let best = ctx.provider.candidates(&spelling).next();
        ctx.log.debug(format!("spelling {spelling}, preview {best:?}"));
        if let Some(pending) = list.pending_mut().and_then(Input::as_char_mut) {
            pending.set_word(best);
        }
    }
    list.clear_completions();
    ctx.notify_list_update();
}

/// Resolves the pending spelling.
///
/// Returns whether anything was pending. Pendings that are not a spelling,
/// such as an edited latin word, are committed as they are.
pub(super) fn finalize(ctx: &mut KeyboardContext<'_>) -> bool {
    let list = &mut *ctx.input_list;
    if !list.has_pending() {
        return false;
    }
    let spelled = list
        .selected_input()
        .is_some_and(|input| input.is_gap() || input.is_pinyin());
    let spelling = list.pending_spelling().filter(|_| spelled);
    let Some(spelling) = spelling else {
        list.confirm_pending();
        ctx.notify_list_update();
        return true;
    };

    if !ctx.provider.is_spelling(&spelling) {
        ctx.log.warn(format!("unknown spelling {spelling}"));
        list.drop_pending();
        ctx.bus.push(InputMsg::InputPendingDropDone);
        ctx.notify_list_update();
        return true;
    }

    list.accept_candidates(ctx.provider.candidates(&spelling));
    let word = list
        .pending()
        .and_then(Input::as_char)
        .and_then(CharInput::word)
        .map(str::to_owned);
    list.confirm_pending_and_select_next();

    let completions = word
        .map(|word| ctx.provider.completions(&word))
        .unwrap_or_default();
    if !completions.is_empty() {
        ctx.log.debug(format!("{} completions", completions.len()));
        list.set_completions(completions.clone());
        ctx.bus.push(InputMsg::InputCompletionUpdateDone { completions });
    }
    ctx.notify_list_update();
    true
}
