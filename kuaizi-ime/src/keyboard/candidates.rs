//! Candidate choosing.
//!
//! Tapping a candidate, or releasing a slide over one, sets the chosen word
//! on the input the candidates were listed for and returns to pinyin.

use crate::{
    gesture::GestureKind,
    input::Input,
    key::{Key, KeyKind, KeyboardType},
    msg::InputMsg,
};

use super::{KeyMsg, KeyboardContext, KeyboardMode};

pub(super) fn on_msg(
    position: usize,
    candidates: Vec<String>,
    msg: &KeyMsg<'_>,
    ctx: &mut KeyboardContext<'_>,
) -> KeyboardMode {
    let chosen = match msg.kind {
        GestureKind::SingleTap { .. } => Some(msg.key),
        GestureKind::SlideStop => msg.over,
        _ => None,
    };
    match chosen.and_then(candidate_word) {
        Some(word) => choose(position, word, ctx),
        None => KeyboardMode::Candidates {
            position,
            candidates,
        },
    }
}

fn candidate_word(key: &Key) -> Option<&str> {
    match key.kind() {
        KeyKind::Candidate { word, .. } => Some(word),
        _ => None,
    }
}

fn choose(position: usize, word: &str, ctx: &mut KeyboardContext<'_>) -> KeyboardMode {
    let list = &mut *ctx.input_list;
    if !list.get_input(position).is_some_and(Input::is_pinyin) {
        ctx.log.warn(format!("no pinyin input at {position} to choose for"));
        return KeyboardMode::start(KeyboardType::Pinyin);
    }

    list.select(position);
    if let Some(input) = list.ensure_pending().as_char_mut() {
        input.set_word(Some(word.to_owned()));
    }
    list.confirm_pending_and_select_next();
    ctx.log.debug(format!("chose {word} at {position}"));

    ctx.bus.push(InputMsg::InputCandidateChooseDone {
        position,
        word: word.to_owned(),
    });
    ctx.notify_list_update();
    KeyboardMode::start(KeyboardType::Pinyin)
}

#[cfg(test)]
mod tests {
    use super::super::tests::Fixture;
    use super::*;
    use crate::key::{CharKind, CtrlKind};

    fn spelled_ni(fx: &mut Fixture) {
        let n = fx.letter("n");
        let i = fx.letter("i");
        let space = fx.ctrl(CtrlKind::Space);
        fx.tap(&n);
        fx.tap(&i);
        fx.tap(&space);
        fx.msgs();
    }

    #[test]
    fn test_choose_input_lists_candidates() {
        let mut fx = Fixture::new(KeyboardType::Pinyin);
        spelled_ni(&mut fx);

        fx.choose(1);

        assert_eq!(
            fx.mode,
            KeyboardMode::Candidates {
                position: 1,
                candidates: vec!["你".to_owned(), "泥".to_owned()],
            }
        );
        let msgs = fx.msgs();
        assert!(msgs.contains(&InputMsg::InputChooseDone { position: 1 }));
        assert!(msgs.contains(&InputMsg::InputAudioPlayDoing {
            audio: crate::msg::InputAudio::PagingTick,
        }));
        assert!(msgs.contains(&InputMsg::KeyboardSwitchDone {
            from: KeyboardType::Pinyin,
            to: KeyboardType::PinyinCandidates,
        }));
    }

    #[test]
    fn test_tap_candidate_sets_word() {
        let mut fx = Fixture::new(KeyboardType::Pinyin);
        spelled_ni(&mut fx);
        fx.choose(1);
        let mud = fx.key(|id| Key::candidate(id, 1, "泥"));

        fx.tap(&mud);

        assert_eq!(fx.list.text(), "泥");
        assert_eq!(fx.list.selected_position(), 2);
        assert_eq!(fx.mode, KeyboardMode::start(KeyboardType::Pinyin));
        assert!(fx.msgs().contains(&InputMsg::InputCandidateChooseDone {
            position: 1,
            word: "泥".to_owned(),
        }));
    }

    #[test]
    fn test_slide_release_over_candidate_chooses_it() {
        let mut fx = Fixture::new(KeyboardType::Pinyin);
        spelled_ni(&mut fx);
        fx.choose(1);
        let you = fx.key(|id| Key::candidate(id, 0, "你"));
        let mud = fx.key(|id| Key::candidate(id, 1, "泥"));

        fx.send(GestureKind::SlideStart, &you, Some(&you));
        fx.send(GestureKind::SlideStop, &you, Some(&mud));

        assert_eq!(fx.list.text(), "泥");
    }

    #[test]
    fn test_cancelled_slide_chooses_nothing() {
        let mut fx = Fixture::new(KeyboardType::Pinyin);
        spelled_ni(&mut fx);
        fx.choose(1);
        let you = fx.key(|id| Key::candidate(id, 0, "你"));
        let mud = fx.key(|id| Key::candidate(id, 1, "泥"));
        fx.msgs();

        fx.send(GestureKind::SlideStart, &you, Some(&you));
        fx.send(GestureKind::PressCancel, &you, Some(&mud));

        assert_eq!(fx.list.text(), "你");
        assert!(matches!(fx.mode, KeyboardMode::Candidates { position: 1, .. }));
        assert!(!fx
            .msgs()
            .iter()
            .any(|msg| matches!(msg, InputMsg::InputCandidateChooseDone { .. })));
    }

    #[test]
    fn test_choosing_non_pinyin_input_keeps_keyboard() {
        let mut fx = Fixture::new(KeyboardType::Pinyin);
        let comma = fx.key(|id| Key::char(id, CharKind::Symbol, ","));
        fx.tap(&comma);

        fx.choose(1);

        assert_eq!(fx.mode, KeyboardMode::start(KeyboardType::Pinyin));
        assert_eq!(fx.list.selected_position(), 1);
    }

    #[test]
    fn test_drop_input_returns_to_pinyin() {
        let mut fx = Fixture::new(KeyboardType::Pinyin);
        spelled_ni(&mut fx);
        fx.choose(1);
        let drop_input = fx.ctrl(CtrlKind::DropInput);

        fx.tap(&drop_input);

        assert_eq!(fx.mode, KeyboardMode::start(KeyboardType::Pinyin));
        assert_eq!(fx.list.text(), "你");
    }
}
