//! Cursor locating and range selecting in the host editor.
//!
//! Sliding the locator key on any keyboard moves the host cursor and hands
//! control back to the interrupted mode when the finger lifts. Double tapping
//! or long pressing it opens the editor keyboard, where the range selector
//! extends the host selection by sliding.

use crate::{gesture::GestureKind, key::KeyboardType, motion::Motion, msg::InputMsg};

use super::{KeyMsg, KeyboardContext, KeyboardMode, finalize};

pub(super) fn on_msg(
    anchors: Option<(Motion, Motion)>,
    msg: &KeyMsg<'_>,
    ctx: &mut KeyboardContext<'_>,
) -> KeyboardMode {
    ctx.log.debug(format!("{:?} ignored by the editor", msg.key.kind()));
    KeyboardMode::Editor { anchors }
}

pub(super) fn on_cursor_locator(mode: KeyboardMode, msg: &KeyMsg<'_>, ctx: &mut KeyboardContext<'_>) -> KeyboardMode {
    match msg.kind {
        GestureKind::SlideStart => {
            ctx.log.debug("cursor locating");
            KeyboardMode::CursorLocating {
                anchor: Motion::anchor(msg.position, msg.timestamp),
                resume: Box::new(mode),
            }
        }
        GestureKind::DoubleTap | GestureKind::LongPressStart if mode.keyboard() != KeyboardType::Editor => {
            finalize(&mode, ctx);
            KeyboardMode::start(KeyboardType::Editor)
        }
        _ => mode,
    }
}

pub(super) fn on_cursor_locating(
    anchor: Motion,
    resume: KeyboardMode,
    msg: &KeyMsg<'_>,
    ctx: &mut KeyboardContext<'_>,
) -> KeyboardMode {
    match msg.kind {
        GestureKind::Slide { motion, .. } => {
            ctx.bus.push(InputMsg::EditorCursorMoveDoing { anchor, motion });
            KeyboardMode::CursorLocating {
                anchor,
                resume: Box::new(resume),
            }
        }
        GestureKind::SlideStop | GestureKind::PressEnd | GestureKind::PressCancel => resume,
        _ => KeyboardMode::CursorLocating {
            anchor,
            resume: Box::new(resume),
        },
    }
}

pub(super) fn on_range_selector(mode: KeyboardMode, msg: &KeyMsg<'_>, ctx: &mut KeyboardContext<'_>) -> KeyboardMode {
    let KeyboardMode::Editor { anchors } = mode else {
        return mode;
    };
    let anchors = match (msg.kind, anchors) {
        (GestureKind::SlideStart, _) => {
            let anchor = Motion::anchor(msg.position, msg.timestamp);
            Some((anchor, anchor))
        }
        (GestureKind::Slide { motion, .. }, Some((anchor, _))) => {
            ctx.bus.push(InputMsg::EditorRangeSelectDoing { anchor, motion });
            Some((anchor, motion))
        }
        (GestureKind::SlideStop | GestureKind::PressEnd | GestureKind::PressCancel, _) => None,
        (_, anchors) => anchors,
    };
    KeyboardMode::Editor { anchors }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::super::tests::Fixture;
    use super::*;
    use crate::{
        key::CtrlKind,
        px::{Px, PxPosition},
    };

    fn slide_to(x: i32) -> GestureKind {
        let origin = Motion::anchor(PxPosition::new(Px(0), Px(0)), Instant::now());
        GestureKind::Slide {
            motion: origin.to(PxPosition::new(Px(x), Px(0)), Instant::now()),
            block_diff: None,
        }
    }

    #[test]
    fn test_cursor_locating_resumes_mode() {
        let mut fx = Fixture::new(KeyboardType::Latin);
        let locator = fx.ctrl(CtrlKind::EditorCursorLocator);

        fx.send(GestureKind::SlideStart, &locator, Some(&locator));
        assert!(matches!(fx.mode, KeyboardMode::CursorLocating { .. }));
        assert_eq!(fx.mode.keyboard(), KeyboardType::Latin);

        fx.send(slide_to(30), &locator, None);
        fx.send(slide_to(60), &locator, None);
        fx.send(GestureKind::SlideStop, &locator, None);

        assert_eq!(fx.mode, KeyboardMode::Direct(KeyboardType::Latin));
        let moves = fx
            .msgs()
            .into_iter()
            .filter(|msg| matches!(msg, InputMsg::EditorCursorMoveDoing { .. }))
            .count();
        assert_eq!(moves, 2);
    }

    #[test]
    fn test_cancel_ends_locating_and_selecting() {
        let mut fx = Fixture::new(KeyboardType::Pinyin);
        let locator = fx.ctrl(CtrlKind::EditorCursorLocator);

        fx.send(GestureKind::SlideStart, &locator, Some(&locator));
        fx.send(GestureKind::PressCancel, &locator, None);
        assert_eq!(fx.mode, KeyboardMode::start(KeyboardType::Pinyin));

        let mut fx = Fixture::new(KeyboardType::Editor);
        let selector = fx.ctrl(CtrlKind::EditorRangeSelector);

        fx.send(GestureKind::SlideStart, &selector, Some(&selector));
        fx.send(slide_to(20), &selector, None);
        fx.send(GestureKind::PressCancel, &selector, None);
        assert_eq!(fx.mode, KeyboardMode::Editor { anchors: None });
    }

    #[test]
    fn test_double_tap_locator_opens_editor() {
        let mut fx = Fixture::new(KeyboardType::Pinyin);
        let locator = fx.ctrl(CtrlKind::EditorCursorLocator);

        fx.send(GestureKind::DoubleTap, &locator, Some(&locator));

        assert_eq!(fx.mode, KeyboardMode::Editor { anchors: None });
    }

    #[test]
    fn test_range_selector_tracks_anchor() {
        let mut fx = Fixture::new(KeyboardType::Editor);
        let selector = fx.ctrl(CtrlKind::EditorRangeSelector);

        fx.send(GestureKind::SlideStart, &selector, Some(&selector));
        fx.send(slide_to(40), &selector, None);

        let KeyboardMode::Editor { anchors: Some((anchor, current)) } = fx.mode else {
            panic!("range selection should be tracked");
        };
        assert_eq!(current.position.x, anchor.position.x + Px(40));
        assert!(fx
            .msgs()
            .iter()
            .any(|msg| matches!(msg, InputMsg::EditorRangeSelectDoing { .. })));

        fx.send(GestureKind::SlideStop, &selector, None);
        assert_eq!(fx.mode, KeyboardMode::Editor { anchors: None });
    }

    #[test]
    fn test_editor_action_is_forwarded() {
        let mut fx = Fixture::new(KeyboardType::Editor);
        let copy = fx.ctrl(CtrlKind::EditorEdit(crate::key::EditorAction::Copy));

        fx.tap(&copy);

        assert!(fx.msgs().contains(&InputMsg::EditorEditDoing {
            action: crate::key::EditorAction::Copy
        }));
    }
}
