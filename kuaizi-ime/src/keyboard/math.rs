//! Arithmetic expressions.
//!
//! An expression is composed in the nested list of a math input pending on
//! the cursor. Digits build numbers, operators and brackets are committed to
//! the nested list as typed, and `=` goes to the end of the expression, or
//! stays at its head when typed there. Confirming merges the expression into
//! the outer list as one input.

use crate::{
    gesture::GestureKind,
    input::{CharInput, Input, MathExprInput},
    input_list::InputList,
    key::{Key, MathOp},
};

use super::{KeyMsg, KeyboardContext, KeyboardMode, direct, insert_after_cursor};

pub(super) fn on_msg(msg: &KeyMsg<'_>, ctx: &mut KeyboardContext<'_>) -> KeyboardMode {
    if !matches!(msg.kind, GestureKind::SingleTap { .. }) {
        return KeyboardMode::Math;
    }

    let key = msg.key;
    let op = key.math_op();
    if !key.is_number() && op.is_none() {
        if key.char_kind().is_some() {
            finalize(ctx);
            direct::input_char(key, 0, ctx);
        }
        return KeyboardMode::Math;
    }

    let Some(expr) = expression(ctx.input_list) else {
        return KeyboardMode::Math;
    };
    let changed = match op {
        None | Some(MathOp::Dot) => input_number(expr, key),
        Some(MathOp::Brackets) => input_brackets(expr, key),
        Some(MathOp::Equal) => input_equal(expr, key),
        Some(_) => insert_after_cursor(expr, Input::key(key.clone())).is_some(),
    };
    if changed {
        ctx.notify_list_update();
    } else {
        ctx.log.debug(format!("{:?} ignored", key.text()));
    }
    KeyboardMode::Math
}

/// Merges the expression under composition into the list and moves the
/// cursor after it.
pub(super) fn finalize(ctx: &mut KeyboardContext<'_>) -> bool {
    let list = &mut *ctx.input_list;
    if !list.pending().is_some_and(Input::is_math_expr) {
        return list.confirm_pending_and_select_next();
    }
    let value = list
        .pending()
        .and_then(Input::as_math_expr)
        .and_then(MathExprInput::value);
    ctx.log.debug(format!("expression value {value:?}"));
    list.confirm_pending_and_select_next()
}

/// The nested list of the expression under composition, starting one on the
/// cursor when there is none.
///
/// A committed expression under the cursor is edited in place.
fn expression(list: &mut InputList) -> Option<&mut InputList> {
    if !list.pending().is_some_and(Input::is_math_expr) {
        list.confirm_pending();
        if list.selected_input().is_some_and(Input::is_math_expr) {
            list.ensure_pending();
        } else {
            if !list.is_gap_selected() {
                let next = list.selected_position() + 1;
                list.select(next);
            }
            list.new_pending(Input::math_expr());
        }
    }
    list.pending_mut()
        .and_then(Input::as_math_expr_mut)
        .map(MathExprInput::inner_mut)
}

fn is_number(input: Option<&Input>) -> bool {
    input.and_then(Input::as_char).is_some_and(|input| {
        !input.keys().is_empty()
            && input
                .keys()
                .iter()
                .all(|key| key.is_number() || key.math_op() == Some(MathOp::Dot))
    })
}

/// Appends a digit or the decimal point to the number at the cursor.
///
/// Typing right after a number continues it. A second decimal point is
/// ignored.
fn input_number(expr: &mut InputList, key: &Key) -> bool {
    let pos = expr.selected_position();
    if expr.is_gap_selected() {
        if !expr.has_pending() && pos > 0 && is_number(expr.get_input(pos - 1)) {
            expr.select(pos - 1);
        }
    } else if !is_number(expr.effective_input(pos)) {
        expr.select(pos + 1);
    }

    let Some(number) = expr.ensure_pending().as_char_mut() else {
        return false;
    };
    if key.math_op() == Some(MathOp::Dot) && number.has_same_key(key) {
        return false;
    }
    number.append_key(key.clone());
    true
}

fn input_brackets(expr: &mut InputList, key: &Key) -> bool {
    expr.confirm_pending();
    if !expr.is_gap_selected() {
        let next = expr.selected_position() + 1;
        expr.select(next);
    }
    let left = Key::math(key.id(), MathOp::LeftBracket);
    let right = Key::math(key.id(), MathOp::RightBracket);
    expr.insert_pair(CharInput::from_key(left), CharInput::from_key(right))
}

fn input_equal(expr: &mut InputList, key: &Key) -> bool {
    let has_equal = expr
        .char_inputs()
        .iter()
        .any(|(_, input)| input.math_op() == Some(MathOp::Equal));
    if has_equal {
        return false;
    }

    expr.confirm_pending();
    let equal = Input::key(key.clone());
    if expr.selected_position() == 0 && !expr.is_empty() {
        return expr.insert_at(0, equal).is_some();
    }
    expr.select_last();
    insert_after_cursor(expr, equal).is_some()
}
