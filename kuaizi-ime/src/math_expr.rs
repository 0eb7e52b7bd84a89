//! Arithmetic evaluation for math expression inputs.
//!
//! Expressions arrive as a flat list of [`Term`]s: numbers already parsed
//! from their digit keys, and operators. Bracket groups are evaluated by the
//! caller and passed in as numbers. Evaluation converts the terms to postfix
//! order with the shunting-yard algorithm and reduces them on a value stack.
//!
//! | operator                | arity | priority |
//! |-------------------------|-------|----------|
//! | `+` `-`                 | 2     | 10       |
//! | `×` `÷`                 | 2     | 20       |
//! | `%` `‰` `‱` (postfix)   | 1     | 30       |
//!
//! All operators are left associative. Division by zero, dangling operators
//! and leftover operands make the whole expression unevaluable.

use crate::key::{Key, MathOp};

/// One element of a flat arithmetic expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Term {
    /// An operand.
    Num(f64),
    /// An operator.
    Op(MathOp),
}

#[derive(Debug, Clone, Copy)]
struct Operator {
    op: MathOp,
    args: usize,
    priority: u8,
}

impl Operator {
    fn of(op: MathOp) -> Option<Self> {
        let (args, priority) = match op {
            MathOp::Plus | MathOp::Minus => (2, 10),
            MathOp::Multiply | MathOp::Divide => (2, 20),
            MathOp::Percent | MathOp::Permill | MathOp::Permyriad => (1, 30),
            MathOp::Equal
            | MathOp::Brackets
            | MathOp::LeftBracket
            | MathOp::RightBracket
            | MathOp::Dot => return None,
        };
        Some(Self { op, args, priority })
    }

    fn apply(self, operands: &[f64]) -> Option<f64> {
        match (self.op, operands) {
            (MathOp::Plus, [a, b]) => Some(a + b),
            (MathOp::Minus, [a, b]) => Some(a - b),
            (MathOp::Multiply, [a, b]) => Some(a * b),
            (MathOp::Divide, [a, b]) => (*b != 0.0).then(|| a / b),
            (MathOp::Percent, [a]) => Some(a * 0.01),
            (MathOp::Permill, [a]) => Some(a * 0.001),
            (MathOp::Permyriad, [a]) => Some(a * 0.0001),
            _ => None,
        }
    }
}

/// Evaluates a flat expression.
///
/// Returns `None` when the expression is empty, malformed, contains an
/// operator that cannot be evaluated (`=`, brackets, a stray dot) or divides
/// by zero.
pub fn evaluate(terms: &[Term]) -> Option<f64> {
    let mut output: Vec<Term> = Vec::with_capacity(terms.len());
    let mut operators: Vec<Operator> = Vec::new();

    for term in terms {
        match *term {
            Term::Num(_) => output.push(*term),
            Term::Op(op) => {
                let current = Operator::of(op)?;
                while let Some(top) = operators.last() {
                    if top.priority < current.priority {
                        break;
                    }
                    output.push(Term::Op(top.op));
                    operators.pop();
                }
                operators.push(current);
            }
        }
    }
    output.extend(operators.iter().rev().map(|operator| Term::Op(operator.op)));

    let mut values: Vec<f64> = Vec::new();
    for term in output {
        match term {
            Term::Num(value) => values.push(value),
            Term::Op(op) => {
                let operator = Operator::of(op)?;
                if values.len() < operator.args {
                    return None;
                }
                let operands = values.split_off(values.len() - operator.args);
                values.push(operator.apply(&operands)?);
            }
        }
    }

    match values.as_slice() {
        [value] if value.is_finite() => Some(*value),
        _ => None,
    }
}

/// Parses the number typed as a sequence of digit and decimal point keys.
///
/// A number holds at most one decimal point. A leading point reads as `0.`
/// and a trailing one is ignored. Any other key makes the input no number.
pub fn parse_number(keys: &[Key]) -> Option<f64> {
    let mut text = String::new();
    let mut has_dot = false;

    for (i, key) in keys.iter().enumerate() {
        if key.math_op() == Some(MathOp::Dot) {
            if has_dot {
                return None;
            }
            has_dot = true;

            let followed_by_digit = keys.get(i + 1).is_some_and(Key::is_number);
            if followed_by_digit {
                if i == 0 {
                    text.push('0');
                }
                text.push('.');
            }
        } else if key.is_number() {
            text.push_str(key.text()?);
        } else {
            return None;
        }
    }

    if text.is_empty() {
        return None;
    }
    text.parse().ok()
}

/// Renders a result with at most four decimals and no trailing zeros.
///
/// Four decimals keep the precision of the permyriad operator.
pub fn format_number(value: f64) -> String {
    let text = format!("{value:.4}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_owned()
    } else {
        text.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{CharKind, KeyId};
    use rstest::rstest;

    fn digits(text: &str) -> Vec<Key> {
        text.chars()
            .enumerate()
            .map(|(i, ch)| {
                let id = KeyId::new(0, i as u32);
                if ch == '.' {
                    Key::math(id, MathOp::Dot)
                } else {
                    Key::char(id, CharKind::Number, ch.to_string())
                }
            })
            .collect()
    }

    use Term::{Num, Op};

    #[test]
    fn test_priorities() {
        // 1 + 2 × 3
        let terms = [Num(1.0), Op(MathOp::Plus), Num(2.0), Op(MathOp::Multiply), Num(3.0)];
        assert_eq!(evaluate(&terms), Some(7.0));

        // 10 - 4 - 3 is left associative
        let terms = [Num(10.0), Op(MathOp::Minus), Num(4.0), Op(MathOp::Minus), Num(3.0)];
        assert_eq!(evaluate(&terms), Some(3.0));

        // 50 % × 8
        let terms = [Num(50.0), Op(MathOp::Percent), Op(MathOp::Multiply), Num(8.0)];
        assert_eq!(evaluate(&terms), Some(4.0));
    }

    #[test]
    fn test_unevaluable_expressions() {
        assert_eq!(evaluate(&[]), None);
        assert_eq!(evaluate(&[Num(1.0), Op(MathOp::Divide), Num(0.0)]), None);
        assert_eq!(evaluate(&[Num(1.0), Op(MathOp::Plus)]), None);
        assert_eq!(evaluate(&[Num(1.0), Num(2.0)]), None);
        assert_eq!(evaluate(&[Num(1.0), Op(MathOp::Equal), Num(2.0)]), None);
    }

    #[rstest(
        text,
        expected,
        case("12", Some(12.0)),
        case("1.5", Some(1.5)),
        case(".5", Some(0.5)),
        case("3.", Some(3.0)),
        case("1.2.3", None),
        case(".", None)
    )]
    fn test_parse_number(text: &str, expected: Option<f64>) {
        assert_eq!(parse_number(&digits(text)), expected);
    }

    #[rstest(
        value,
        expected,
        case(15.0, "15"),
        case(100.0, "100"),
        case(0.125, "0.125"),
        case(1.0 / 3.0, "0.3333"),
        case(0.00004, "0")
    )]
    fn test_format_number(value: f64, expected: &str) {
        assert_eq!(format_number(value), expected);
    }
}
