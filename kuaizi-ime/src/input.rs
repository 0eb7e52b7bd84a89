//! The values an [`InputList`] is made of.
//!
//! An [`Input`] is either a gap (the zero-width insertion point between two
//! contents), a [`CharInput`] (one or more keys, optionally resolved to a
//! word) or a [`MathExprInput`] (an arithmetic expression composed in a
//! nested list of its own).
//!
//! Inputs are plain values. A pending edit is a modified copy of an input
//! held beside the list until it is committed back.
//!
//! A [`CompletionInput`] is no list member. The list keeps the completions
//! offered after a confirmed input beside its sequence, and applying one
//! inserts its words as character inputs.

use smallvec::SmallVec;

use crate::{
    input_list::{InputId, InputList},
    key::{Key, MathOp},
    math_expr::{self, Term},
};

/// How a pinyin input renders its spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpellUsedMode {
    /// Render the spelling instead of the word.
    Replacing,
    /// Render the spelling in brackets after the word.
    Following,
}

/// Rendering hints for input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InputOption {
    /// Whether and how pinyin spellings are rendered.
    pub spell_used: Option<SpellUsedMode>,
}

/// A composed run of keys.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CharInput {
    keys: SmallVec<[Key; 4]>,
    word: Option<String>,
    pair: Option<InputId>,
}

impl CharInput {
    /// An empty input.
    pub fn new() -> Self {
        Self::default()
    }

    /// An input of one key.
    pub fn from_key(key: Key) -> Self {
        Self::from_keys([key])
    }

    /// An input of the given keys.
    pub fn from_keys(keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            ..Self::default()
        }
    }

    /// An input holding a resolved word and no keys.
    pub fn from_word(word: impl Into<String>) -> Self {
        Self {
            word: Some(word.into()),
            ..Self::default()
        }
    }

    /// The composed keys.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// The last key.
    pub fn last_key(&self) -> Option<&Key> {
        self.keys.last()
    }

    /// Appends a key.
    pub fn append_key(&mut self, key: Key) {
        self.keys.push(key);
    }

    /// Removes the last key.
    pub fn drop_last_key(&mut self) -> Option<Key> {
        self.keys.pop()
    }

    /// Replaces the last key, or appends when there is none.
    pub fn replace_last_key(&mut self, key: Key) {
        match self.keys.last_mut() {
            Some(last) => *last = key,
            None => self.keys.push(key),
        }
    }

    /// Whether any composed key inputs the same character as `key`.
    pub fn has_same_key(&self, key: &Key) -> bool {
        self.keys
            .iter()
            .any(|k| k.same_char(key) || (k.math_op().is_some() && k.math_op() == key.math_op()))
    }

    /// The key texts joined: the pinyin spelling of a pinyin input.
    pub fn spelling(&self) -> String {
        self.keys.iter().filter_map(Key::text).collect()
    }

    /// The resolved word.
    pub fn word(&self) -> Option<&str> {
        self.word.as_deref()
    }

    /// Sets or clears the resolved word.
    pub fn set_word(&mut self, word: Option<String>) {
        self.word = word;
    }

    /// The paired input, for bracket and quote symbols.
    pub fn pair(&self) -> Option<InputId> {
        self.pair
    }

    pub(crate) fn set_pair(&mut self, pair: Option<InputId>) {
        self.pair = pair;
    }

    /// Whether the input holds nothing.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.word.is_none()
    }

    /// Whether the input was resolved to a word.
    pub fn is_pinyin(&self) -> bool {
        self.word.is_some()
    }

    /// Whether the input is latin text: letters and digits with no word.
    pub fn is_latin(&self) -> bool {
        !self.is_pinyin() && !self.keys.is_empty() && self.keys.iter().all(Key::is_latin)
    }

    /// Whether the input is one punctuation key.
    pub fn is_symbol(&self) -> bool {
        matches!(self.keys.as_slice(), [key] if key.is_symbol())
    }

    /// Whether the input is one emoji key.
    pub fn is_emoji(&self) -> bool {
        matches!(self.keys.as_slice(), [key] if key.is_emoji())
    }

    /// Whether the input is one whitespace key.
    pub fn is_space(&self) -> bool {
        matches!(self.keys.as_slice(), [key] if matches!(key.text(), Some(" ") | Some("\n")))
    }

    /// The operator, when the input is one arithmetic key.
    pub fn math_op(&self) -> Option<MathOp> {
        match self.keys.as_slice() {
            [key] => key.math_op().filter(|op| *op != MathOp::Dot),
            _ => None,
        }
    }

    /// Whether the input renders as its spelling only.
    pub fn is_text_only_spell(&self, option: &InputOption) -> bool {
        self.is_pinyin() && option.spell_used == Some(SpellUsedMode::Replacing)
    }

    /// The rendered text.
    pub fn text(&self, option: &InputOption) -> String {
        match (&self.word, option.spell_used) {
            (Some(_), Some(SpellUsedMode::Replacing)) if !self.keys.is_empty() => self.spelling(),
            (Some(word), Some(SpellUsedMode::Following)) if !self.keys.is_empty() => {
                format!("{word}({})", self.spelling())
            }
            (Some(word), _) => word.clone(),
            (None, _) => self.spelling(),
        }
    }
}

/// An arithmetic expression composed in a nested list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MathExprInput {
    inner: InputList,
}

impl MathExprInput {
    /// An empty expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// The list the expression is composed in.
    pub fn inner(&self) -> &InputList {
        &self.inner
    }

    /// Mutable access to the nested list.
    pub fn inner_mut(&mut self) -> &mut InputList {
        &mut self.inner
    }

    /// Whether the expression holds nothing.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Confirms the edit pending in the nested list.
    pub fn confirm(&mut self) {
        self.inner.confirm_pending();
    }

    /// The rendered text.
    ///
    /// An expression that starts or ends with `=` renders with its value:
    /// a trailing `=` keeps the expression before the value, a leading one
    /// shows the value only. Unevaluable expressions render as typed.
    pub fn text(&self, option: &InputOption) -> String {
        let inputs = self.inner.char_inputs();
        let is_equal = |input: Option<&(InputId, &CharInput)>| {
            input.and_then(|(_, input)| input.math_op()) == Some(MathOp::Equal)
        };
        let first_equal = is_equal(inputs.first());
        let last_equal = is_equal(inputs.last());

        let value = match (first_equal, last_equal) {
            (true, _) => evaluate_inputs(&inputs[1..]),
            (false, true) => evaluate_inputs(&inputs[..inputs.len() - 1]),
            (false, false) => None,
        };

        match value {
            Some(value) if first_equal => math_expr::format_number(value),
            Some(value) => format!(
                "{} {}",
                self.inner.text_with(option),
                math_expr::format_number(value)
            ),
            None => self.inner.text_with(option),
        }
    }

    /// The value of the expression without its leading or trailing `=`.
    pub fn value(&self) -> Option<f64> {
        let inputs = self.inner.char_inputs();
        let is_equal = |input: &(InputId, &CharInput)| input.1.math_op() == Some(MathOp::Equal);
        let trimmed = match inputs.as_slice() {
            [first, rest @ ..] if is_equal(first) => rest,
            [rest @ .., last] if is_equal(last) => rest,
            all => all,
        };
        evaluate_inputs(trimmed)
    }
}

/// Evaluates the contents of an expression list.
///
/// A left bracket is resolved through its pair link; the inputs up to the
/// right bracket are evaluated as a nested expression.
fn evaluate_inputs(inputs: &[(InputId, &CharInput)]) -> Option<f64> {
    let mut terms = Vec::with_capacity(inputs.len());
    let mut i = 0;

    while i < inputs.len() {
        let input = inputs[i].1;
        let term = match input.math_op() {
            None => Term::Num(math_expr::parse_number(input.keys())?),
            Some(MathOp::LeftBracket) => {
                let pair = input.pair()?;
                let close = i + 1 + inputs[i + 1..].iter().position(|(id, _)| *id == pair)?;
                let value = evaluate_inputs(&inputs[i + 1..close])?;
                i = close;
                Term::Num(value)
            }
            Some(op) => Term::Op(op),
        };
        terms.push(term);
        i += 1;
    }

    math_expr::evaluate(&terms)
}

/// One element of an [`InputList`].
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// The insertion point between two contents.
    Gap,
    /// A composed run of keys.
    Char(CharInput),
    /// An arithmetic expression.
    MathExpr(Box<MathExprInput>),
}

impl Input {
    /// A character input of one key.
    pub fn key(key: Key) -> Self {
        Self::Char(CharInput::from_key(key))
    }

    /// An empty math expression.
    pub fn math_expr() -> Self {
        Self::MathExpr(Box::default())
    }

    /// Whether this is a gap.
    pub fn is_gap(&self) -> bool {
        matches!(self, Self::Gap)
    }

    /// Whether this holds no content. Gaps are always empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Gap => true,
            Self::Char(input) => input.is_empty(),
            Self::MathExpr(input) => input.is_empty(),
        }
    }

    /// The character input, if this is one.
    pub fn as_char(&self) -> Option<&CharInput> {
        match self {
            Self::Char(input) => Some(input),
            _ => None,
        }
    }

    /// Mutable access to the character input.
    pub fn as_char_mut(&mut self) -> Option<&mut CharInput> {
        match self {
            Self::Char(input) => Some(input),
            _ => None,
        }
    }

    /// The math expression, if this is one.
    pub fn as_math_expr(&self) -> Option<&MathExprInput> {
        match self {
            Self::MathExpr(input) => Some(input),
            _ => None,
        }
    }

    /// Mutable access to the math expression.
    pub fn as_math_expr_mut(&mut self) -> Option<&mut MathExprInput> {
        match self {
            Self::MathExpr(input) => Some(input),
            _ => None,
        }
    }

    /// Whether this is a math expression.
    pub fn is_math_expr(&self) -> bool {
        matches!(self, Self::MathExpr(_))
    }

    /// The paired input id.
    pub fn pair(&self) -> Option<InputId> {
        self.as_char().and_then(CharInput::pair)
    }

    /// Whether this is latin text.
    pub fn is_latin(&self) -> bool {
        self.as_char().is_some_and(CharInput::is_latin)
    }

    /// Whether this is a pinyin input.
    pub fn is_pinyin(&self) -> bool {
        self.as_char().is_some_and(CharInput::is_pinyin)
    }

    /// Whether this is one punctuation key.
    pub fn is_symbol(&self) -> bool {
        self.as_char().is_some_and(CharInput::is_symbol)
    }

    /// Whether this is one emoji key.
    pub fn is_emoji(&self) -> bool {
        self.as_char().is_some_and(CharInput::is_emoji)
    }

    /// Whether this is one arithmetic operator.
    pub fn is_math_op(&self) -> bool {
        self.as_char().and_then(CharInput::math_op).is_some()
    }

    /// Whether this renders as a spelling only.
    pub fn is_text_only_spell(&self, option: &InputOption) -> bool {
        self.as_char().is_some_and(|input| input.is_text_only_spell(option))
    }

    /// Finishes the input's own internal edits before it is committed.
    pub fn confirm(&mut self) {
        if let Self::MathExpr(input) = self {
            input.confirm();
        }
    }

    /// The rendered text.
    pub fn text(&self, option: &InputOption) -> String {
        match self {
            Self::Gap => String::new(),
            Self::Char(input) => input.text(option),
            Self::MathExpr(input) => input.text(option),
        }
    }
}

impl From<CharInput> for Input {
    fn from(input: CharInput) -> Self {
        Self::Char(input)
    }
}

impl From<MathExprInput> for Input {
    fn from(input: MathExprInput) -> Self {
        Self::MathExpr(Box::new(input))
    }
}

/// A phrase offered to complete the input just confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompletionInput {
    /// Words of the phrase that follow the confirmed input.
    pub words: Vec<String>,
}

impl CompletionInput {
    /// A completion of the given words.
    pub fn new(words: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    /// The words joined.
    pub fn text(&self) -> String {
        self.words.concat()
    }
}
