//! Keys: the pressable units of a keyboard layout.
//!
//! A [`Key`] is an immutable value. Layouts are rebuilt wholesale whenever the
//! keyboard changes, and every rebuild stamps a new generation into the
//! [`KeyId`]s it hands out, so a gesture that still targets a key of the
//! previous layout can be told apart from one that targets the current one.

use smallvec::SmallVec;

/// Stable identity of a key inside one layout generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId {
    generation: u32,
    index: u32,
}

impl KeyId {
    /// Creates an id for the `index`-th key of the layout built as `generation`.
    pub const fn new(generation: u32, index: u32) -> Self {
        Self { generation, index }
    }

    /// The layout generation that produced this id.
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Position of the key in its layout.
    pub const fn index(self) -> u32 {
        self.index
    }
}

/// Keyboard kinds the dispatcher can switch between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyboardType {
    /// Pinyin spelling keyboard.
    Pinyin,
    /// Ranked candidates for a chosen pinyin input.
    PinyinCandidates,
    /// Arithmetic expression keyboard.
    Math,
    /// Latin letters.
    Latin,
    /// Digits and numeric punctuation.
    Number,
    /// Punctuation and paired symbols.
    Symbol,
    /// Emoji.
    Emoji,
    /// Host editor operations and range selection.
    Editor,
}

impl KeyboardType {
    /// Whether keys of this keyboard are committed directly rather than composed.
    pub fn is_direct_input(self) -> bool {
        matches!(self, Self::Latin | Self::Number | Self::Symbol | Self::Emoji)
    }
}

/// Category of a character key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharKind {
    /// A latin letter.
    Alphabet,
    /// A decimal digit.
    Number,
    /// Punctuation.
    Symbol,
    /// An emoji glyph.
    Emoji,
}

/// Arithmetic keys of the math keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathOp {
    /// `=`
    Equal,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `×`
    Multiply,
    /// `÷`
    Divide,
    /// `%`
    Percent,
    /// `‰`
    Permill,
    /// `‱`
    Permyriad,
    /// The key that inserts a bracket pair.
    Brackets,
    /// `(` as inserted by [`MathOp::Brackets`].
    LeftBracket,
    /// `)` as inserted by [`MathOp::Brackets`].
    RightBracket,
    /// The decimal point.
    Dot,
}

impl MathOp {
    /// Text shown for the operator.
    pub fn text(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "×",
            Self::Divide => "÷",
            Self::Percent => "%",
            Self::Permill => "‰",
            Self::Permyriad => "‱",
            Self::Brackets => "( )",
            Self::LeftBracket => "(",
            Self::RightBracket => ")",
            Self::Dot => ".",
        }
    }

    /// Whether the operator is spaced from its operands when rendered.
    ///
    /// Postfix ratio operators stick to the number before them.
    pub fn is_spaced_operator(self) -> bool {
        !matches!(
            self,
            Self::Percent | Self::Permill | Self::Permyriad | Self::Dot
        )
    }
}

/// Operations forwarded to the host editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorAction {
    /// Delete the character before the host cursor.
    Backspace,
    /// Select the whole host text.
    SelectAll,
    /// Copy the host selection.
    Copy,
    /// Paste into the host.
    Paste,
    /// Cut the host selection.
    Cut,
    /// Undo the last host edit.
    Undo,
    /// Redo the last undone host edit.
    Redo,
}

/// Control keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CtrlKind {
    /// Delete backward.
    Backspace,
    /// Insert or commit a space.
    Space,
    /// Insert or commit a line break.
    Enter,
    /// Commit the input list text to the host.
    CommitInputList,
    /// Restore the last revocable commit.
    RevokeInput,
    /// Drop the pending overlay at the cursor.
    DropInput,
    /// Confirm the pending overlay at the cursor.
    ConfirmInput,
    /// Clear the whole input list, keeping an undo snapshot.
    CleanInputList,
    /// Restore the list cleared by [`CtrlKind::CleanInputList`].
    CancelCleanInputList,
    /// Switch to another keyboard.
    SwitchKeyboard(KeyboardType),
    /// Toggle between left and right hand layouts.
    SwitchHandMode,
    /// Slide to move the host cursor; double tap to select text.
    EditorCursorLocator,
    /// Slide to extend the host selection.
    EditorRangeSelector,
    /// Forward an editor operation.
    EditorEdit(EditorAction),
    /// Leave the current keyboard.
    Exit,
}

/// What a key is and what it carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// A character key with optional replacement variants.
    Char {
        /// Category of the character.
        kind: CharKind,
        /// The character text.
        value: String,
        /// Variants cycled through by repeated taps.
        replacements: SmallVec<[String; 2]>,
    },
    /// A symbol that is always inserted together with its closing partner.
    PairSymbol {
        /// Opening symbol.
        left: String,
        /// Closing symbol.
        right: String,
    },
    /// An arithmetic key.
    MathOp(MathOp),
    /// A control key.
    Ctrl(CtrlKind),
    /// A ranked candidate word.
    Candidate {
        /// Rank of the candidate, 0 being the best.
        index: usize,
        /// The candidate text.
        word: String,
    },
}

/// A pressable unit of a keyboard layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    id: KeyId,
    kind: KeyKind,
    disabled: bool,
}

impl Key {
    /// Creates a key of any kind.
    pub fn new(id: KeyId, kind: KeyKind) -> Self {
        Self {
            id,
            kind,
            disabled: false,
        }
    }

    /// Creates a character key without replacements.
    pub fn char(id: KeyId, kind: CharKind, value: impl Into<String>) -> Self {
        Self::new(
            id,
            KeyKind::Char {
                kind,
                value: value.into(),
                replacements: SmallVec::new(),
            },
        )
    }

    /// Creates a latin letter key whose replacement is its upper case form.
    pub fn alphabet(id: KeyId, value: &str) -> Self {
        let upper = value.to_uppercase();
        let key = Self::char(id, CharKind::Alphabet, value);
        if upper == value {
            key
        } else {
            key.with_replacements([upper])
        }
    }

    /// Creates a control key.
    pub fn ctrl(id: KeyId, kind: CtrlKind) -> Self {
        Self::new(id, KeyKind::Ctrl(kind))
    }

    /// Creates an arithmetic key.
    pub fn math(id: KeyId, op: MathOp) -> Self {
        Self::new(id, KeyKind::MathOp(op))
    }

    /// Creates a paired symbol key.
    pub fn pair_symbol(id: KeyId, left: impl Into<String>, right: impl Into<String>) -> Self {
        Self::new(
            id,
            KeyKind::PairSymbol {
                left: left.into(),
                right: right.into(),
            },
        )
    }

    /// Creates a candidate key.
    pub fn candidate(id: KeyId, index: usize, word: impl Into<String>) -> Self {
        Self::new(
            id,
            KeyKind::Candidate {
                index,
                word: word.into(),
            },
        )
    }

    /// Returns a copy carrying the given replacement variants.
    ///
    /// Only character keys keep replacements; other kinds are returned as is.
    pub fn with_replacements<I, S>(mut self, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let KeyKind::Char { replacements, .. } = &mut self.kind {
            replacements.extend(variants.into_iter().map(Into::into));
        }
        self
    }

    /// Returns a disabled copy of the key.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Returns a copy re-stamped with another id.
    pub fn with_id(mut self, id: KeyId) -> Self {
        self.id = id;
        self
    }

    /// The key identity.
    pub fn id(&self) -> KeyId {
        self.id
    }

    /// The key kind and payload.
    pub fn kind(&self) -> &KeyKind {
        &self.kind
    }

    /// Whether gestures on this key are ignored.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// The text the key inputs, if it inputs any.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            KeyKind::Char { value, .. } => Some(value),
            KeyKind::MathOp(op) => Some(op.text()),
            KeyKind::Candidate { word, .. } => Some(word),
            KeyKind::Ctrl(CtrlKind::Space) => Some(" "),
            KeyKind::Ctrl(CtrlKind::Enter) => Some("\n"),
            KeyKind::PairSymbol { .. } | KeyKind::Ctrl(_) => None,
        }
    }

    /// The character category, for character keys.
    pub fn char_kind(&self) -> Option<CharKind> {
        match &self.kind {
            KeyKind::Char { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The control kind, for control keys.
    pub fn ctrl_kind(&self) -> Option<CtrlKind> {
        match &self.kind {
            KeyKind::Ctrl(kind) => Some(*kind),
            _ => None,
        }
    }

    /// The operator, for arithmetic keys.
    pub fn math_op(&self) -> Option<MathOp> {
        match &self.kind {
            KeyKind::MathOp(op) => Some(*op),
            _ => None,
        }
    }

    /// Whether this is a latin letter key.
    pub fn is_alphabet(&self) -> bool {
        self.char_kind() == Some(CharKind::Alphabet)
    }

    /// Whether this is a digit key.
    pub fn is_number(&self) -> bool {
        self.char_kind() == Some(CharKind::Number)
    }

    /// Whether this key inputs latin text (letters or digits).
    pub fn is_latin(&self) -> bool {
        matches!(
            self.char_kind(),
            Some(CharKind::Alphabet | CharKind::Number)
        )
    }

    /// Whether this key inputs punctuation.
    pub fn is_symbol(&self) -> bool {
        matches!(self.kind, KeyKind::PairSymbol { .. })
            || self.char_kind() == Some(CharKind::Symbol)
    }

    /// Whether this key inputs an emoji.
    pub fn is_emoji(&self) -> bool {
        self.char_kind() == Some(CharKind::Emoji)
    }

    /// Whether both keys input the same character, ignoring identity.
    pub fn same_char(&self, other: &Key) -> bool {
        self.char_kind().is_some()
            && self.char_kind() == other.char_kind()
            && self.text() == other.text()
    }

    /// Whether the key has replacement variants.
    pub fn has_replacements(&self) -> bool {
        matches!(&self.kind, KeyKind::Char { replacements, .. } if !replacements.is_empty())
    }

    /// The key value followed by its replacements.
    ///
    /// Empty for keys without replacements.
    pub fn variants(&self) -> Vec<String> {
        match &self.kind {
            KeyKind::Char {
                value,
                replacements,
                ..
            } if !replacements.is_empty() => std::iter::once(value)
                .chain(replacements.iter())
                .cloned()
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Picks the variant for the `tick`-th consecutive tap.
    ///
    /// Variants cycle through the key value followed by its replacements, so
    /// tick 0 is the key itself. The picked key keeps the rest of the cycle as
    /// its replacements. Returns `None` for keys without replacements.
    pub fn replacement(&self, tick: u32) -> Option<Key> {
        let KeyKind::Char { kind, .. } = &self.kind else {
            return None;
        };
        let mut cycle = self.variants();
        if cycle.is_empty() {
            return None;
        }

        let index = tick as usize % cycle.len();
        cycle.rotate_left(index);
        let mut rest = cycle.into_iter();
        let value = rest.next()?;

        Some(Self {
            id: self.id,
            kind: KeyKind::Char {
                kind: *kind,
                value,
                replacements: rest.collect(),
            },
            disabled: self.disabled,
        })
    }
}
