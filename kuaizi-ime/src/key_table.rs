//! The built-in keyboard layouts.
//!
//! [`KeyTable`] lays keys out on a grid of equally sized cells: a main area
//! of [`MAIN_COLUMNS`] columns and [`ROWS`] rows, plus one control column on
//! the side of the holding hand. Left hand mode mirrors the control column to
//! the left edge and shifts the main area right by one cell.
//!
//! With the radial pad enabled the pinyin keyboard replaces its letter rows by
//! an [`XPadLayout`] centered on the main area.

use crate::{
    config::HandMode,
    key::{CharKind, CtrlKind, EditorAction, Key, KeyId, KeyboardType, MathOp},
    key_layout::{KeyLayout, KeyLayoutSource, LayoutRequest},
    px::{Px, PxPosition, PxRect},
    xpad::{RadialGeometry, XPadLayout},
};

/// Number of cell columns in the main area.
pub const MAIN_COLUMNS: i32 = 10;
/// Number of cell rows.
pub const ROWS: i32 = 5;
/// Maximum number of candidates laid out on the candidate keyboard.
pub const MAX_CANDIDATES: usize = 24;

const PINYIN_ROWS: [&str; 3] = ["qwertyuiop", "asdfghjkl", "zxcvbnm"];
const PINYIN_SYMBOLS: [&str; 3] = ["，", "。", "？"];

const XPAD_INNER: [&str; 6] = ["a", "o", "e", "i", "u", "v"];
const XPAD_OUTER: [(&str, &str); 8] = [
    ("bp", "mf"),
    ("dt", "nl"),
    ("gk", "hj"),
    ("qx", "rz"),
    ("cs", "yw"),
    ("zc", "sh"),
    ("ng", "ly"),
    ("wx", "jq"),
];

const NUMBER_SYMBOLS: [&str; 6] = [".", ",", ":", "/", "-", "@"];
const SYMBOLS: [&str; 10] = ["，", "。", "？", "！", "：", "；", "、", "…", "·", "～"];
const PAIR_SYMBOLS: [(&str, &str); 5] = [("（", "）"), ("《", "》"), ("“", "”"), ("‘", "’"), ("【", "】")];
const EMOJIS: [&str; 20] = [
    "😀", "😂", "🥹", "😍", "😎", "🤔", "😭", "😡", "👍", "👎", "🙏", "👏", "💪", "🎉", "❤️",
    "🔥", "✨", "🌹", "🍉", "☕",
];

const MATH_ROWS: [[MathCell; 5]; 4] = [
    [MathCell::Digit("7"), MathCell::Digit("8"), MathCell::Digit("9"), MathCell::Op(MathOp::Divide), MathCell::Op(MathOp::Percent)],
    [MathCell::Digit("4"), MathCell::Digit("5"), MathCell::Digit("6"), MathCell::Op(MathOp::Multiply), MathCell::Op(MathOp::Permill)],
    [MathCell::Digit("1"), MathCell::Digit("2"), MathCell::Digit("3"), MathCell::Op(MathOp::Minus), MathCell::Op(MathOp::Permyriad)],
    [MathCell::Op(MathOp::Dot), MathCell::Digit("0"), MathCell::Op(MathOp::Equal), MathCell::Op(MathOp::Plus), MathCell::Op(MathOp::Brackets)],
];

#[derive(Debug, Clone, Copy)]
enum MathCell {
    Digit(&'static str),
    Op(MathOp),
}

/// Grid based [`KeyLayoutSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyTable {
    cell_width: Px,
    cell_height: Px,
}

impl Default for KeyTable {
    fn default() -> Self {
        Self::new(Px(40), Px(50))
    }
}

impl KeyTable {
    /// Creates a table with the given cell size.
    pub fn new(cell_width: Px, cell_height: Px) -> Self {
        Self {
            cell_width,
            cell_height,
        }
    }

    /// Width of the whole keyboard surface.
    pub fn surface_width(&self) -> Px {
        Px(self.cell_width.0 * (MAIN_COLUMNS + 1))
    }

    /// Bounds of a main area cell run.
    pub fn main_cell(&self, hand_mode: HandMode, row: i32, col: i32, span: i32) -> PxRect {
        let offset = match hand_mode {
            HandMode::Left => 1,
            HandMode::Right => 0,
        };
        PxRect::new(
            Px(self.cell_width.0 * (col + offset)),
            Px(self.cell_height.0 * row),
            Px(self.cell_width.0 * span),
            self.cell_height,
        )
    }

    /// Bounds of a control column cell.
    pub fn control_cell(&self, hand_mode: HandMode, row: i32) -> PxRect {
        let rect = PxRect::new(
            Px(self.cell_width.0 * MAIN_COLUMNS),
            Px(self.cell_height.0 * row),
            self.cell_width,
            self.cell_height,
        );
        match hand_mode {
            HandMode::Left => rect.mirrored(self.surface_width()),
            HandMode::Right => rect,
        }
    }

    fn xpad_geometry(&self, hand_mode: HandMode) -> RadialGeometry {
        let area = self.main_cell(hand_mode, 0, 0, MAIN_COLUMNS);
        // The pad covers the three letter rows.
        let height = self.cell_height.0 * (ROWS - 2);
        let center = PxPosition::new(Px(area.x.0 + area.width.0 / 2), Px(height / 2));
        let unit = self.cell_height.to_f32();
        RadialGeometry::new(
            center,
            unit * 0.5,
            unit,
            unit * 1.5,
            XPAD_INNER.len(),
            XPAD_OUTER.len(),
        )
    }
}

struct Grid<'a> {
    table: &'a KeyTable,
    hand_mode: HandMode,
    layout: KeyLayout,
}

impl Grid<'_> {
    fn main(&mut self, row: i32, col: i32, span: i32, build: impl FnOnce(KeyId) -> Key) -> KeyId {
        let bounds = self.table.main_cell(self.hand_mode, row, col, span);
        self.layout.add(build, Some(bounds))
    }

    fn control(&mut self, row: i32, build: impl FnOnce(KeyId) -> Key) -> KeyId {
        let bounds = self.table.control_cell(self.hand_mode, row);
        self.layout.add(build, Some(bounds))
    }

    fn floating(&mut self, build: impl FnOnce(KeyId) -> Key) -> KeyId {
        self.layout.add(build, None)
    }

    fn char_row(&mut self, row: i32, kind: CharKind, texts: &[&str]) {
        for (col, text) in texts.iter().enumerate() {
            let text = *text;
            self.main(row, col as i32, 1, |id| Key::char(id, kind, text));
        }
    }

    fn control_column(&mut self, request: &LayoutRequest<'_>) {
        self.control(0, |id| Key::ctrl(id, CtrlKind::Backspace));
        if request.can_revoke && !request.has_input {
            self.control(1, |id| Key::ctrl(id, CtrlKind::RevokeInput));
        } else {
            let has_input = request.has_input;
            self.control(1, |id| {
                let key = Key::ctrl(id, CtrlKind::CommitInputList);
                if has_input { key } else { key.disabled() }
            });
        }
        self.control(2, |id| Key::ctrl(id, CtrlKind::Space));
        self.control(3, |id| Key::ctrl(id, CtrlKind::Enter));
        self.control(4, |id| Key::ctrl(id, CtrlKind::Exit));
    }

    fn switch_row(&mut self, current: KeyboardType) {
        const TARGETS: [KeyboardType; 6] = [
            KeyboardType::Pinyin,
            KeyboardType::Latin,
            KeyboardType::Number,
            KeyboardType::Symbol,
            KeyboardType::Emoji,
            KeyboardType::Math,
        ];

        let mut col = 0;
        for target in TARGETS.into_iter().filter(|target| *target != current) {
            self.main(ROWS - 1, col, 1, |id| {
                Key::ctrl(id, CtrlKind::SwitchKeyboard(target))
            });
            col += 1;
        }
        self.main(ROWS - 1, col, 1, |id| Key::ctrl(id, CtrlKind::EditorCursorLocator));
        self.main(ROWS - 1, col + 1, 1, |id| Key::ctrl(id, CtrlKind::SwitchHandMode));
        self.main(ROWS - 1, col + 2, 1, |id| Key::ctrl(id, CtrlKind::CleanInputList));
        self.main(ROWS - 1, col + 3, 1, |id| Key::ctrl(id, CtrlKind::CancelCleanInputList));
    }

    fn pinyin(&mut self, request: &LayoutRequest<'_>) {
        if request.xpad_enabled {
            self.pinyin_xpad();
        } else {
            for (row, letters) in PINYIN_ROWS.iter().enumerate() {
                for (col, letter) in letters.char_indices() {
                    let letter = letter.to_string();
                    self.main(row as i32, col as i32, 1, |id| {
                        Key::char(id, CharKind::Alphabet, letter)
                    });
                }
            }
        }

        for (col, symbol) in PINYIN_SYMBOLS.iter().enumerate() {
            let symbol = *symbol;
            self.main(3, col as i32, 1, |id| Key::char(id, CharKind::Symbol, symbol));
        }
        self.main(3, 3, 4, |id| Key::ctrl(id, CtrlKind::Space));
        self.main(3, 7, 1, |id| Key::ctrl(id, CtrlKind::ConfirmInput));
        self.main(3, 8, 1, |id| Key::ctrl(id, CtrlKind::DropInput));
        self.switch_row(KeyboardType::Pinyin);
    }

    fn pinyin_xpad(&mut self) {
        let mut xpad = XPadLayout::new(self.table.xpad_geometry(self.hand_mode));

        let center = self.floating(|id| Key::ctrl(id, CtrlKind::Backspace));
        xpad.set_center_key(center);

        for (block, letter) in XPAD_INNER.iter().enumerate() {
            let letter = *letter;
            let key = self.floating(|id| Key::char(id, CharKind::Alphabet, letter));
            xpad.set_inner_key(block, key);
        }
        for (block, sides) in XPAD_OUTER.iter().enumerate() {
            for (side, letters) in [sides.0, sides.1].into_iter().enumerate() {
                for letter in letters.chars() {
                    let letter = letter.to_string();
                    let key = self.floating(|id| Key::char(id, CharKind::Alphabet, letter));
                    xpad.push_outer_key(block, side, key);
                }
            }
        }

        self.layout.set_xpad(xpad);
    }

    fn latin(&mut self) {
        for (row, letters) in PINYIN_ROWS.iter().enumerate() {
            for (col, letter) in letters.char_indices() {
                let letter = letter.to_string();
                self.main(row as i32, col as i32, 1, |id| Key::alphabet(id, &letter));
            }
        }
        self.char_row(3, CharKind::Symbol, &[",", ".", "?", "!", "'"]);
        self.main(3, 5, 5, |id| Key::ctrl(id, CtrlKind::Space));
        self.switch_row(KeyboardType::Latin);
    }

    fn number(&mut self) {
        self.char_row(0, CharKind::Number, &["1", "2", "3", "4", "5"]);
        self.char_row(1, CharKind::Number, &["6", "7", "8", "9", "0"]);
        self.char_row(2, CharKind::Symbol, &NUMBER_SYMBOLS);
        self.main(3, 0, 10, |id| Key::ctrl(id, CtrlKind::Space));
        self.switch_row(KeyboardType::Number);
    }

    fn symbol(&mut self) {
        self.char_row(0, CharKind::Symbol, &SYMBOLS);
        for (col, (left, right)) in PAIR_SYMBOLS.iter().enumerate() {
            let (left, right) = (*left, *right);
            self.main(1, col as i32 * 2, 2, |id| Key::pair_symbol(id, left, right));
        }
        self.main(3, 0, 10, |id| Key::ctrl(id, CtrlKind::Space));
        self.switch_row(KeyboardType::Symbol);
    }

    fn emoji(&mut self) {
        for (index, emoji) in EMOJIS.iter().enumerate() {
            let emoji = *emoji;
            let (row, col) = (index as i32 / MAIN_COLUMNS, index as i32 % MAIN_COLUMNS);
            self.main(row, col, 1, |id| Key::char(id, CharKind::Emoji, emoji));
        }
        self.main(3, 0, 10, |id| Key::ctrl(id, CtrlKind::Space));
        self.switch_row(KeyboardType::Emoji);
    }

    fn math(&mut self) {
        for (row, cells) in MATH_ROWS.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                let (row, col) = (row as i32, col as i32 * 2);
                match *cell {
                    MathCell::Digit(digit) => {
                        self.main(row, col, 2, |id| Key::char(id, CharKind::Number, digit))
                    }
                    MathCell::Op(op) => self.main(row, col, 2, |id| Key::math(id, op)),
                };
            }
        }
        self.switch_row(KeyboardType::Math);
    }

    fn candidates(&mut self, candidates: &[String]) {
        let per_row = MAIN_COLUMNS / 2;
        for (index, word) in candidates.iter().take(MAX_CANDIDATES).enumerate() {
            let (row, col) = (index as i32 / per_row, index as i32 % per_row);
            if row >= ROWS - 1 {
                // Beyond the visible rows: reachable by sliding only.
                self.floating(|id| Key::candidate(id, index, word.as_str()));
            } else {
                self.main(row, col * 2, 2, |id| Key::candidate(id, index, word.as_str()));
            }
        }
        self.main(ROWS - 1, 0, 2, |id| Key::ctrl(id, CtrlKind::SwitchKeyboard(KeyboardType::Pinyin)));
        self.main(ROWS - 1, 2, 2, |id| Key::ctrl(id, CtrlKind::DropInput));
    }

    fn editor(&mut self) {
        const ACTIONS: [EditorAction; 7] = [
            EditorAction::SelectAll,
            EditorAction::Copy,
            EditorAction::Paste,
            EditorAction::Cut,
            EditorAction::Undo,
            EditorAction::Redo,
            EditorAction::Backspace,
        ];
        for (index, action) in ACTIONS.into_iter().enumerate() {
            let (row, col) = (index as i32 / 4, index as i32 % 4);
            self.main(row, col * 2, 2, |id| Key::ctrl(id, CtrlKind::EditorEdit(action)));
        }
        self.main(2, 0, 5, |id| Key::ctrl(id, CtrlKind::EditorCursorLocator));
        self.main(2, 5, 5, |id| Key::ctrl(id, CtrlKind::EditorRangeSelector));
        self.main(ROWS - 1, 0, 2, |id| Key::ctrl(id, CtrlKind::SwitchKeyboard(KeyboardType::Pinyin)));
    }
}

impl KeyLayoutSource for KeyTable {
    fn build(&self, request: &LayoutRequest<'_>) -> KeyLayout {
        let mut grid = Grid {
            table: self,
            hand_mode: request.hand_mode,
            layout: KeyLayout::new(request.keyboard, request.generation),
        };

        match request.keyboard {
            KeyboardType::Pinyin => grid.pinyin(request),
            KeyboardType::PinyinCandidates => grid.candidates(request.candidates),
            KeyboardType::Math => grid.math(),
            KeyboardType::Latin => grid.latin(),
            KeyboardType::Number => grid.number(),
            KeyboardType::Symbol => grid.symbol(),
            KeyboardType::Emoji => grid.emoji(),
            KeyboardType::Editor => grid.editor(),
        }
        grid.control_column(request);

        grid.layout
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn request(keyboard: KeyboardType) -> LayoutRequest<'static> {
        LayoutRequest {
            keyboard,
            generation: 7,
            hand_mode: HandMode::Right,
            xpad_enabled: false,
            candidates: &[],
            has_input: false,
            can_revoke: false,
        }
    }

    fn find_ctrl(layout: &KeyLayout, kind: CtrlKind) -> Option<&Key> {
        layout.find_by(|key| key.ctrl_kind() == Some(kind))
    }

    #[rstest(
        keyboard,
        case(KeyboardType::Pinyin),
        case(KeyboardType::PinyinCandidates),
        case(KeyboardType::Math),
        case(KeyboardType::Latin),
        case(KeyboardType::Number),
        case(KeyboardType::Symbol),
        case(KeyboardType::Emoji),
        case(KeyboardType::Editor)
    )]
    fn test_every_keyboard_builds(keyboard: KeyboardType) {
        let layout = KeyTable::default().build(&request(keyboard));

        assert_eq!(layout.keyboard(), keyboard);
        assert!(layout.keys().all(|laid| laid.key.id().generation() == 7));
        assert!(find_ctrl(&layout, CtrlKind::Backspace).is_some());
    }

    #[test]
    fn test_left_hand_mirrors_control_column() {
        let table = KeyTable::default();
        let right = table.build(&request(KeyboardType::Pinyin));
        let left = table.build(&LayoutRequest {
            hand_mode: HandMode::Left,
            ..request(KeyboardType::Pinyin)
        });

        let bounds = |layout: &KeyLayout, kind| {
            layout
                .keys()
                .find(|laid| laid.key.ctrl_kind() == Some(kind))
                .and_then(|laid| laid.bounds)
        };
        assert_eq!(bounds(&right, CtrlKind::Backspace).map(|rect| rect.x), Some(Px(400)));
        assert_eq!(bounds(&left, CtrlKind::Backspace).map(|rect| rect.x), Some(Px(0)));

        let q_right = right.hit_test(PxPosition::new(Px(5), Px(5)));
        let q_left = left.hit_test(PxPosition::new(Px(45), Px(5)));
        assert_eq!(q_right.and_then(Key::text), Some("q"));
        assert_eq!(q_left.and_then(Key::text), Some("q"));
    }

    #[test]
    fn test_commit_key_follows_input_state() {
        let table = KeyTable::default();

        let empty = table.build(&request(KeyboardType::Pinyin));
        assert!(find_ctrl(&empty, CtrlKind::CommitInputList).is_some_and(Key::is_disabled));

        let revocable = table.build(&LayoutRequest {
            can_revoke: true,
            ..request(KeyboardType::Pinyin)
        });
        assert!(find_ctrl(&revocable, CtrlKind::RevokeInput).is_some());
        assert!(find_ctrl(&revocable, CtrlKind::CommitInputList).is_none());
    }

    #[test]
    fn test_xpad_pinyin() {
        let layout = KeyTable::default().build(&LayoutRequest {
            xpad_enabled: true,
            ..request(KeyboardType::Pinyin)
        });

        let xpad = layout.xpad();
        assert!(xpad.is_some());
        let inner = xpad.and_then(|xpad| xpad.inner_key(0)).and_then(|id| layout.find(id));
        assert_eq!(inner.and_then(Key::text), Some("a"));
        assert!(xpad.and_then(|xpad| xpad.outer_key(0, 1)).is_some());
    }

    #[test]
    fn test_candidates_are_laid_out_in_rank_order() {
        let candidates = ["你".to_owned(), "泥".to_owned(), "尼".to_owned()];
        let layout = KeyTable::default().build(&LayoutRequest {
            candidates: &candidates,
            ..request(KeyboardType::PinyinCandidates)
        });

        let words: Vec<_> = layout
            .keys()
            .filter_map(|laid| match laid.key.kind() {
                crate::key::KeyKind::Candidate { index, word } => Some((*index, word.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(
            words,
            vec![(0, "你".to_owned()), (1, "泥".to_owned()), (2, "尼".to_owned())]
        );
    }
}
