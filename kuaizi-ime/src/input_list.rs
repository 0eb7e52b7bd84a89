//! The composition buffer.
//!
//! # Overview
//!
//! An [`InputList`] is an ordered sequence of [`Input`]s in which gaps and
//! contents alternate, starting and ending with a gap:
//!
//! ```text
//! position:  0    1     2    3    4
//!            Gap  "ni"  Gap  "("  Gap ...
//! ```
//!
//! Gaps are the only insertion points. Contents are never adjacent.
//!
//! Beside the sequence the list keeps *pending overlays*: edited copies of a
//! position's input (or, on a gap, the input about to be inserted there)
//! that shadow it until [`InputList::commit_pending`] merges them back. The
//! cursor is the selected position; most editing goes through its overlay.
//!
//! Character inputs may be *paired* (brackets, quotes). Pairing is always
//! mutual and both partners are always in the list.
//!
//! ## Invariants
//!
//! [`InputList::check_invariants`] verifies after the fact what every
//! mutation maintains:
//!
//! - gaps strictly alternate with contents;
//! - pending overlays are never gaps and are keyed to inputs of the list;
//! - pairs are mutual and both partners are present;
//! - a math expression being edited sits as an overlay on a gap and has no
//!   leading gap of its own until it is committed; the rendering of that gap
//!   reserves one extra gap width meanwhile (see [`InputList::gap_space_width`]).

use std::fmt;

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use crate::{
    error::InvariantViolation,
    input::{CharInput, CompletionInput, Input, InputOption},
    key::MathOp,
};

new_key_type! {
    /// Identity of an input inside one [`InputList`].
    pub struct InputId;
}

#[derive(Clone)]
enum Staged {
    Committed(Box<InputList>),
    Cleaned(Box<InputList>),
}

impl fmt::Debug for Staged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Committed(_) => f.write_str("Committed(..)"),
            Self::Cleaned(_) => f.write_str("Cleaned(..)"),
        }
    }
}

/// An ordered, gap-interleaved sequence of inputs with pending overlays.
#[derive(Debug, Clone)]
pub struct InputList {
    inputs: SlotMap<InputId, Input>,
    order: Vec<InputId>,
    pendings: FxHashMap<InputId, Input>,
    selected: InputId,
    option: InputOption,
    completions: Vec<CompletionInput>,
    staged: Option<Staged>,
}

impl Default for InputList {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for InputList {
    fn eq(&self, other: &Self) -> bool {
        self.order.len() == other.order.len()
            && self.option == other.option
            && self.selected_position() == other.selected_position()
            && (0..self.order.len()).all(|pos| {
                self.get_input(pos) == other.get_input(pos)
                    && self.pending_on(pos) == other.pending_on(pos)
            })
    }
}

impl InputList {
    /// Creates a list holding one selected gap.
    pub fn new() -> Self {
        let mut inputs = SlotMap::with_key();
        let gap = inputs.insert(Input::Gap);
        Self {
            inputs,
            order: vec![gap],
            pendings: FxHashMap::default(),
            selected: gap,
            option: InputOption::default(),
            completions: Vec::new(),
            staged: None,
        }
    }

    // ---- Lookup ----

    /// Number of positions, gaps included.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Rendering hints.
    pub fn option(&self) -> &InputOption {
        &self.option
    }

    /// Replaces the rendering hints.
    pub fn set_option(&mut self, option: InputOption) {
        self.option = option;
    }

    /// The identity of the input at `pos`.
    pub fn id_at(&self, pos: usize) -> Option<InputId> {
        self.order.get(pos).copied()
    }

    /// The position of an input.
    pub fn position_of(&self, id: InputId) -> Option<usize> {
        self.order.iter().position(|other| *other == id)
    }

    /// The input at `pos`, ignoring overlays.
    pub fn get_input(&self, pos: usize) -> Option<&Input> {
        self.id_at(pos).and_then(|id| self.inputs.get(id))
    }

    /// The input with identity `id`.
    pub fn input(&self, id: InputId) -> Option<&Input> {
        self.inputs.get(id)
    }

    /// The overlay pending on `pos`.
    pub fn pending_on(&self, pos: usize) -> Option<&Input> {
        self.id_at(pos).and_then(|id| self.pendings.get(&id))
    }

    /// The overlay on `pos` if it holds anything, otherwise the input itself.
    pub fn effective_input(&self, pos: usize) -> Option<&Input> {
        self.id_at(pos).and_then(|id| self.effective(id))
    }

    fn effective(&self, id: InputId) -> Option<&Input> {
        self.non_empty_pending(id).or_else(|| self.inputs.get(id))
    }

    fn non_empty_pending(&self, id: InputId) -> Option<&Input> {
        self.pendings.get(&id).filter(|pending| !pending.is_empty())
    }

    fn is_gap_id(&self, id: InputId) -> bool {
        self.inputs.get(id).is_some_and(Input::is_gap)
    }

    /// Every non-gap character input in order, overlays applied.
    pub fn char_inputs(&self) -> Vec<(InputId, &CharInput)> {
        self.order
            .iter()
            .filter_map(|id| {
                self.effective(*id)
                    .and_then(Input::as_char)
                    .map(|input| (*id, input))
            })
            .collect()
    }

    /// Whether nothing has been typed, overlays included.
    pub fn is_empty(&self) -> bool {
        self.order
            .iter()
            .all(|id| self.effective(*id).is_none_or(Input::is_empty))
    }

    // ---- Selection ----

    /// Position of the cursor.
    pub fn selected_position(&self) -> usize {
        self.position_of(self.selected).unwrap_or(0)
    }

    /// The selected input, ignoring its overlay.
    pub fn selected_input(&self) -> Option<&Input> {
        self.inputs.get(self.selected)
    }

    /// Whether the cursor is on a gap.
    pub fn is_gap_selected(&self) -> bool {
        self.is_gap_id(self.selected)
    }

    /// Whether `pos` is selected, directly or as the partner of the selection.
    pub fn is_selected(&self, pos: usize) -> bool {
        let Some(id) = self.id_at(pos) else {
            return false;
        };
        id == self.selected || self.inputs.get(self.selected).and_then(Input::pair) == Some(id)
    }

    /// Confirms the pending overlay, then moves the cursor to `pos`.
    ///
    /// Returns `false` when `pos` is out of range or already selected.
    pub fn select(&mut self, pos: usize) -> bool {
        let Some(id) = self.id_at(pos) else {
            return false;
        };
        if id == self.selected {
            return false;
        }

        self.confirm_pending();
        if !self.inputs.contains_key(id) {
            return false;
        }
        self.selected = id;
        true
    }

    /// Confirms the pending overlay, then selects the trailing gap.
    pub fn select_last(&mut self) {
        self.confirm_pending();
        if let Some(last) = self.order.last() {
            self.selected = *last;
        }
    }

    /// Confirms the pending overlay, then moves the cursor `offset`
    /// positions away from the confirmed input.
    ///
    /// Nothing moves when there was nothing to confirm.
    pub fn confirm_pending_and_select_by_offset(&mut self, offset: isize) -> bool {
        let Some(pos) = self.confirm_pending() else {
            return false;
        };
        let target = pos
            .checked_add_signed(offset)
            .and_then(|target| self.id_at(target));
        match target {
            Some(id) => {
                self.selected = id;
                true
            }
            None => false,
        }
    }

    /// [`confirm_pending_and_select_by_offset`](Self::confirm_pending_and_select_by_offset)
    /// to the gap after the confirmed input.
    pub fn confirm_pending_and_select_next(&mut self) -> bool {
        self.confirm_pending_and_select_by_offset(1)
    }

    // ---- Pending overlays ----

    /// The overlay pending on the cursor.
    pub fn pending(&self) -> Option<&Input> {
        self.pendings.get(&self.selected)
    }

    /// Mutable access to the overlay pending on the cursor.
    pub fn pending_mut(&mut self) -> Option<&mut Input> {
        self.staged = None;
        self.pendings.get_mut(&self.selected)
    }

    /// Whether a non-empty overlay is pending on the cursor.
    pub fn has_pending(&self) -> bool {
        self.non_empty_pending(self.selected).is_some()
    }

    /// The overlay on the cursor, created first when there is none.
    ///
    /// A new overlay on a gap is an empty character input; on a content it is
    /// a copy of that content.
    pub fn ensure_pending(&mut self) -> &mut Input {
        self.staged = None;
        self.completions.clear();
        let selected = self.selected;
        let inputs = &self.inputs;
        self.pendings.entry(selected).or_insert_with(|| match inputs.get(selected) {
            Some(Input::Gap) | None => Input::Char(CharInput::new()),
            Some(input) => input.clone(),
        })
    }

    /// Replaces the overlay on the cursor with `input`.
    ///
    /// A gap is replaced by an empty character input.
    pub fn new_pending(&mut self, input: Input) -> &mut Input {
        let input = match input {
            Input::Gap => Input::Char(CharInput::new()),
            input => input,
        };
        self.staged = None;
        self.completions.clear();
        self.pendings.insert(self.selected, input);
        self.ensure_pending()
    }

    /// Sets or clears the overlay on `pos`.
    ///
    /// Returns `false` when `pos` is out of range or `input` is a gap. A pair
    /// link carried by `input` is dropped; committing onto a content keeps
    /// the link of that content.
    pub fn replace_pending(&mut self, pos: usize, input: Option<Input>) -> bool {
        let Some(id) = self.id_at(pos) else {
            return false;
        };
        self.staged = None;
        match input {
            Some(Input::Gap) => false,
            Some(mut input) => {
                if let Some(input) = input.as_char_mut() {
                    input.set_pair(None);
                }
                self.pendings.insert(id, input);
                true
            }
            None => {
                self.pendings.remove(&id);
                true
            }
        }
    }

    /// Discards the overlay on the cursor.
    pub fn drop_pending(&mut self) -> Option<Input> {
        self.pendings.remove(&self.selected)
    }

    /// Merges the overlay on `pos` into the sequence.
    ///
    /// On a gap the overlay is inserted as a new content with a gap of its
    /// own before it; on a content it replaces the content, keeping the
    /// identity and the pair link. The cursor follows the merged input when
    /// it was on `pos`. An empty overlay is discarded.
    ///
    /// Returns the position of the merged input, `None` when nothing was
    /// pending there. Calling it again is a no-op.
    pub fn commit_pending(&mut self, pos: usize) -> Option<usize> {
        let id = self.id_at(pos)?;
        let mut pending = self.pendings.remove(&id)?;
        self.staged = None;
        if pending.is_empty() {
            return None;
        }
        pending.confirm();

        if self.is_gap_id(id) {
            let at = self.insert_at(pos, pending)?;
            if self.selected == id {
                self.selected = self.order[at];
            }
            return Some(at);
        }

        let pair = self.inputs.get(id).and_then(Input::pair);
        match pending.as_char_mut() {
            Some(input) => input.set_pair(pair),
            None => self.unlink(id),
        }
        if let Some(slot) = self.inputs.get_mut(id) {
            *slot = pending;
        }
        Some(pos)
    }

    /// Merges the overlay on the cursor.
    ///
    /// An empty overlay is dropped; an emptied math expression under the
    /// cursor is removed from the list.
    pub fn confirm_pending(&mut self) -> Option<usize> {
        let pos = self.selected_position();
        if self.has_pending() {
            return self.commit_pending(pos);
        }

        self.drop_pending();
        let emptied_math = self
            .selected_input()
            .is_some_and(|input| input.is_math_expr() && input.is_empty());
        if emptied_math {
            self.remove(pos);
        }
        None
    }

    // ---- Mutation ----

    /// Inserts a content at the gap `gap_pos`.
    ///
    /// The gap is split around the new input: a new gap before it, the old
    /// gap (and the cursor, if it was there) after it. Returns the position
    /// of the inserted input, `None` when `gap_pos` is no gap or `input` is
    /// one. The input enters unpaired; links are made by [`Self::pair`].
    pub fn insert_at(&mut self, gap_pos: usize, mut input: Input) -> Option<usize> {
        if input.is_gap() || !self.id_at(gap_pos).is_some_and(|id| self.is_gap_id(id)) {
            return None;
        }
        self.staged = None;
        if let Some(input) = input.as_char_mut() {
            input.set_pair(None);
        }

        let gap = self.inputs.insert(Input::Gap);
        let content = self.inputs.insert(input);
        self.order.splice(gap_pos..gap_pos, [gap, content]);
        Some(gap_pos + 1)
    }

    /// Removes the content at `pos` together with the gap before it.
    ///
    /// A paired partner stays in the list, unlinked. A cursor on the removed
    /// input moves to the gap that followed it. Returns `false` when `pos` is
    /// no content.
    pub fn remove(&mut self, pos: usize) -> bool {
        if pos % 2 == 0 || pos >= self.order.len() {
            return false;
        }
        self.staged = None;

        let id = self.order[pos];
        let gap = self.order[pos - 1];
        self.unlink(id);
        self.order.drain(pos - 1..=pos);
        for removed in [id, gap] {
            self.inputs.remove(removed);
            self.pendings.remove(&removed);
        }

        if self.selected == id || self.selected == gap {
            self.selected = self.order[pos - 1];
        }
        true
    }

    /// Removes every input. Rendering hints are kept.
    pub fn clear(&mut self) {
        let option = self.option;
        *self = Self::new();
        self.option = option;
    }

    /// Deletes backward from the cursor.
    ///
    /// - a latin input of several keys loses its last key;
    /// - on a gap, the content before it is removed (a latin one is selected
    ///   first instead), or the overlay is dropped when it holds something;
    /// - on a content, it is removed.
    ///
    /// Removing a paired input also removes its partner.
    pub fn delete_backward(&mut self) -> bool {
        if self.drop_last_latin_key() {
            return true;
        }

        let pos = self.selected_position();
        if !self.is_gap_selected() {
            return self.remove_with_pair(self.selected);
        }
        if pos == 0 || self.has_pending() {
            return self.drop_pending().is_some();
        }

        let prev = self.order[pos - 1];
        if self.inputs.get(prev).is_some_and(is_multi_key_latin) {
            self.selected = prev;
            return true;
        }
        self.remove_with_pair(prev)
    }

    /// Deletes the selected content with its partner and drops the overlay.
    ///
    /// On a gap only the overlay is dropped.
    pub fn delete_selected(&mut self) -> bool {
        let deleted = !self.is_gap_selected() && self.remove_with_pair(self.selected);
        self.drop_pending().is_some() || deleted
    }

    fn drop_last_latin_key(&mut self) -> bool {
        let multi_key = self.effective(self.selected).is_some_and(is_multi_key_latin);
        if !multi_key {
            return false;
        }
        match self.ensure_pending().as_char_mut() {
            Some(input) => input.drop_last_key().is_some(),
            None => false,
        }
    }

    fn remove_with_pair(&mut self, id: InputId) -> bool {
        let partner = self.inputs.get(id).and_then(Input::pair);
        if let Some(partner_pos) = partner.and_then(|partner| self.position_of(partner)) {
            self.remove(partner_pos);
        }
        self.position_of(id).is_some_and(|pos| self.remove(pos))
    }

    // ---- Pairing ----

    /// Links the character inputs at `a` and `b`.
    ///
    /// Previous links of both are undone first. Returns `false` unless both
    /// positions hold distinct character inputs.
    pub fn pair(&mut self, a: usize, b: usize) -> bool {
        let (Some(a_id), Some(b_id)) = (self.id_at(a), self.id_at(b)) else {
            return false;
        };
        let both_chars = [a_id, b_id]
            .iter()
            .all(|id| self.inputs.get(*id).and_then(Input::as_char).is_some());
        if a_id == b_id || !both_chars {
            return false;
        }

        self.unlink(a_id);
        self.unlink(b_id);
        self.set_pair(a_id, Some(b_id));
        self.set_pair(b_id, Some(a_id));
        true
    }

    /// Position of the partner of the input at `pos`.
    pub fn pair_of(&self, pos: usize) -> Option<usize> {
        self.get_input(pos)
            .and_then(Input::pair)
            .and_then(|partner| self.position_of(partner))
    }

    /// Inserts two linked inputs.
    ///
    /// On a gap they are inserted there with the cursor left between them;
    /// on a content they wrap it and the cursor moves after the closing one.
    pub fn insert_pair(&mut self, left: CharInput, right: CharInput) -> bool {
        self.confirm_pending();
        let pos = self.selected_position();

        let inserted = if pos % 2 == 1 {
            self.insert_at(pos - 1, left.into()).and_then(|left_pos| {
                let right_pos = self.insert_at(left_pos + 3, right.into())?;
                self.selected = self.order[right_pos + 1];
                Some((left_pos, right_pos))
            })
        } else {
            self.insert_at(pos, left.into()).and_then(|left_pos| {
                let right_pos = self.insert_at(left_pos + 1, right.into())?;
                self.selected = self.order[left_pos + 1];
                Some((left_pos, right_pos))
            })
        };

        inserted.is_some_and(|(left_pos, right_pos)| self.pair(left_pos, right_pos))
    }

    fn set_pair(&mut self, id: InputId, pair: Option<InputId>) {
        if let Some(input) = self.inputs.get_mut(id).and_then(Input::as_char_mut) {
            input.set_pair(pair);
        }
        if let Some(input) = self.pendings.get_mut(&id).and_then(Input::as_char_mut) {
            input.set_pair(pair);
        }
    }

    fn unlink(&mut self, id: InputId) {
        if let Some(partner) = self.inputs.get(id).and_then(Input::pair) {
            self.set_pair(partner, None);
        }
        self.set_pair(id, None);
    }

    // ---- Rendering ----

    /// Whether a space is rendered before `pos`.
    ///
    /// A gap is spaced when the inputs on both of its sides call for it:
    /// latin text next to anything but punctuation, arithmetic operators
    /// other than percent signs, non-empty math expressions and pinyin
    /// rendered as spelling. Whitespace inputs are never spaced. A content is
    /// spaced only from an overlay pending on the gap before it.
    pub fn need_gap_space(&self, pos: usize) -> bool {
        let total = self.order.len();
        if pos == 0 || pos >= total {
            return false;
        }

        let id = self.order[pos];
        let left_id = self.order[pos - 1];
        let (left, right) = if self.is_gap_id(id) {
            let right = match self.non_empty_pending(id) {
                Some(pending) => Some(pending),
                None if pos == total - 1 => None,
                None => self.effective(self.order[pos + 1]),
            };
            (self.effective(left_id), right)
        } else {
            if left_id != self.selected {
                return false;
            }
            match self.non_empty_pending(left_id) {
                Some(pending) => (Some(pending), self.effective(id)),
                None => return false,
            }
        };

        let (Some(left), Some(right)) = (left, right) else {
            return false;
        };
        let option = &self.option;
        let non_empty_math = |input: &Input| input.is_math_expr() && !input.is_empty();
        let is_space = |input: &Input| input.as_char().is_some_and(CharInput::is_space);

        if is_space(left) || is_space(right) {
            false
        } else if non_empty_math(left) || non_empty_math(right) {
            true
        } else if left.is_math_op() || right.is_math_op() {
            right
                .as_char()
                .and_then(CharInput::math_op)
                .is_none_or(MathOp::is_spaced_operator)
        } else if left.is_latin() {
            !right.is_symbol()
        } else if right.is_latin() {
            !left.is_symbol()
        } else if left.is_text_only_spell(option) {
            !right.is_symbol()
        } else if right.is_text_only_spell(option) {
            !left.is_symbol()
        } else {
            false
        }
    }

    /// Number of gap widths the view reserves before `pos`.
    ///
    /// A math expression still pending on a gap has no leading gap of its
    /// own, so its spaced gap reserves two widths until it is committed.
    pub fn gap_space_width(&self, pos: usize) -> usize {
        if !self.need_gap_space(pos) {
            return 0;
        }
        let editing_math = self
            .id_at(pos)
            .filter(|id| self.is_gap_id(*id))
            .and_then(|id| self.non_empty_pending(id))
            .is_some_and(Input::is_math_expr);
        if editing_math { 2 } else { 1 }
    }

    /// The rendered text, overlays applied.
    pub fn text(&self) -> String {
        self.text_with(&self.option)
    }

    /// The rendered text with explicit hints.
    pub fn text_with(&self, option: &InputOption) -> String {
        let mut text = String::new();
        for (pos, id) in self.order.iter().enumerate() {
            if self.need_gap_space(pos) {
                text.push(' ');
            }
            if let Some(input) = self.effective(*id) {
                text.push_str(&input.text(option));
            }
        }
        text
    }

    // ---- Commit staging ----

    /// Takes the text out of the list and resets it.
    ///
    /// A revocable commit can be restored by [`revoke_commit`](Self::revoke_commit)
    /// until the list is mutated again.
    pub fn commit(&mut self, revocable: bool) -> String {
        self.confirm_pending();
        let text = self.text();
        let snapshot = self.snapshot();
        self.clear();
        if revocable {
            self.staged = Some(Staged::Committed(snapshot));
        }
        text
    }

    /// Whether the last commit can be revoked.
    pub fn can_revoke_commit(&self) -> bool {
        matches!(self.staged, Some(Staged::Committed(_)))
    }

    /// Restores the list as it was before the last revocable commit.
    pub fn revoke_commit(&mut self) -> bool {
        match self.staged.take() {
            Some(Staged::Committed(snapshot)) => {
                *self = *snapshot;
                true
            }
            staged => {
                self.staged = staged;
                false
            }
        }
    }

    /// Clears the list, keeping a snapshot for [`cancel_clean`](Self::cancel_clean).
    pub fn clean(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        let snapshot = self.snapshot();
        self.clear();
        self.staged = Some(Staged::Cleaned(snapshot));
        true
    }

    /// Whether a cleaned list can be restored.
    pub fn can_cancel_clean(&self) -> bool {
        matches!(self.staged, Some(Staged::Cleaned(_)))
    }

    /// Restores the list cleared by the last [`clean`](Self::clean).
    pub fn cancel_clean(&mut self) -> bool {
        match self.staged.take() {
            Some(Staged::Cleaned(snapshot)) => {
                *self = *snapshot;
                true
            }
            staged => {
                self.staged = staged;
                false
            }
        }
    }

    fn snapshot(&mut self) -> Box<InputList> {
        self.staged = None;
        Box::new(self.clone())
    }

    // ---- Candidates and completions ----

    /// The spelling pending on the cursor, for the candidate provider.
    pub fn pending_spelling(&self) -> Option<String> {
        self.non_empty_pending(self.selected)
            .and_then(Input::as_char)
            .filter(|input| !input.keys().is_empty())
            .map(CharInput::spelling)
    }

    /// Resolves the pending spelling to the best of the ranked candidates.
    ///
    /// Returns `false` when nothing is pending or there are no candidates.
    pub fn accept_candidates(&mut self, ranked: impl IntoIterator<Item = String>) -> bool {
        let Some(best) = ranked.into_iter().next() else {
            return false;
        };
        match self.pendings.get_mut(&self.selected).and_then(Input::as_char_mut) {
            Some(input) if !input.keys().is_empty() => {
                input.set_word(Some(best));
                true
            }
            _ => false,
        }
    }

    /// The offered completions.
    pub fn completions(&self) -> &[CompletionInput] {
        &self.completions
    }

    /// Replaces the offered completions.
    pub fn set_completions(&mut self, completions: Vec<CompletionInput>) {
        self.completions = completions;
    }

    /// Withdraws the offered completions.
    pub fn clear_completions(&mut self) -> bool {
        let had = !self.completions.is_empty();
        self.completions.clear();
        had
    }

    /// Inserts the words of the `index`-th completion after the cursor.
    pub fn apply_completion(&mut self, index: usize) -> bool {
        let Some(completion) = self.completions.get(index).cloned() else {
            return false;
        };
        self.confirm_pending();

        let pos = self.selected_position();
        if pos % 2 == 1 {
            self.selected = self.order[pos + 1];
        }
        for word in completion.words {
            let gap_pos = self.selected_position();
            self.insert_at(gap_pos, CharInput::from_word(word).into());
        }
        self.completions.clear();
        true
    }

    // ---- Validation ----

    /// Verifies the structural invariants.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let total = self.order.len();
        if total % 2 == 0 {
            return Err(InvariantViolation::GapAlternation { position: total });
        }
        if self.inputs.len() != total {
            return Err(InvariantViolation::OrphanInputs {
                count: self.inputs.len().saturating_sub(total),
            });
        }

        for (position, id) in self.order.iter().enumerate() {
            let input = self
                .inputs
                .get(*id)
                .ok_or(InvariantViolation::MissingInput { position })?;
            if input.is_gap() != (position % 2 == 0) {
                return Err(InvariantViolation::GapAlternation { position });
            }
            if let Some(partner) = input.pair() {
                self.position_of(partner)
                    .ok_or(InvariantViolation::DanglingPair { position })?;
                if self.inputs.get(partner).and_then(Input::pair) != Some(*id) {
                    return Err(InvariantViolation::AsymmetricPair { position });
                }
            }
            check_nested(input, position)?;
        }

        for (id, pending) in &self.pendings {
            let position = self
                .position_of(*id)
                .ok_or(InvariantViolation::DanglingPending)?;
            if pending.is_gap() {
                return Err(InvariantViolation::PendingGap { position });
            }
            check_nested(pending, position)?;
        }

        if self.position_of(self.selected).is_none() {
            return Err(InvariantViolation::DanglingSelection);
        }
        Ok(())
    }
}

fn check_nested(input: &Input, position: usize) -> Result<(), InvariantViolation> {
    match input.as_math_expr() {
        Some(expr) => expr
            .inner()
            .check_invariants()
            .map_err(|source| InvariantViolation::InMathExpr {
                position,
                source: Box::new(source),
            }),
        None => Ok(()),
    }
}

/// Latin text and decimal numbers of several keys lose one key at a time.
fn is_multi_key_latin(input: &Input) -> bool {
    input.as_char().is_some_and(|input| {
        !input.is_pinyin()
            && input.keys().len() > 1
            && input
                .keys()
                .iter()
                .all(|key| key.is_latin() || key.math_op() == Some(MathOp::Dot))
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{
        input::MathExprInput,
        key::{CharKind, Key, KeyId},
    };

    fn key(text: &str) -> Key {
        let id = KeyId::new(0, 0);
        match text {
            "(" | ")" | "，" => Key::char(id, CharKind::Symbol, text),
            _ if text.chars().all(|ch| ch.is_ascii_digit()) => Key::char(id, CharKind::Number, text),
            _ => Key::alphabet(id, text),
        }
    }

    fn type_key(list: &mut InputList, text: &str) {
        if let Some(input) = list.ensure_pending().as_char_mut() {
            input.append_key(key(text));
        }
    }

    fn chars(text: &str) -> Input {
        CharInput::from_keys(text.split_whitespace().map(key)).into()
    }

    /// Builds a committed list from space separated inputs.
    fn list_of(inputs: &[&str]) -> InputList {
        let mut list = InputList::new();
        for text in inputs {
            let gap = list.len() - 1;
            list.insert_at(gap, chars(text));
        }
        list
    }

    fn op(op: MathOp) -> Input {
        Input::key(Key::math(KeyId::new(0, 0), op))
    }

    #[test]
    fn test_new_list_is_one_selected_gap() {
        let list = InputList::new();

        assert_eq!(list.len(), 1);
        assert!(list.is_gap_selected());
        assert!(list.is_empty());
        assert_eq!(list.check_invariants(), Ok(()));
    }

    #[test]
    fn test_insert_splits_gap() {
        let mut list = InputList::new();

        assert_eq!(list.insert_at(0, chars("a")), Some(1));
        assert_eq!(list.len(), 3);
        assert_eq!(list.selected_position(), 2);
        assert_eq!(list.insert_at(1, chars("b")), None);
        assert_eq!(list.insert_at(0, Input::Gap), None);
        assert_eq!(list.check_invariants(), Ok(()));
    }

    #[test]
    fn test_commit_pending_on_gap_inserts_with_leading_gap() {
        let mut list = InputList::new();
        type_key(&mut list, "a");

        assert_eq!(list.commit_pending(0), Some(1));
        assert_eq!(list.len(), 3);
        assert_eq!(list.selected_position(), 1);
        assert!(list.pending().is_none());
        assert_eq!(list.text(), "a");
    }

    #[test]
    fn test_commit_pending_is_idempotent() {
        let mut list = list_of(&["a"]);

        assert_eq!(list.commit_pending(2), None);
        assert_eq!(list.commit_pending(7), None);

        list.replace_pending(2, Some(CharInput::new().into()));
        assert_eq!(list.commit_pending(2), None);
        assert_eq!(list.len(), 3);
        assert!(list.pending_on(2).is_none());
    }

    #[test]
    fn test_commit_pending_on_content_keeps_pair() {
        let mut list = list_of(&["(", "a", ")"]);
        assert!(list.pair(1, 5));

        list.replace_pending(1, Some(chars("，")));
        assert_eq!(list.commit_pending(1), Some(1));

        assert_eq!(list.pair_of(1), Some(5));
        assert_eq!(list.pair_of(5), Some(1));
        assert_eq!(list.check_invariants(), Ok(()));
    }

    #[test]
    fn test_inputs_enter_unpaired() {
        let mut list = list_of(&["a"]);
        let target = list.id_at(1);

        let mut linked = CharInput::from_key(key("("));
        linked.set_pair(target);
        assert_eq!(list.insert_at(2, linked.clone().into()), Some(3));
        assert_eq!(list.pair_of(3), None);
        assert_eq!(list.check_invariants(), Ok(()));

        assert!(list.replace_pending(4, Some(linked.into())));
        assert_eq!(list.commit_pending(4), Some(5));
        assert_eq!(list.pair_of(5), None);
        assert_eq!(list.pair_of(1), None);
        assert_eq!(list.check_invariants(), Ok(()));
    }

    #[test]
    fn test_replace_pending_rejects_gaps() {
        let mut list = InputList::new();

        assert!(!list.replace_pending(0, Some(Input::Gap)));
        assert!(!list.replace_pending(3, Some(chars("a"))));
        assert!(list.replace_pending(0, Some(chars("a"))));
        assert!(list.replace_pending(0, None));
        assert!(list.pending().is_none());
    }

    #[test]
    fn test_pairing_is_symmetric_and_selects_both() {
        let mut list = list_of(&["(", "x", ")"]);
        assert!(list.pair(1, 5));

        assert_eq!(list.pair_of(1), Some(5));
        assert_eq!(list.pair_of(5), Some(1));

        assert!(list.select(1));
        assert!(list.is_selected(1));
        assert!(list.is_selected(5));
        assert!(!list.is_selected(3));
    }

    #[test]
    fn test_remove_unlinks_partner() {
        let mut list = list_of(&["(", "x", ")"]);
        list.pair(1, 5);

        assert!(list.remove(1));

        assert_eq!(list.len(), 5);
        assert_eq!(list.text(), "x)");
        assert_eq!(list.pair_of(3), None);
        assert_eq!(list.check_invariants(), Ok(()));
        assert!(!list.remove(0));
        assert!(!list.remove(9));
    }

    #[test]
    fn test_remove_moves_cursor_to_following_gap() {
        let mut list = list_of(&["a", "b"]);
        list.select(1);

        assert!(list.remove(1));
        assert_eq!(list.selected_position(), 0);
        assert!(list.is_gap_selected());
    }

    #[test]
    fn test_delete_backward_cascades_to_pair() {
        let mut list = InputList::new();
        assert!(list.insert_pair(CharInput::from_key(key("(")), CharInput::from_key(key(")"))));
        assert_eq!(list.selected_position(), 2);

        assert!(list.delete_backward());

        assert_eq!(list.len(), 1);
        assert!(list.is_empty());
        assert_eq!(list.check_invariants(), Ok(()));
    }

    #[test]
    fn test_delete_backward_steps_through_latin() {
        let mut list = list_of(&["a b c", "d"]);
        list.select_last();

        // "d" is a single key input and goes at once.
        assert!(list.delete_backward());
        assert_eq!(list.text(), "abc");

        // The multi key input is selected first, then shortened.
        assert!(list.delete_backward());
        assert_eq!(list.selected_position(), 1);
        assert!(list.delete_backward());
        assert_eq!(list.text(), "ab");

        list.confirm_pending();
        assert_eq!(list.text(), "ab");
        assert_eq!(list.check_invariants(), Ok(()));
    }

    #[test]
    fn test_insert_pair_wraps_selected_content() {
        let mut list = list_of(&["x"]);
        list.select(1);

        assert!(list.insert_pair(CharInput::from_key(key("(")), CharInput::from_key(key(")"))));

        assert_eq!(list.text(), "(x)");
        assert_eq!(list.pair_of(1), Some(5));
        assert_eq!(list.selected_position(), 6);
    }

    #[test]
    fn test_select_confirms_pending() {
        let mut list = list_of(&["a"]);
        type_key(&mut list, "b");

        assert!(list.select(0));
        assert_eq!(list.len(), 5);
        assert_eq!(list.text(), "a b");
        assert!(!list.select(0));
    }

    #[test]
    fn test_need_gap_space_rules() {
        let list = list_of(&["a b", "，", "1 2"]);

        // latin then symbol
        assert!(!list.need_gap_space(2));
        // symbol then latin
        assert!(!list.need_gap_space(4));
        assert!(!list.need_gap_space(0));
        assert!(!list.need_gap_space(6));

        let list = list_of(&["a", "b"]);
        assert!(list.need_gap_space(2));
        assert_eq!(list.text(), "a b");
    }

    #[test]
    fn test_math_expression_finalization_spacing() {
        let mut list = list_of(&["a b"]);

        let mut expr = MathExprInput::new();
        {
            let inner = expr.inner_mut();
            inner.insert_at(0, chars("1 2"));
            inner.insert_at(2, op(MathOp::Plus));
            inner.insert_at(4, chars("3"));
        }
        assert_eq!(expr.text(&InputOption::default()), "12 + 3");
        list.new_pending(expr.into());

        // Still pending on the trailing gap: two widths before it.
        assert!(list.need_gap_space(2));
        assert_eq!(list.gap_space_width(2), 2);
        assert_eq!(list.len(), 3);

        assert_eq!(list.confirm_pending(), Some(3));

        // Committed with a leading gap of its own.
        assert_eq!(list.len(), 5);
        assert!(list.get_input(2).is_some_and(Input::is_gap));
        assert!(list.get_input(3).is_some_and(Input::is_math_expr));
        assert_eq!(list.gap_space_width(2), 1);
        assert!(!list.need_gap_space(4));
        assert_eq!(list.text(), "ab 12 + 3");
        assert_eq!(list.check_invariants(), Ok(()));
    }

    #[test]
    fn test_math_expression_with_equal_renders_result() {
        let mut expr = MathExprInput::new();
        let inner = expr.inner_mut();
        inner.insert_at(0, chars("1 2"));
        inner.insert_at(2, op(MathOp::Multiply));
        inner.insert_at(4, op(MathOp::LeftBracket));
        inner.insert_at(6, chars("3"));
        inner.insert_at(8, op(MathOp::Plus));
        inner.insert_at(10, chars("2"));
        inner.insert_at(12, op(MathOp::RightBracket));
        inner.pair(5, 13);
        inner.insert_at(14, op(MathOp::Equal));

        assert_eq!(expr.value(), Some(60.0));
        assert!(expr.text(&InputOption::default()).ends_with("= 60"));
    }

    #[test]
    fn test_emptied_math_expression_is_removed_on_confirm() {
        let mut list = InputList::new();
        list.insert_at(0, Input::math_expr());
        list.select(1);

        assert_eq!(list.confirm_pending(), None);
        assert_eq!(list.len(), 1);
        assert!(list.is_gap_selected());
    }

    #[test]
    fn test_commit_and_revoke() {
        let mut list = list_of(&["a", "b"]);

        assert_eq!(list.commit(true), "a b");
        assert!(list.is_empty());
        assert!(list.can_revoke_commit());

        assert!(list.revoke_commit());
        assert_eq!(list.text(), "a b");
        assert!(!list.revoke_commit());

        list.commit(false);
        assert!(!list.can_revoke_commit());
    }

    #[test]
    fn test_mutation_discards_staged_commit() {
        let mut list = list_of(&["a"]);
        list.commit(true);
        list.insert_at(0, chars("b"));

        assert!(!list.revoke_commit());
    }

    #[test]
    fn test_clean_and_cancel() {
        let mut list = list_of(&["a"]);

        assert!(list.clean());
        assert!(list.is_empty());
        assert!(!list.clean());
        assert!(list.cancel_clean());
        assert_eq!(list.text(), "a");
        assert!(!list.cancel_clean());
    }

    #[test]
    fn test_candidates_and_completions() {
        let mut list = InputList::new();
        type_key(&mut list, "n");
        type_key(&mut list, "i");

        assert_eq!(list.pending_spelling().as_deref(), Some("ni"));
        assert!(list.accept_candidates(["你".to_owned(), "泥".to_owned()]));
        list.confirm_pending_and_select_next();
        assert_eq!(list.text(), "你");

        list.set_completions(vec![CompletionInput::new(["好"])]);
        assert!(!list.apply_completion(1));
        assert!(list.apply_completion(0));
        assert_eq!(list.text(), "你好");
        assert!(list.completions().is_empty());
        assert_eq!(list.selected_position(), 4);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(usize, u8),
        Pending(usize, Option<u8>),
        Commit(usize),
        Remove(usize),
        Pair(usize, usize),
        Select(usize),
        DeleteBackward,
        DeleteSelected,
        InsertPair,
        Clean,
        CancelClean,
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..16usize, 0..5u8).prop_map(|(pos, ch)| Op::Insert(pos, ch)),
            (0..16usize, proptest::option::of(0..5u8)).prop_map(|(pos, ch)| Op::Pending(pos, ch)),
            (0..16usize).prop_map(Op::Commit),
            (0..16usize).prop_map(Op::Remove),
            (0..16usize, 0..16usize).prop_map(|(a, b)| Op::Pair(a, b)),
            (0..16usize).prop_map(Op::Select),
            Just(Op::DeleteBackward),
            Just(Op::DeleteSelected),
            Just(Op::InsertPair),
            Just(Op::Clean),
            Just(Op::CancelClean),
        ]
    }

    /// Builds one of a few inputs; the last one claims a link to `linked`.
    fn sample_input(ch: u8, linked: Option<InputId>) -> Input {
        match ch {
            0 => chars("a b"),
            1 => chars("，"),
            2 => chars("7"),
            3 => op(MathOp::Plus),
            _ => {
                let mut input = CharInput::from_key(key("("));
                input.set_pair(linked);
                input.into()
            }
        }
    }

    fn apply(list: &mut InputList, op: Op) {
        let len = list.len();
        let wrap = |pos: usize| pos % len;
        match op {
            Op::Insert(pos, ch) => {
                let linked = list.id_at(1);
                list.insert_at(wrap(pos), sample_input(ch, linked));
            }
            Op::Pending(pos, ch) => {
                let linked = list.id_at(1);
                list.replace_pending(wrap(pos), ch.map(|ch| sample_input(ch, linked)));
            }
            Op::Commit(pos) => {
                list.commit_pending(wrap(pos));
            }
            Op::Remove(pos) => {
                list.remove(wrap(pos));
            }
            Op::Pair(a, b) => {
                list.pair(wrap(a), wrap(b));
            }
            Op::Select(pos) => {
                list.select(wrap(pos));
            }
            Op::DeleteBackward => {
                list.delete_backward();
            }
            Op::DeleteSelected => {
                list.delete_selected();
            }
            Op::InsertPair => {
                list.insert_pair(CharInput::from_key(key("(")), CharInput::from_key(key(")")));
            }
            Op::Clean => {
                list.clean();
            }
            Op::CancelClean => {
                list.cancel_clean();
            }
        }
    }

    proptest! {
        #[test]
        fn invariants_hold_under_random_edits(ops in proptest::collection::vec(arb_op(), 0..64)) {
            let mut list = InputList::new();
            for op in ops {
                apply(&mut list, op.clone());
                prop_assert_eq!(list.check_invariants(), Ok(()), "after {:?}", op);
            }
        }

        #[test]
        fn pairs_stay_mutual(ops in proptest::collection::vec(arb_op(), 0..64)) {
            let mut list = InputList::new();
            for op in ops {
                apply(&mut list, op);
            }
            for pos in 0..list.len() {
                if let Some(partner) = list.pair_of(pos) {
                    prop_assert_eq!(list.pair_of(partner), Some(pos));
                }
            }
        }
    }
}
