//! Key layouts and the source that builds them.
//!
//! A [`KeyLayout`] is the set of keys currently on screen together with their
//! geometry. It answers the hit-testing questions of the gesture classifier
//! and the identity lookups of the dispatcher. Layouts are never patched in
//! place: the session asks its [`KeyLayoutSource`] for a new one whenever the
//! keyboard, its configuration or the candidate list changes.

use crate::{
    config::HandMode,
    key::{Key, KeyId, KeyboardType},
    px::{PxPosition, PxRect},
    xpad::XPadLayout,
};

/// A key placed on the keyboard surface.
///
/// Keys reachable only through the radial pad's outer ring have no bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct LaidKey {
    /// The key itself.
    pub key: Key,
    /// Screen bounds used for hit-testing.
    pub bounds: Option<PxRect>,
}

/// The keys of one keyboard build.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyLayout {
    keyboard: KeyboardType,
    generation: u32,
    keys: Vec<LaidKey>,
    xpad: Option<XPadLayout>,
}

impl KeyLayout {
    /// Creates an empty layout for `keyboard`, stamped with `generation`.
    pub fn new(keyboard: KeyboardType, generation: u32) -> Self {
        Self {
            keyboard,
            generation,
            keys: Vec::new(),
            xpad: None,
        }
    }

    /// Adds a key, allocating its id from this layout.
    ///
    /// # Examples
    ///
    /// ```
    /// use kuaizi_ime::{Key, KeyLayout, KeyboardType};
    /// use kuaizi_ime::px::{Px, PxPosition, PxRect};
    ///
    /// let mut layout = KeyLayout::new(KeyboardType::Latin, 3);
    /// let a = layout.add(
    ///     |id| Key::alphabet(id, "a"),
    ///     Some(PxRect::new(Px(0), Px(0), Px(40), Px(40))),
    /// );
    ///
    /// assert_eq!(a.generation(), 3);
    /// assert_eq!(layout.hit_test(PxPosition::new(Px(5), Px(5))).map(|k| k.id()), Some(a));
    /// ```
    pub fn add(&mut self, build: impl FnOnce(KeyId) -> Key, bounds: Option<PxRect>) -> KeyId {
        let id = KeyId::new(self.generation, self.keys.len() as u32);
        let key = build(id).with_id(id);
        self.keys.push(LaidKey { key, bounds });
        id
    }

    /// Attaches the radial pad geometry and block keys.
    pub fn set_xpad(&mut self, xpad: XPadLayout) {
        self.xpad = Some(xpad);
    }

    /// The keyboard this layout belongs to.
    pub fn keyboard(&self) -> KeyboardType {
        self.keyboard
    }

    /// The build generation stamped into every key id.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// All keys in id order.
    pub fn keys(&self) -> impl Iterator<Item = &LaidKey> {
        self.keys.iter()
    }

    /// Number of keys in the layout.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the layout has no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The radial pad, when this layout has one.
    pub fn xpad(&self) -> Option<&XPadLayout> {
        self.xpad.as_ref()
    }

    /// Finds a key of this layout by id.
    ///
    /// Ids minted by another generation never resolve.
    pub fn find(&self, id: KeyId) -> Option<&Key> {
        if id.generation() != self.generation {
            return None;
        }
        self.keys
            .get(id.index() as usize)
            .map(|laid| &laid.key)
            .filter(|key| key.id() == id)
    }

    /// Finds the first key of the given kind predicate.
    pub fn find_by(&self, predicate: impl Fn(&Key) -> bool) -> Option<&Key> {
        self.keys.iter().map(|laid| &laid.key).find(|key| predicate(key))
    }

    /// The key under `position`, if any.
    ///
    /// Rectangular keys win over the radial pad's center and inner blocks.
    pub fn hit_test(&self, position: PxPosition) -> Option<&Key> {
        let laid = self
            .keys
            .iter()
            .find(|laid| laid.bounds.is_some_and(|bounds| bounds.contains(position)));
        if let Some(laid) = laid {
            return Some(&laid.key);
        }

        self.xpad
            .as_ref()
            .and_then(|xpad| xpad.key_at(position))
            .and_then(|id| self.find(id))
    }

    /// The rectangular key whose center is closest to `position`.
    pub fn nearest(&self, position: PxPosition) -> Option<&Key> {
        self.keys
            .iter()
            .filter_map(|laid| {
                laid.bounds
                    .map(|bounds| (bounds.center().distance_to(position), &laid.key))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, key)| key)
    }
}

/// Everything a [`KeyLayoutSource`] needs to build a layout.
#[derive(Debug, Clone, Copy)]
pub struct LayoutRequest<'a> {
    /// Keyboard to build.
    pub keyboard: KeyboardType,
    /// Generation to stamp into the key ids.
    pub generation: u32,
    /// Which side the control column goes to.
    pub hand_mode: HandMode,
    /// Whether the pinyin keyboard uses the radial pad.
    pub xpad_enabled: bool,
    /// Ranked candidates, for the candidate keyboard.
    pub candidates: &'a [String],
    /// Whether the input list holds anything, to enable commit keys.
    pub has_input: bool,
    /// Whether the last commit can be revoked.
    pub can_revoke: bool,
}

/// Supplies layouts for keyboard types.
pub trait KeyLayoutSource {
    /// Builds the layout described by `request`.
    fn build(&self, request: &LayoutRequest<'_>) -> KeyLayout;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        key::CtrlKind,
        px::Px,
        xpad::{RadialGeometry, XPadLayout},
    };

    fn rect(x: i32, y: i32) -> Option<PxRect> {
        Some(PxRect::new(Px(x), Px(y), Px(40), Px(40)))
    }

    #[test]
    fn test_find_rejects_other_generation() {
        let mut layout = KeyLayout::new(KeyboardType::Latin, 1);
        let id = layout.add(|id| Key::alphabet(id, "a"), rect(0, 0));

        assert!(layout.find(id).is_some());
        assert!(layout.find(KeyId::new(2, id.index())).is_none());
        assert!(layout.find(KeyId::new(1, 9)).is_none());
    }

    #[test]
    fn test_hit_test_and_nearest() {
        let mut layout = KeyLayout::new(KeyboardType::Latin, 1);
        let a = layout.add(|id| Key::alphabet(id, "a"), rect(0, 0));
        let b = layout.add(|id| Key::alphabet(id, "b"), rect(40, 0));
        layout.add(|id| Key::ctrl(id, CtrlKind::Space), None);

        let inside_b = PxPosition::new(Px(45), Px(10));
        let below_a = PxPosition::new(Px(10), Px(90));

        assert_eq!(layout.hit_test(inside_b).map(Key::id), Some(b));
        assert!(layout.hit_test(below_a).is_none());
        assert_eq!(layout.nearest(below_a).map(Key::id), Some(a));
    }

    #[test]
    fn test_hit_test_falls_back_to_xpad() {
        let mut layout = KeyLayout::new(KeyboardType::Pinyin, 4);
        let center = layout.add(|id| Key::ctrl(id, CtrlKind::Backspace), None);

        let geometry = RadialGeometry::new(PxPosition::new(Px(200), Px(200)), 20.0, 60.0, 120.0, 6, 8);
        let mut xpad = XPadLayout::new(geometry);
        xpad.set_center_key(center);
        layout.set_xpad(xpad);

        let at_center = PxPosition::new(Px(205), Px(200));
        assert_eq!(layout.hit_test(at_center).map(Key::id), Some(center));
        assert!(layout.hit_test(PxPosition::new(Px(0), Px(0))).is_none());
    }
}
