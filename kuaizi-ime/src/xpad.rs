//! The radial input pad ("XPad").
//!
//! # Overview
//!
//! The pad is three concentric zones around a hub:
//!
//! - the center, holding one key;
//! - the inner ring of blocks, each holding a key that opens a group;
//! - the outer ring of `N` blocks, each holding two short key lists, one for
//!   each rotational sense.
//!
//! A press starts in the inner ring. Sliding out into the outer ring and then
//! around it picks a key by how many blocks the finger travelled
//! ([`BlockTracker`]); sliding back into the inner ring confirms the pick.
//!
//! ## State machine
//!
//! ```text
//! Init --slide starts on an inner block--> InputWaiting
//! InputWaiting --enters outer ring--> InputDoing (fresh tracker)
//! InputDoing --moves in outer ring--> InputDoing (tracker updated)
//! InputDoing --back in inner ring--> InputWaiting (pick confirmed, tracker dropped)
//! any --press ends--> Init
//! ```

use std::f64::consts::TAU;

use smallvec::SmallVec;

use crate::{
    block_tracker::BlockTracker,
    gesture::{GestureEvent, GestureKind},
    key::KeyId,
    px::PxPosition,
};

/// Geometry of the radial pad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialGeometry {
    center: PxPosition,
    center_radius: f32,
    inner_radius: f32,
    outer_radius: f32,
    inner_blocks: usize,
    outer_blocks: usize,
}

/// Where a position falls on the pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XPadZone {
    /// Inside the hub.
    Center,
    /// An inner ring block.
    Inner(usize),
    /// An outer ring block.
    Outer(usize),
    /// Beyond the outer ring.
    Outside,
}

impl RadialGeometry {
    /// Creates a pad centered at `center`.
    ///
    /// Radii are the outer edges of the hub, the inner ring and the outer
    /// ring; block counts must be non-zero.
    pub fn new(
        center: PxPosition,
        center_radius: f32,
        inner_radius: f32,
        outer_radius: f32,
        inner_blocks: usize,
        outer_blocks: usize,
    ) -> Self {
        Self {
            center,
            center_radius,
            inner_radius,
            outer_radius,
            inner_blocks: inner_blocks.max(1),
            outer_blocks: outer_blocks.max(1),
        }
    }

    /// Number of blocks on the outer ring.
    pub fn outer_blocks(&self) -> usize {
        self.outer_blocks
    }

    /// Number of blocks on the inner ring.
    pub fn inner_blocks(&self) -> usize {
        self.inner_blocks
    }

    /// Locates a position on the pad.
    ///
    /// Blocks are numbered counter-clockwise starting at the positive x-axis.
    pub fn locate(&self, position: PxPosition) -> XPadZone {
        let distance = self.center.distance_to(position);
        if distance < self.center_radius {
            XPadZone::Center
        } else if distance < self.inner_radius {
            XPadZone::Inner(self.sector(position, self.inner_blocks))
        } else if distance < self.outer_radius {
            XPadZone::Outer(self.sector(position, self.outer_blocks))
        } else {
            XPadZone::Outside
        }
    }

    fn sector(&self, position: PxPosition, blocks: usize) -> usize {
        let dx = (position.x.0 - self.center.x.0) as f64;
        // Screen y grows downward.
        let dy = (self.center.y.0 - position.y.0) as f64;
        let angle = dy.atan2(dx).rem_euclid(TAU);
        let block = (angle / (TAU / blocks as f64)) as usize;
        block.min(blocks - 1)
    }
}

/// Keys assigned to the blocks of the pad.
#[derive(Debug, Clone, PartialEq)]
pub struct XPadLayout {
    geometry: RadialGeometry,
    center_key: Option<KeyId>,
    inner_keys: Vec<Option<KeyId>>,
    outer_keys: Vec<[SmallVec<[KeyId; 4]>; 2]>,
}

impl XPadLayout {
    /// Creates a pad without keys.
    pub fn new(geometry: RadialGeometry) -> Self {
        Self {
            geometry,
            center_key: None,
            inner_keys: vec![None; geometry.inner_blocks],
            outer_keys: vec![Default::default(); geometry.outer_blocks],
        }
    }

    /// The pad geometry.
    pub fn geometry(&self) -> &RadialGeometry {
        &self.geometry
    }

    /// Places a key in the hub.
    pub fn set_center_key(&mut self, key: KeyId) {
        self.center_key = Some(key);
    }

    /// Places a key on an inner block. Out-of-range blocks are ignored.
    pub fn set_inner_key(&mut self, block: usize, key: KeyId) {
        if let Some(slot) = self.inner_keys.get_mut(block) {
            *slot = Some(key);
        }
    }

    /// Appends a key to one side of an outer block.
    ///
    /// Side 1 is picked by counter-clockwise travel, side 0 by clockwise
    /// travel.
    pub fn push_outer_key(&mut self, block: usize, side: usize, key: KeyId) {
        if let Some(keys) = self
            .outer_keys
            .get_mut(block)
            .and_then(|sides| sides.get_mut(side))
        {
            keys.push(key);
        }
    }

    /// The center or inner-block key under `position`.
    pub fn key_at(&self, position: PxPosition) -> Option<KeyId> {
        match self.geometry.locate(position) {
            XPadZone::Center => self.center_key,
            XPadZone::Inner(block) => self.inner_key(block),
            XPadZone::Outer(_) | XPadZone::Outside => None,
        }
    }

    /// The key on an inner block.
    pub fn inner_key(&self, block: usize) -> Option<KeyId> {
        self.inner_keys.get(block).copied().flatten()
    }

    /// Resolves the outer key picked by travelling `diff` blocks from
    /// `start_block`.
    ///
    /// The sign of `diff` selects the side, its magnitude the key; travelling
    /// further than the side holds wraps around its keys. No travel picks
    /// nothing.
    pub fn outer_key(&self, start_block: usize, diff: i32) -> Option<KeyId> {
        if diff == 0 {
            return None;
        }
        let sides = self.outer_keys.get(start_block)?;
        let keys = &sides[if diff > 0 { 1 } else { 0 }];
        if keys.is_empty() {
            return None;
        }
        let index = (diff.unsigned_abs() as usize - 1) % keys.len();
        keys.get(index).copied()
    }
}

/// Interaction phase of the pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XPadState {
    /// No press in progress on the pad.
    #[default]
    Init,
    /// A slide started on an inner block and has not reached the outer ring.
    InputWaiting {
        /// Key of the inner block the slide is on.
        key: Option<KeyId>,
    },
    /// The finger travels the outer ring.
    InputDoing {
        /// Key of the inner block the slide came from.
        key: Option<KeyId>,
        /// Block travel since entering the outer ring.
        tracker: BlockTracker,
    },
}

/// Drives [`XPadState`] from gesture events.
#[derive(Debug, Clone, Default)]
pub struct XPad {
    state: XPadState,
}

impl XPad {
    /// Creates a pad in [`XPadState::Init`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn state(&self) -> &XPadState {
        &self.state
    }

    /// Drops any in-flight interaction.
    pub fn reset(&mut self) {
        self.state = XPadState::Init;
    }

    /// The outer key that releasing back into the inner ring would pick now.
    pub fn active_key(&self, layout: &XPadLayout) -> Option<KeyId> {
        match &self.state {
            XPadState::InputDoing { tracker, .. } => tracker
                .start_block()
                .and_then(|start| layout.outer_key(start, tracker.diff())),
            _ => None,
        }
    }

    /// Advances the state machine with a classified gesture.
    ///
    /// Slide events over the outer ring are annotated with the cumulative
    /// block difference. Returns an extra tap event when the pad selects a
    /// key: the inner block key when a slide starts on it, and the picked
    /// outer key when the finger comes back to the inner ring.
    pub fn observe(&mut self, layout: &XPadLayout, event: &mut GestureEvent) -> Option<GestureEvent> {
        let zone = layout.geometry.locate(event.position);
        let (position, timestamp) = (event.position, event.timestamp);

        match &mut event.kind {
            GestureKind::SlideStart => {
                let XPadZone::Inner(block) = zone else {
                    return None;
                };
                let key = layout.inner_key(block);
                self.state = XPadState::InputWaiting { key };
                key.map(|key| GestureEvent::tap(key, position, timestamp))
            }
            GestureKind::Slide { block_diff, .. } => match (zone, self.state) {
                (XPadZone::Outer(block), XPadState::InputWaiting { key }) => {
                    let mut tracker = BlockTracker::new(layout.geometry.outer_blocks);
                    tracker.update(block);
                    *block_diff = Some(tracker.diff());
                    self.state = XPadState::InputDoing { key, tracker };
                    None
                }
                (XPadZone::Outer(block), XPadState::InputDoing { key, mut tracker }) => {
                    tracker.update(block);
                    *block_diff = Some(tracker.diff());
                    self.state = XPadState::InputDoing { key, tracker };
                    None
                }
                (XPadZone::Inner(block), XPadState::InputDoing { .. }) => {
                    let picked = self.active_key(layout);
                    self.state = XPadState::InputWaiting {
                        key: layout.inner_key(block),
                    };
                    picked.map(|key| GestureEvent::tap(key, position, timestamp))
                }
                _ => None,
            },
            GestureKind::PressEnd | GestureKind::PressCancel => {
                self.state = XPadState::Init;
                None
            }
            _ => None,
        }
    }
}
