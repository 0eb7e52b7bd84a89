//! Gesture classification.
//!
//! This module turns raw pointer samples into semantic gestures addressed at
//! keys of the current [`KeyLayout`].
//!
//! # Key Features
//!
//! - **Taps**: single taps with a consecutive-tap counter, double taps
//! - **Long presses**: a start event, ticks at a fixed interval, an end event
//! - **Slides**: start/move/stop once the finger leaves the slop radius
//! - **Flips**: short fast slides, reported on release
//! - **Radial pads**: slides over an [`XPadLayout`](crate::XPadLayout) carry
//!   the block difference and may produce extra taps on picked keys
//!
//! Time only advances through sample timestamps and [`GestureClassifier::handle_timer`]
//! calls, so classification is a pure function of the sample sequence. The
//! thresholds live in [`GestureConfig`].
//!
//! # Usage
//!
//! ```
//! use std::time::Instant;
//!
//! use kuaizi_ime::gesture::{GestureClassifier, GestureConfig, GestureKind, PointerSample};
//! use kuaizi_ime::px::{Px, PxPosition, PxRect};
//! use kuaizi_ime::{Key, KeyLayout, KeyboardType};
//!
//! let mut layout = KeyLayout::new(KeyboardType::Latin, 0);
//! let a = layout.add(|id| Key::alphabet(id, "a"), Some(PxRect::new(Px(0), Px(0), Px(40), Px(40))));
//!
//! let mut classifier = GestureClassifier::new(GestureConfig::default());
//! let t0 = Instant::now();
//! let at = PxPosition::new(Px(10), Px(10));
//! classifier.handle_sample(PointerSample::down(at, t0), &layout);
//! classifier.handle_sample(PointerSample::up(at, t0), &layout);
//!
//! let tap = classifier
//!     .take_events()
//!     .into_iter()
//!     .find(|event| matches!(event.kind, GestureKind::SingleTap { .. }));
//! assert_eq!(tap.and_then(|tap| tap.target), Some(a));
//! ```

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use tracing::{trace, warn};

use crate::{
    config::{ConfigKey, Configuration},
    key::KeyId,
    key_layout::KeyLayout,
    motion::Motion,
    px::PxPosition,
    xpad::{XPad, XPadState},
};

/// Maximum number of gesture events kept between two drains.
const KEEP_EVENTS_COUNT: usize = 32;

/// Policy thresholds of the classifier.
///
/// None of these are structural: they tune how a human motion is read and
/// are exposed through [`ConfigKey`] options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    /// Hold time before a press becomes a long press.
    pub long_press_timeout: Duration,
    /// Interval between long press ticks.
    pub long_press_tick_interval: Duration,
    /// Maximum gap between two taps counted as consecutive.
    pub double_tap_timeout: Duration,
    /// Maximum slide duration still reported as a flip.
    pub flip_timeout: Duration,
    /// Distance from the press point before a slide starts, in pixels.
    pub slide_threshold: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            long_press_timeout: Duration::from_millis(200),
            long_press_tick_interval: Duration::from_millis(100),
            double_tap_timeout: Duration::from_millis(300),
            flip_timeout: Duration::from_millis(400),
            slide_threshold: 8.0,
        }
    }
}

impl GestureConfig {
    /// Reads the thresholds from a configuration, using defaults for unset options.
    pub fn from_configuration(config: &Configuration) -> Self {
        Self {
            long_press_timeout: config.millis(ConfigKey::LongPressTimeoutMs),
            long_press_tick_interval: config
                .millis(ConfigKey::LongPressTickIntervalMs)
                .max(Duration::from_millis(1)),
            double_tap_timeout: config.millis(ConfigKey::DoubleTapTimeoutMs),
            flip_timeout: config.millis(ConfigKey::FlipTimeoutMs),
            slide_threshold: config.pixels(ConfigKey::SlideThresholdPx),
        }
    }
}

/// Contact phase of a pointer sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    /// The finger touched the surface.
    Down,
    /// The finger moved while touching.
    Move,
    /// The finger left the surface.
    Up,
    /// The host cancelled the gesture.
    Cancel,
}

/// A raw pointer sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    /// Contact phase.
    pub phase: PointerPhase,
    /// Sample position.
    pub position: PxPosition,
    /// Sample time.
    pub timestamp: Instant,
}

impl PointerSample {
    /// A touch-down sample.
    pub fn down(position: PxPosition, timestamp: Instant) -> Self {
        Self {
            phase: PointerPhase::Down,
            position,
            timestamp,
        }
    }

    /// A move sample.
    pub fn moved(position: PxPosition, timestamp: Instant) -> Self {
        Self {
            phase: PointerPhase::Move,
            position,
            timestamp,
        }
    }

    /// A lift-off sample.
    pub fn up(position: PxPosition, timestamp: Instant) -> Self {
        Self {
            phase: PointerPhase::Up,
            position,
            timestamp,
        }
    }

    /// A cancel sample.
    pub fn cancel(position: PxPosition, timestamp: Instant) -> Self {
        Self {
            phase: PointerPhase::Cancel,
            position,
            timestamp,
        }
    }
}

/// What a gesture event means.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureKind {
    /// The finger touched a key.
    PressStart,
    /// The finger was released.
    PressEnd,
    /// The gesture was cancelled by the platform. Replaces the end events of
    /// a release: nothing the gesture started is confirmed.
    PressCancel,
    /// A tap; `tick` counts the consecutive taps before this one.
    SingleTap {
        /// 0 for a lone tap, 1 for the second tap of a double tap, and so on.
        tick: u32,
    },
    /// The second of two consecutive taps. Follows its [`GestureKind::SingleTap`].
    DoubleTap,
    /// The press has been held past the long press timeout.
    LongPressStart,
    /// Periodic tick while the long press lasts.
    LongPressTick {
        /// 1 for the first tick, incremented each tick.
        tick: u32,
        /// Time elapsed since the long press started.
        duration: Duration,
    },
    /// The long press ended.
    LongPressEnd,
    /// The finger left the slop radius. Positioned at the press point.
    SlideStart,
    /// The finger moved during a slide.
    Slide {
        /// Displacement from the press point.
        motion: Motion,
        /// Cumulative block difference over a radial pad's outer ring.
        block_diff: Option<i32>,
    },
    /// The slide ended.
    SlideStop,
    /// A short fast slide, reported on release. Positioned at the press point.
    Flip {
        /// Displacement from the press point at release.
        motion: Motion,
    },
}

/// A classified gesture addressed at a key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureEvent {
    /// What happened.
    pub kind: GestureKind,
    /// The key the gesture is addressed at, if the finger is over one.
    pub target: Option<KeyId>,
    /// The key closest to the finger, used for slide-to-select.
    pub closed: Option<KeyId>,
    /// Where it happened.
    pub position: PxPosition,
    /// When it happened.
    pub timestamp: Instant,
}

impl GestureEvent {
    /// A lone tap addressed at `key`.
    pub fn tap(key: KeyId, position: PxPosition, timestamp: Instant) -> Self {
        Self {
            kind: GestureKind::SingleTap { tick: 0 },
            target: Some(key),
            closed: Some(key),
            position,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LongPress {
    Waiting,
    Active { tick: u32, next_tick_at: Instant },
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
struct Press {
    anchor: Motion,
    last: Motion,
    target: Option<KeyId>,
    slide_started_at: Option<Instant>,
    long_press: LongPress,
}

impl Press {
    fn is_long_pressing(&self) -> bool {
        matches!(self.long_press, LongPress::Active { .. })
    }

    fn is_sliding(&self) -> bool {
        self.slide_started_at.is_some()
    }
}

/// Classifies pointer samples into [`GestureEvent`]s.
#[derive(Debug, Clone)]
pub struct GestureClassifier {
    config: GestureConfig,
    press: Option<Press>,
    latest_tap: Option<(Instant, u32)>,
    events: VecDeque<GestureEvent>,
    xpad: XPad,
}

impl GestureClassifier {
    /// Creates an idle classifier.
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            press: None,
            latest_tap: None,
            events: VecDeque::new(),
            xpad: XPad::new(),
        }
    }

    /// The thresholds in use.
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Replaces the thresholds. An in-flight gesture keeps running.
    pub fn set_config(&mut self, config: GestureConfig) {
        self.config = config;
    }

    /// Whether a press is in progress.
    pub fn is_pressed(&self) -> bool {
        self.press.is_some()
    }

    /// The anchor of the in-flight press, `None` when idle.
    pub fn anchor(&self) -> Option<&Motion> {
        self.press.as_ref().map(|press| &press.anchor)
    }

    /// Phase of the radial pad.
    pub fn xpad_state(&self) -> &XPadState {
        self.xpad.state()
    }

    /// Forgets any in-flight gesture and the tap history without emitting events.
    pub fn reset(&mut self) {
        self.press = None;
        self.latest_tap = None;
        self.xpad.reset();
    }

    /// Removes and returns all pending gesture events in order.
    pub fn take_events(&mut self) -> Vec<GestureEvent> {
        self.events.drain(..).collect()
    }

    /// Classifies one pointer sample.
    ///
    /// Samples that make no sense in the current state (a move or release
    /// without a press) are ignored.
    pub fn handle_sample(&mut self, sample: PointerSample, layout: &KeyLayout) {
        // Long press deadlines that passed before this sample fire first.
        self.handle_timer(sample.timestamp, layout);

        match sample.phase {
            PointerPhase::Down => self.on_down(sample, layout),
            PointerPhase::Move => self.on_move(sample, layout),
            PointerPhase::Up => self.on_up(sample, layout),
            PointerPhase::Cancel => {
                if self.press.take().is_some() {
                    self.emit(layout, sample.position, sample.timestamp, GestureKind::PressCancel);
                }
            }
        }
    }

    /// Advances the long press timer to `now`.
    pub fn handle_timer(&mut self, now: Instant, layout: &KeyLayout) {
        let Some(mut press) = self.press else {
            return;
        };

        if press.long_press == LongPress::Waiting
            && !press.is_sliding()
            && now.duration_since(press.anchor.timestamp) >= self.config.long_press_timeout
        {
            let started_at = press.anchor.timestamp + self.config.long_press_timeout;
            press.long_press = LongPress::Active {
                tick: 0,
                next_tick_at: started_at + self.config.long_press_tick_interval,
            };
            self.emit(layout, press.last.position, started_at, GestureKind::LongPressStart);
        }

        while let LongPress::Active { tick, next_tick_at } = press.long_press {
            if now < next_tick_at {
                break;
            }
            let tick = tick + 1;
            press.long_press = LongPress::Active {
                tick,
                next_tick_at: next_tick_at + self.config.long_press_tick_interval,
            };
            self.emit(
                layout,
                press.last.position,
                next_tick_at,
                GestureKind::LongPressTick {
                    tick,
                    duration: self.config.long_press_tick_interval * tick,
                },
            );
        }

        self.press = Some(press);
    }

    fn on_down(&mut self, sample: PointerSample, layout: &KeyLayout) {
        if self.press.is_some() {
            // A lost release: close the previous gesture before starting anew.
            warn!("pointer down while a press is in progress, ending it first");
            self.end_gesture(sample, layout);
        }

        let anchor = Motion::anchor(sample.position, sample.timestamp);
        let target = layout.hit_test(sample.position).map(|key| key.id());
        self.press = Some(Press {
            anchor,
            last: anchor,
            target,
            slide_started_at: None,
            long_press: LongPress::Waiting,
        });

        self.emit(layout, sample.position, sample.timestamp, GestureKind::PressStart);
    }

    fn on_move(&mut self, sample: PointerSample, layout: &KeyLayout) {
        let Some(mut press) = self.press else {
            trace!("move without press ignored");
            return;
        };

        let motion = press.anchor.to(sample.position, sample.timestamp);
        press.last = motion;

        if !press.is_sliding() {
            if motion.distance < self.config.slide_threshold {
                self.press = Some(press);
                return;
            }

            press.slide_started_at = Some(sample.timestamp);
            if press.long_press == LongPress::Waiting {
                press.long_press = LongPress::Cancelled;
            }
            self.press = Some(press);

            let start = GestureEvent {
                kind: GestureKind::SlideStart,
                target: press.target,
                closed: press.target,
                position: press.anchor.position,
                timestamp: sample.timestamp,
            };
            self.push_event(layout, start);
        } else {
            self.press = Some(press);
        }

        self.emit(
            layout,
            sample.position,
            sample.timestamp,
            GestureKind::Slide {
                motion,
                block_diff: None,
            },
        );
    }

    fn on_up(&mut self, sample: PointerSample, layout: &KeyLayout) {
        let Some(press) = self.press else {
            trace!("release without press ignored");
            return;
        };

        if !press.is_long_pressing() && !press.is_sliding() {
            self.on_single_tap(sample, layout);
        } else if let (false, Some(slide_started_at)) =
            (press.is_long_pressing(), press.slide_started_at)
        {
            let motion = press.anchor.to(sample.position, sample.timestamp);
            let elapsed = sample.timestamp.duration_since(slide_started_at);
            if elapsed < self.config.flip_timeout && motion.is_moved() {
                let flip = GestureEvent {
                    kind: GestureKind::Flip { motion },
                    target: press.target,
                    closed: press.target,
                    position: press.anchor.position,
                    timestamp: sample.timestamp,
                };
                self.push_event(layout, flip);
            }
        }

        self.end_gesture(sample, layout);
    }

    fn on_single_tap(&mut self, sample: PointerSample, layout: &KeyLayout) {
        let tick = match self.latest_tap {
            Some((at, tick))
                if sample.timestamp.duration_since(at) < self.config.double_tap_timeout =>
            {
                tick + 1
            }
            _ => 0,
        };
        self.latest_tap = Some((sample.timestamp, tick));

        self.emit(layout, sample.position, sample.timestamp, GestureKind::SingleTap { tick });
        if tick == 1 {
            self.emit(layout, sample.position, sample.timestamp, GestureKind::DoubleTap);
        }
    }

    fn end_gesture(&mut self, sample: PointerSample, layout: &KeyLayout) {
        let Some(press) = self.press.take() else {
            return;
        };

        if press.is_long_pressing() {
            self.emit(layout, sample.position, sample.timestamp, GestureKind::LongPressEnd);
        }
        if press.is_sliding() {
            self.emit(layout, sample.position, sample.timestamp, GestureKind::SlideStop);
        }
        self.emit(layout, sample.position, sample.timestamp, GestureKind::PressEnd);
    }

    fn emit(&mut self, layout: &KeyLayout, position: PxPosition, timestamp: Instant, kind: GestureKind) {
        let event = GestureEvent {
            kind,
            target: layout.hit_test(position).map(|key| key.id()),
            closed: layout.nearest(position).map(|key| key.id()),
            position,
            timestamp,
        };
        self.push_event(layout, event);
    }

    fn push_event(&mut self, layout: &KeyLayout, mut event: GestureEvent) {
        let extra = layout
            .xpad()
            .and_then(|xpad| self.xpad.observe(xpad, &mut event));

        self.enqueue(event);
        if let Some(extra) = extra {
            self.enqueue(extra);
        }
    }

    fn enqueue(&mut self, event: GestureEvent) {
        self.events.push_back(event);
        if self.events.len() > KEEP_EVENTS_COUNT {
            warn!("gesture event queue overflow, dropping the oldest event");
            self.events.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        key::{CtrlKind, Key},
        motion::Direction,
        px::{Px, PxRect},
        xpad::{RadialGeometry, XPadLayout},
    };

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn pos(x: i32, y: i32) -> PxPosition {
        PxPosition::new(Px(x), Px(y))
    }

    /// Two keys side by side: `a` at x 0..40, `b` at x 40..80.
    fn layout() -> (KeyLayout, KeyId, KeyId) {
        let mut layout = KeyLayout::new(crate::KeyboardType::Latin, 1);
        let a = layout.add(
            |id| Key::alphabet(id, "a"),
            Some(PxRect::new(Px(0), Px(0), Px(40), Px(40))),
        );
        let b = layout.add(
            |id| Key::alphabet(id, "b"),
            Some(PxRect::new(Px(40), Px(0), Px(40), Px(40))),
        );
        (layout, a, b)
    }

    fn kinds(events: &[GestureEvent]) -> Vec<GestureKind> {
        events.iter().map(|event| event.kind).collect()
    }

    #[test]
    fn test_single_tap() {
        let (layout, a, _) = layout();
        let mut classifier = GestureClassifier::new(GestureConfig::default());
        let t0 = Instant::now();

        classifier.handle_sample(PointerSample::down(pos(10, 10), t0), &layout);
        classifier.handle_sample(PointerSample::up(pos(11, 10), t0 + ms(50)), &layout);
        let events = classifier.take_events();

        assert_eq!(
            kinds(&events),
            vec![
                GestureKind::PressStart,
                GestureKind::SingleTap { tick: 0 },
                GestureKind::PressEnd
            ]
        );
        assert!(events.iter().all(|event| event.target == Some(a)));
        assert!(!classifier.is_pressed());
        assert!(classifier.anchor().is_none());
    }

    #[test]
    fn test_double_tap_counts_ticks() {
        let (layout, _, _) = layout();
        let mut classifier = GestureClassifier::new(GestureConfig::default());
        let t0 = Instant::now();

        for i in 0..3 {
            let t = t0 + ms(i * 150);
            classifier.handle_sample(PointerSample::down(pos(10, 10), t), &layout);
            classifier.handle_sample(PointerSample::up(pos(10, 10), t + ms(30)), &layout);
        }
        let taps: Vec<GestureKind> = kinds(&classifier.take_events())
            .into_iter()
            .filter(|kind| !matches!(kind, GestureKind::PressStart | GestureKind::PressEnd))
            .collect();

        assert_eq!(
            taps,
            vec![
                GestureKind::SingleTap { tick: 0 },
                GestureKind::SingleTap { tick: 1 },
                GestureKind::DoubleTap,
                GestureKind::SingleTap { tick: 2 },
            ]
        );
    }

    #[test]
    fn test_slow_taps_do_not_chain() {
        let (layout, _, _) = layout();
        let mut classifier = GestureClassifier::new(GestureConfig::default());
        let t0 = Instant::now();

        classifier.handle_sample(PointerSample::down(pos(10, 10), t0), &layout);
        classifier.handle_sample(PointerSample::up(pos(10, 10), t0 + ms(20)), &layout);
        classifier.handle_sample(PointerSample::down(pos(10, 10), t0 + ms(500)), &layout);
        classifier.handle_sample(PointerSample::up(pos(10, 10), t0 + ms(520)), &layout);

        let ticks: Vec<u32> = classifier
            .take_events()
            .iter()
            .filter_map(|event| match event.kind {
                GestureKind::SingleTap { tick } => Some(tick),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, vec![0, 0]);
    }

    #[test]
    fn test_long_press_ticks() {
        let (layout, a, _) = layout();
        let mut classifier = GestureClassifier::new(GestureConfig::default());
        let t0 = Instant::now();

        classifier.handle_sample(PointerSample::down(pos(10, 10), t0), &layout);
        classifier.handle_timer(t0 + ms(150), &layout);
        assert_eq!(kinds(&classifier.take_events()), vec![GestureKind::PressStart]);

        classifier.handle_timer(t0 + ms(420), &layout);
        let events = classifier.take_events();
        assert_eq!(
            kinds(&events),
            vec![
                GestureKind::LongPressStart,
                GestureKind::LongPressTick {
                    tick: 1,
                    duration: ms(100)
                },
                GestureKind::LongPressTick {
                    tick: 2,
                    duration: ms(200)
                },
            ]
        );
        assert!(events.iter().all(|event| event.target == Some(a)));

        classifier.handle_sample(PointerSample::up(pos(10, 10), t0 + ms(450)), &layout);
        assert_eq!(
            kinds(&classifier.take_events()),
            vec![GestureKind::LongPressEnd, GestureKind::PressEnd]
        );
    }

    #[test]
    fn test_release_after_timeout_is_not_a_tap() {
        let (layout, _, _) = layout();
        let mut classifier = GestureClassifier::new(GestureConfig::default());
        let t0 = Instant::now();

        // No timer calls in between: the release itself advances time.
        classifier.handle_sample(PointerSample::down(pos(10, 10), t0), &layout);
        classifier.handle_sample(PointerSample::up(pos(10, 10), t0 + ms(250)), &layout);

        assert_eq!(
            kinds(&classifier.take_events()),
            vec![
                GestureKind::PressStart,
                GestureKind::LongPressStart,
                GestureKind::LongPressEnd,
                GestureKind::PressEnd
            ]
        );
    }

    #[test]
    fn test_small_jitter_stays_a_tap() {
        let (layout, _, _) = layout();
        let mut classifier = GestureClassifier::new(GestureConfig::default());
        let t0 = Instant::now();

        classifier.handle_sample(PointerSample::down(pos(10, 10), t0), &layout);
        classifier.handle_sample(PointerSample::moved(pos(13, 12), t0 + ms(20)), &layout);
        classifier.handle_sample(PointerSample::up(pos(13, 12), t0 + ms(40)), &layout);

        assert!(
            kinds(&classifier.take_events()).contains(&GestureKind::SingleTap { tick: 0 })
        );
    }

    #[test]
    fn test_slow_slide_across_keys() {
        let (layout, a, b) = layout();
        let mut classifier = GestureClassifier::new(GestureConfig::default());
        let t0 = Instant::now();

        classifier.handle_sample(PointerSample::down(pos(10, 10), t0), &layout);
        classifier.handle_sample(PointerSample::moved(pos(30, 10), t0 + ms(100)), &layout);
        classifier.handle_sample(PointerSample::moved(pos(60, 10), t0 + ms(300)), &layout);
        classifier.handle_sample(PointerSample::up(pos(60, 10), t0 + ms(700)), &layout);
        let events = classifier.take_events();

        let kinds: Vec<&'static str> = events
            .iter()
            .map(|event| match event.kind {
                GestureKind::PressStart => "press",
                GestureKind::SlideStart => "start",
                GestureKind::Slide { .. } => "slide",
                GestureKind::SlideStop => "stop",
                GestureKind::PressEnd => "end",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["press", "start", "slide", "slide", "stop", "end"]);

        assert_eq!(events[1].target, Some(a));
        assert_eq!(events[1].position, pos(10, 10));
        assert_eq!(events[3].target, Some(b));
        match events[3].kind {
            GestureKind::Slide { motion, block_diff } => {
                assert_eq!(motion.direction, Direction::Right);
                assert_eq!(motion.distance, 50.0);
                assert_eq!(block_diff, None);
            }
            kind => panic!("unexpected {kind:?}"),
        }
    }

    #[test]
    fn test_quick_slide_is_a_flip() {
        let (layout, a, _) = layout();
        let mut classifier = GestureClassifier::new(GestureConfig::default());
        let t0 = Instant::now();

        classifier.handle_sample(PointerSample::down(pos(10, 30), t0), &layout);
        classifier.handle_sample(PointerSample::moved(pos(10, 5), t0 + ms(40)), &layout);
        classifier.handle_sample(PointerSample::up(pos(10, 0), t0 + ms(80)), &layout);

        let flip = classifier
            .take_events()
            .into_iter()
            .find(|event| matches!(event.kind, GestureKind::Flip { .. }));
        let flip = flip.map(|flip| (flip.target, flip.kind));

        match flip {
            Some((target, GestureKind::Flip { motion })) => {
                assert_eq!(target, Some(a));
                assert_eq!(motion.direction, Direction::Up);
            }
            other => panic!("expected a flip, got {other:?}"),
        }
    }

    #[test]
    fn test_slide_cancels_pending_long_press() {
        let (layout, _, _) = layout();
        let mut classifier = GestureClassifier::new(GestureConfig::default());
        let t0 = Instant::now();

        classifier.handle_sample(PointerSample::down(pos(10, 10), t0), &layout);
        classifier.handle_sample(PointerSample::moved(pos(50, 10), t0 + ms(100)), &layout);
        classifier.handle_timer(t0 + ms(600), &layout);

        assert!(
            !kinds(&classifier.take_events())
                .iter()
                .any(|kind| matches!(kind, GestureKind::LongPressStart | GestureKind::LongPressTick { .. }))
        );
    }

    #[test]
    fn test_long_press_keeps_ticking_while_sliding() {
        let (layout, _, _) = layout();
        let mut classifier = GestureClassifier::new(GestureConfig::default());
        let t0 = Instant::now();

        classifier.handle_sample(PointerSample::down(pos(10, 10), t0), &layout);
        classifier.handle_timer(t0 + ms(210), &layout);
        classifier.handle_sample(PointerSample::moved(pos(50, 10), t0 + ms(250)), &layout);
        classifier.handle_sample(PointerSample::up(pos(50, 10), t0 + ms(320)), &layout);

        let kinds = kinds(&classifier.take_events());
        assert!(kinds.contains(&GestureKind::LongPressTick {
            tick: 1,
            duration: ms(100)
        }));
        assert!(!kinds.iter().any(|kind| matches!(kind, GestureKind::Flip { .. })));
        assert!(kinds.contains(&GestureKind::LongPressEnd));
        assert!(kinds.contains(&GestureKind::SlideStop));
    }

    #[test]
    fn test_malformed_samples_are_ignored() {
        let (layout, _, _) = layout();
        let mut classifier = GestureClassifier::new(GestureConfig::default());
        let t0 = Instant::now();

        classifier.handle_sample(PointerSample::moved(pos(10, 10), t0), &layout);
        classifier.handle_sample(PointerSample::up(pos(10, 10), t0), &layout);
        classifier.handle_sample(PointerSample::cancel(pos(10, 10), t0), &layout);
        classifier.handle_timer(t0 + ms(1000), &layout);

        assert!(classifier.take_events().is_empty());
    }

    #[test]
    fn test_cancel_ends_without_tap_or_flip() {
        let (layout, _, _) = layout();
        let mut classifier = GestureClassifier::new(GestureConfig::default());
        let t0 = Instant::now();

        classifier.handle_sample(PointerSample::down(pos(10, 10), t0), &layout);
        classifier.handle_sample(PointerSample::moved(pos(50, 10), t0 + ms(20)), &layout);
        classifier.handle_sample(PointerSample::cancel(pos(50, 10), t0 + ms(40)), &layout);
        let kinds = kinds(&classifier.take_events());

        assert_eq!(kinds.last(), Some(&GestureKind::PressCancel));
        assert!(!kinds.iter().any(|kind| matches!(
            kind,
            GestureKind::Flip { .. }
                | GestureKind::SingleTap { .. }
                | GestureKind::SlideStop
                | GestureKind::PressEnd
        )));
        assert!(!classifier.is_pressed());
    }

    #[test]
    fn test_thresholds_come_from_configuration() {
        let config = Configuration::new();
        config.set(ConfigKey::LongPressTimeoutMs, 500_i64);
        config.set(ConfigKey::SlideThresholdPx, 20_i64);
        let gesture = GestureConfig::from_configuration(&config);

        assert_eq!(gesture.long_press_timeout, ms(500));
        assert_eq!(gesture.long_press_tick_interval, ms(100));
        assert_eq!(gesture.slide_threshold, 20.0);
    }

    #[test]
    fn test_radial_slide_carries_block_diff() {
        let center = pos(300, 300);
        let mut layout = KeyLayout::new(crate::KeyboardType::Pinyin, 2);
        let group = layout.add(|id| Key::ctrl(id, CtrlKind::SwitchHandMode), None);
        let picked = layout.add(|id| Key::alphabet(id, "z"), None);
        let mut xpad = XPadLayout::new(RadialGeometry::new(center, 30.0, 100.0, 200.0, 6, 8));
        xpad.set_inner_key(0, group);
        xpad.push_outer_key(0, 1, picked);
        layout.set_xpad(xpad);

        let mut classifier = GestureClassifier::new(GestureConfig::default());
        let t0 = Instant::now();
        // Inner block 0 sits just above the positive x-axis.
        classifier.handle_sample(PointerSample::down(pos(360, 290), t0), &layout);
        // Outer block 0, then outer block 1.
        classifier.handle_sample(PointerSample::moved(pos(450, 270), t0 + ms(30)), &layout);
        classifier.handle_sample(PointerSample::moved(pos(390, 190), t0 + ms(60)), &layout);
        // Back to the inner ring.
        classifier.handle_sample(PointerSample::moved(pos(340, 260), t0 + ms(90)), &layout);
        let events = classifier.take_events();

        let diffs: Vec<Option<i32>> = events
            .iter()
            .filter_map(|event| match event.kind {
                GestureKind::Slide { block_diff, .. } => Some(block_diff),
                _ => None,
            })
            .collect();
        assert_eq!(diffs, vec![Some(0), Some(1), None]);

        let taps: Vec<Option<KeyId>> = events
            .iter()
            .filter(|event| matches!(event.kind, GestureKind::SingleTap { .. }))
            .map(|event| event.target)
            .collect();
        assert_eq!(taps, vec![Some(group), Some(picked)]);
    }
}
