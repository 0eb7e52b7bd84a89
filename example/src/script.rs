use std::time::{Duration, Instant};

use kuaizi_ime::{CtrlKind, ImeError, ImeSession, Key, KeyboardType, PointerSample};
use tracing::{info, warn};

const PRESS: Duration = Duration::from_millis(40);
const PAUSE: Duration = Duration::from_millis(400);

/// One scripted user action.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Taps the key of each character in turn.
    Text(&'static str),
    Space,
    Commit,
    Switch(KeyboardType),
}

/// Feeds taps to a session on a simulated clock.
pub struct Player {
    session: ImeSession,
    now: Instant,
}

impl Player {
    pub fn new(session: ImeSession) -> Self {
        Self {
            session,
            now: Instant::now(),
        }
    }

    pub fn session(&mut self) -> &mut ImeSession {
        &mut self.session
    }

    pub fn play(&mut self, steps: &[Step]) -> Result<(), ImeError> {
        for step in steps {
            match *step {
                Step::Text(text) => {
                    for c in text.chars() {
                        let c = c.to_string();
                        self.tap(|key| key.text() == Some(c.as_str()))?;
                    }
                }
                Step::Space => self.tap(|key| key.ctrl_kind() == Some(CtrlKind::Space))?,
                Step::Commit => self.tap(|key| key.ctrl_kind() == Some(CtrlKind::CommitInputList))?,
                Step::Switch(keyboard) => {
                    self.tap(|key| key.ctrl_kind() == Some(CtrlKind::SwitchKeyboard(keyboard)))?
                }
            }
            self.report(step);
        }
        Ok(())
    }

    fn tap(&mut self, predicate: impl Fn(&Key) -> bool) -> Result<(), ImeError> {
        let Some(at) = self.session.key_center(predicate) else {
            warn!(keyboard = ?self.session.keyboard(), "no such key on the layout");
            return Ok(());
        };
        self.session.on_pointer(PointerSample::down(at, self.now))?;
        self.session.on_pointer(PointerSample::up(at, self.now + PRESS))?;
        self.now += PAUSE;
        self.session.on_timer(self.now)
    }

    fn report(&mut self, step: &Step) {
        info!(?step, text = %self.session.input_list().text(), "step played");
        for msg in self.session.take_msgs() {
            info!(?msg);
        }
    }
}
