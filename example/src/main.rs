//! Replays a few scripted gestures against a session and prints what the
//! host would receive.
//!
//! Run with `RUST_LOG=kuaizi_ime=debug` to follow the dispatch.

mod script;

use kuaizi_ime::{
    ConfigKey, Configuration, ImeError, ImeSession, KeyTable, KeyboardType, MemoryPersistence,
    StaticCandidates, logging::init_tracing,
};
use tracing::info;

use crate::script::{Player, Step};

fn dictionary() -> StaticCandidates {
    StaticCandidates::new()
        .with_words("ni", ["你", "泥", "尼"])
        .with_words("hao", ["好", "号", "豪"])
        .with_words("nihao", ["你好"])
        .with_phrase("你好", ["吗", "啊"])
}

fn main() -> Result<(), ImeError> {
    init_tracing();

    let session = ImeSession::new(Configuration::new(), KeyTable::default(), dictionary());
    let mut player = Player::new(session);
    player.session().start(KeyboardType::Pinyin)?;

    player.play(&[
        Step::Text("nihao"),
        Step::Space,
        Step::Commit,
        Step::Switch(KeyboardType::Math),
        Step::Text("12+30="),
        Step::Space,
        Step::Commit,
        Step::Switch(KeyboardType::Latin),
        Step::Text("hi"),
        Step::Space,
    ])?;

    let mut persisted = MemoryPersistence::new();
    persisted.store(ConfigKey::HandMode.name(), "left".into());
    let changed = player.session().bind_persistence(&persisted)?;
    info!(changed, "persisted options applied");

    player.play(&[Step::Text("ok"), Step::Commit])?;

    let session = player.session();
    info!(text = %session.input_list().text(), keyboard = ?session.keyboard(), "done");
    Ok(())
}
