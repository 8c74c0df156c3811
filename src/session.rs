// src/session.rs
use crate::db::Error as DbError;
use crate::kv::{KeyValueStore, HAS_COMPLETED_DATA_KEY, HAS_LAUNCHED_KEY};
use tracing::{info, warn};

const FLAG_SET: &str = "true";

/// First screen to show when the app starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryScreen {
    /// Very first launch.
    Onboarding,
    /// Launched before, but the initial plan was never completed.
    EmptyData,
    Main,
}

#[must_use]
pub const fn decide_entry_screen(
    has_launched_before: bool,
    has_completed_initial_data: bool,
) -> EntryScreen {
    match (has_launched_before, has_completed_initial_data) {
        (false, _) => EntryScreen::Onboarding,
        (true, false) => EntryScreen::EmptyData,
        (true, true) => EntryScreen::Main,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionFlags {
    pub has_launched: bool,
    pub has_completed_data: bool,
}

impl SessionFlags {
    /// Reads both flags. A flag that cannot be read counts as unset, so a
    /// broken flag store lands the user on the first-launch path.
    pub fn load<S: KeyValueStore>(kv: &S) -> Self {
        Self {
            has_launched: read_flag(kv, HAS_LAUNCHED_KEY),
            has_completed_data: read_flag(kv, HAS_COMPLETED_DATA_KEY),
        }
    }

    #[must_use]
    pub const fn entry_screen(self) -> EntryScreen {
        decide_entry_screen(self.has_launched, self.has_completed_data)
    }
}

fn read_flag<S: KeyValueStore>(kv: &S, key: &str) -> bool {
    match kv.get(key) {
        Ok(value) => value.as_deref() == Some(FLAG_SET),
        Err(e) => {
            warn!(key, "Could not read session flag, treating as unset: {e}");
            false
        }
    }
}

/// Decides the entry screen and records that the app has been launched.
/// # Errors
/// Returns `DbError` if the launch flag cannot be written.
pub fn begin_session<S: KeyValueStore>(kv: &mut S) -> Result<EntryScreen, DbError> {
    let flags = SessionFlags::load(kv);
    if !flags.has_launched {
        kv.set(HAS_LAUNCHED_KEY, FLAG_SET)?;
        info!("First launch recorded");
    }
    Ok(flags.entry_screen())
}

/// # Errors
/// Returns `DbError` if the flag cannot be written.
pub fn mark_data_completed<S: KeyValueStore>(kv: &mut S) -> Result<(), DbError> {
    kv.set(HAS_COMPLETED_DATA_KEY, FLAG_SET)
}

/// # Errors
/// Returns `DbError` if the flag cannot be removed.
pub fn reset_data_completed<S: KeyValueStore>(kv: &mut S) -> Result<(), DbError> {
    kv.remove(HAS_COMPLETED_DATA_KEY)
}
