//! Animation and sound pause flags shared by every screen of a session.
//!
//! One `Preferences` value is created per session and handed to whoever needs
//! it. Every change is written through to the key-value store immediately.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::db::{KeyValueStore, LogOnError};

pub const ANIMATIONS_PAUSED_KEY: &str = "animations_paused";
pub const SOUND_PAUSED_KEY: &str = "sound_paused";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceFlags {
  pub animations_paused: bool,
  pub sound_paused: bool,
}

pub struct Preferences {
  store: Arc<dyn KeyValueStore>,
  flags: PreferenceFlags,
}

fn read_flag(store: &dyn KeyValueStore, key: &str) -> bool {
  store
    .get(key)
    .log_warn("Failed to read preference")
    .flatten()
    .as_deref()
    == Some("true")
}

fn write_flag(store: &dyn KeyValueStore, key: &str, value: bool) {
  store
    .set(key, if value { "true" } else { "false" })
    .log_warn("Failed to persist preference");
}

impl Preferences {
  /// Load persisted flags. Unreadable values mean "not paused".
  pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
    let flags = PreferenceFlags {
      animations_paused: read_flag(store.as_ref(), ANIMATIONS_PAUSED_KEY),
      sound_paused: read_flag(store.as_ref(), SOUND_PAUSED_KEY),
    };
    Self { store, flags }
  }

  pub fn flags(&self) -> PreferenceFlags {
    self.flags
  }

  pub fn animations_paused(&self) -> bool {
    self.flags.animations_paused
  }

  pub fn sound_paused(&self) -> bool {
    self.flags.sound_paused
  }

  pub fn set_animations_paused(&mut self, paused: bool) {
    self.flags.animations_paused = paused;
    write_flag(self.store.as_ref(), ANIMATIONS_PAUSED_KEY, paused);
  }

  pub fn set_sound_paused(&mut self, paused: bool) {
    self.flags.sound_paused = paused;
    write_flag(self.store.as_ref(), SOUND_PAUSED_KEY, paused);
  }

  pub fn toggle_animations(&mut self) -> bool {
    self.set_animations_paused(!self.flags.animations_paused);
    self.flags.animations_paused
  }

  pub fn toggle_sound(&mut self) -> bool {
    self.set_sound_paused(!self.flags.sound_paused);
    self.flags.sound_paused
  }

  /// Apply a partial update from the UI
  pub fn apply(&mut self, update: PreferenceUpdate) -> PreferenceFlags {
    if let Some(paused) = update.animations_paused {
      self.set_animations_paused(paused);
    }
    if let Some(paused) = update.sound_paused {
      self.set_sound_paused(paused);
    }
    self.flags
  }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PreferenceUpdate {
  pub animations_paused: Option<bool>,
  pub sound_paused: Option<bool>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{FailingStore, MemoryStore, TestEnv};

  #[test]
  fn test_defaults_when_nothing_stored() {
    let prefs = Preferences::load(Arc::new(MemoryStore::default()));
    assert_eq!(prefs.flags(), PreferenceFlags::default());
  }

  #[test]
  fn test_toggles_persist() {
    let store = Arc::new(MemoryStore::default());
    let mut prefs = Preferences::load(store.clone());

    assert!(prefs.toggle_sound());
    assert!(prefs.toggle_animations());
    assert!(!prefs.toggle_animations());

    let reloaded = Preferences::load(store);
    assert!(reloaded.sound_paused());
    assert!(!reloaded.animations_paused());
  }

  #[test]
  fn test_partial_update() {
    let store = Arc::new(MemoryStore::default());
    let mut prefs = Preferences::load(store);
    let flags = prefs.apply(PreferenceUpdate {
      animations_paused: Some(true),
      sound_paused: None,
    });
    assert!(flags.animations_paused);
    assert!(!flags.sound_paused);
  }

  #[test]
  fn test_store_failures_fall_back_to_unpaused() {
    let mut prefs = Preferences::load(Arc::new(FailingStore));
    assert!(!prefs.sound_paused());
    // in-memory state still changes when the write fails
    prefs.set_sound_paused(true);
    assert!(prefs.sound_paused());
  }

  #[test]
  fn test_sqlite_defaults_and_reload() {
    let env = TestEnv::new().unwrap();
    let mut prefs = Preferences::load(Arc::new(env.store()));
    assert_eq!(prefs.flags(), PreferenceFlags::default());

    prefs.set_animations_paused(true);
    let reloaded = Preferences::load(Arc::new(env.store()));
    assert!(reloaded.animations_paused());
    assert!(!reloaded.sound_paused());
  }
}
