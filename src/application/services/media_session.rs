use crate::domain::entities::LiveMedia;
use crate::domain::value_objects::AssetKind;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Playback,
    Capture,
}

/// One active playback or capture of a record's asset slot.
#[derive(Debug, Clone)]
pub struct MediaSession {
    pub id: String,
    pub record_id: String,
    pub kind: AssetKind,
    pub slot_index: u32,
    pub mode: SessionMode,
    pub media: Option<LiveMedia>,
    pub started_at: DateTime<Utc>,
}

#[derive(Default)]
struct RegistryState {
    sessions: HashMap<String, MediaSession>,
    focused: Option<String>,
}

/// Registry of live media sessions. At most one session holds focus;
/// starting a new one stops the previously focused session.
#[derive(Default)]
pub struct MediaSessionRegistry {
    state: Mutex<RegistryState>,
}

impl MediaSessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a focused session and returns it together with the session it displaced.
    pub fn start(
        &self,
        record_id: &str,
        kind: AssetKind,
        slot_index: u32,
        mode: SessionMode,
        media: Option<LiveMedia>,
    ) -> (MediaSession, Option<MediaSession>) {
        let session = MediaSession {
            id: uuid::Uuid::new_v4().to_string(),
            record_id: record_id.to_string(),
            kind,
            slot_index,
            mode,
            media,
            started_at: Utc::now(),
        };

        let mut state = self.lock();
        let displaced = state
            .focused
            .take()
            .and_then(|previous| state.sessions.remove(&previous));
        if let Some(previous) = &displaced {
            debug!(session_id = %previous.id, record_id = %previous.record_id, "Session lost focus and stopped");
        }
        state.sessions.insert(session.id.clone(), session.clone());
        state.focused = Some(session.id.clone());
        debug!(session_id = %session.id, record_id, ?mode, "Session started");
        (session, displaced)
    }

    pub fn stop(&self, session_id: &str) -> Option<MediaSession> {
        let mut state = self.lock();
        let stopped = state.sessions.remove(session_id)?;
        if state.focused.as_deref() == Some(session_id) {
            state.focused = None;
        }
        debug!(session_id, "Session stopped");
        Some(stopped)
    }

    /// 削除されたレコードのセッションをまとめて止める
    pub fn stop_for_record(&self, record_id: &str) -> Vec<MediaSession> {
        let mut state = self.lock();
        let ids: Vec<String> = state
            .sessions
            .values()
            .filter(|session| session.record_id == record_id)
            .map(|session| session.id.clone())
            .collect();
        let mut stopped = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(session) = state.sessions.remove(&id) {
                stopped.push(session);
            }
            if state.focused.as_deref() == Some(id.as_str()) {
                state.focused = None;
            }
        }
        stopped
    }

    pub fn focused(&self) -> Option<MediaSession> {
        let state = self.lock();
        state
            .focused
            .as_ref()
            .and_then(|id| state.sessions.get(id))
            .cloned()
    }

    pub fn active_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn starting_a_session_stops_the_focused_one() {
        let registry = MediaSessionRegistry::new();
        let (first, displaced) = registry.start(
            "rec-1",
            AssetKind::Audio,
            0,
            SessionMode::Playback,
            Some(LiveMedia::new(Bytes::from_static(b"aac"))),
        );
        assert!(displaced.is_none());

        let (second, displaced) =
            registry.start("rec-2", AssetKind::Video, 0, SessionMode::Capture, None);
        assert_eq!(displaced.map(|session| session.id), Some(first.id.clone()));
        assert_eq!(registry.active_ids(), vec![second.id.clone()]);
        assert_eq!(registry.focused().map(|session| session.id), Some(second.id));
    }

    #[test]
    fn stop_clears_focus() {
        let registry = MediaSessionRegistry::new();
        let (session, _) = registry.start("rec-1", AssetKind::Audio, 1, SessionMode::Playback, None);
        assert!(registry.stop(&session.id).is_some());
        assert!(registry.stop(&session.id).is_none());
        assert!(registry.focused().is_none());
    }

    #[test]
    fn stop_for_record_only_touches_that_record() {
        let registry = MediaSessionRegistry::new();
        registry.start("rec-1", AssetKind::Audio, 0, SessionMode::Playback, None);
        let stopped = registry.stop_for_record("rec-2");
        assert!(stopped.is_empty());
        let stopped = registry.stop_for_record("rec-1");
        assert_eq!(stopped.len(), 1);
        assert!(registry.active_ids().is_empty());
        assert!(registry.focused().is_none());
    }
}
