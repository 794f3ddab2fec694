//! In-process conversation store keyed by caller.

use datacopilot_core::message::Transcript;
use datacopilot_core::session::SessionId;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Holds each caller's transcript between turns. Nothing survives the process.
#[derive(Default)]
pub struct SessionStore {
    transcripts: RwLock<HashMap<SessionId, Transcript>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored transcript for `id`, or an empty one.
    pub async fn load(&self, id: &SessionId) -> Transcript {
        self.transcripts
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn save(&self, id: &SessionId, transcript: Transcript) {
        self.transcripts.write().await.insert(id.clone(), transcript);
    }

    /// Forget a conversation. Returns whether one was stored.
    pub async fn clear(&self, id: &SessionId) -> bool {
        self.transcripts.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.transcripts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.transcripts.read().await.is_empty()
    }
}
