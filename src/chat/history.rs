//! Per-session conversation history

use crate::config::ChatConfig;
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Session key used when a request names neither a session nor a token
pub const ANONYMOUS_SESSION: &str = "anonymous";

/// Resolve the history key: explicit session id, else the token, else anonymous
pub fn session_key(session_id: Option<&str>, token: Option<&str>) -> String {
    session_id
        .filter(|s| !s.trim().is_empty())
        .or_else(|| token.filter(|t| !t.trim().is_empty()))
        .unwrap_or(ANONYMOUS_SESSION)
        .to_string()
}

/// Bounded `User:` / `AI:` line history, one ring buffer per session.
///
/// Sessions are kept in least-recently-written order; past `max_sessions`
/// the stalest one is dropped. Cloning shares the underlying store.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    sessions: Arc<RwLock<IndexMap<String, VecDeque<String>>>>,
    max_lines: usize,
    max_sessions: usize,
}

impl ConversationStore {
    pub fn new(max_lines: usize, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(IndexMap::new())),
            max_lines,
            max_sessions,
        }
    }

    /// `history_turns` exchanges per session, two lines each
    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(config.history_turns * 2, config.max_sessions)
    }

    /// History lines for a session, oldest first
    pub async fn history(&self, session: &str) -> Vec<String> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session)
            .map(|lines| lines.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Append one question/answer exchange, evicting the oldest lines past the bound
    pub async fn record_exchange(&self, session: &str, question: &str, answer: &str) {
        let mut sessions = self.sessions.write().await;
        let mut lines = sessions.shift_remove(session).unwrap_or_default();
        lines.push_back(format!("User: {}", question));
        lines.push_back(format!("AI: {}", answer));
        while lines.len() > self.max_lines {
            lines.pop_front();
        }
        sessions.insert(session.to_string(), lines);

        while sessions.len() > self.max_sessions {
            // Keys may be OAuth tokens, never log them
            if sessions.shift_remove_index(0).is_some() {
                debug!(limit = self.max_sessions, "evicted stalest chat session");
            }
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
