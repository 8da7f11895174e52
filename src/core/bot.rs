use crate::core::conversation::{Conversation, ConversationSettings, Input, Session};
use crate::core::directory::IfscDirectory;
use crate::domain::model::{NewQueryLogEntry, Update};
use crate::domain::ports::{ChatTransport, QueryLog};
use crate::utils::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

/// Sessions are keyed per user within a chat.
type SessionKey = (i64, i64);

pub struct BotEngine<T: ChatTransport, L: QueryLog> {
    transport: T,
    query_log: L,
    directory: IfscDirectory,
    settings: ConversationSettings,
    poll_timeout_seconds: u64,
    retry_delay: Duration,
    sessions: HashMap<SessionKey, Session>,
    offset: Option<i64>,
}

impl<T: ChatTransport, L: QueryLog> BotEngine<T, L> {
    pub fn new(
        transport: T,
        query_log: L,
        directory: IfscDirectory,
        settings: ConversationSettings,
    ) -> Self {
        Self {
            transport,
            query_log,
            directory,
            settings,
            poll_timeout_seconds: crate::config::DEFAULT_POLL_TIMEOUT_SECONDS,
            retry_delay: crate::config::DEFAULT_RETRY_DELAY,
            sessions: HashMap::new(),
            offset: None,
        }
    }

    pub fn with_polling(mut self, poll_timeout_seconds: u64, retry_delay: Duration) -> Self {
        self.poll_timeout_seconds = poll_timeout_seconds;
        self.retry_delay = retry_delay;
        self
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.values().filter(|s| s.state.is_active()).count()
    }

    /// 下一次 getUpdates 使用的 offset
    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    /// Fetch one batch of updates and handle them in order.
    pub async fn poll_once(&mut self) -> Result<usize> {
        let updates = self
            .transport
            .get_updates(self.offset, self.poll_timeout_seconds)
            .await?;
        Ok(self.handle_batch(updates).await)
    }

    async fn handle_batch(&mut self, updates: Vec<Update>) -> usize {
        let count = updates.len();
        for update in updates {
            self.offset = Some(self.offset.unwrap_or(i64::MIN).max(update.update_id + 1));
            self.handle_update(update).await;
        }
        self.sweep_sessions(Instant::now());
        count
    }

    /// Tell Telegram that everything before `offset` was handled, so a
    /// restart does not receive those updates again.
    async fn confirm_offset(&self) {
        let Some(offset) = self.offset else {
            return;
        };
        match self.transport.get_updates(Some(offset), 0).await {
            Ok(_) => tracing::debug!("Confirmed updates before offset {}", offset),
            Err(e) => tracing::warn!("⚠️ Could not confirm offset {}: {}", offset, e),
        }
    }

    pub async fn handle_update(&mut self, update: Update) {
        let Some(message) = update.message else {
            tracing::debug!("Skipping update {} without message", update.update_id);
            return;
        };
        let Some(text) = message.text else {
            tracing::debug!("Skipping non-text message {}", message.message_id);
            return;
        };

        let chat_id = message.chat.id;
        let user_id = message.from.as_ref().map(|u| u.id);
        let username = message
            .from
            .as_ref()
            .and_then(|u| u.username.clone().or_else(|| u.first_name.clone()));

        let now = Instant::now();
        let key = (chat_id, user_id.unwrap_or(chat_id));
        let input = Input::parse(&text);
        tracing::debug!("💬 chat {}: {:?}", chat_id, input);

        let turn = {
            let session = self.sessions.entry(key).or_insert_with(|| Session::new(now));
            Conversation::new(&self.directory, &self.settings).handle(session, input, now)
        };

        for reply in turn.replies {
            let outgoing = reply.into_message(chat_id);
            if let Err(e) = self.transport.send_message(&outgoing).await {
                tracing::warn!("⚠️ Failed to send reply to chat {}: {}", chat_id, e);
            }
        }

        if let Some(logged) = turn.logged {
            tracing::info!(
                "🔎 chat {} lookup finished: {} (ifsc: {})",
                chat_id,
                logged.outcome,
                logged.ifsc.as_deref().unwrap_or("-")
            );
            let entry = NewQueryLogEntry {
                chat_id,
                user_id,
                username,
                state: logged.state,
                bank: logged.bank,
                branch: logged.branch,
                ifsc: logged.ifsc,
                outcome: logged.outcome,
            };
            if let Err(e) = self.query_log.append(entry).await {
                tracing::warn!("⚠️ Failed to write query log: {}", e);
            }
        }
    }

    /// Drop idle and timed-out sessions. Returns how many were removed.
    pub fn sweep_sessions(&mut self, now: Instant) -> usize {
        let timeout = self.settings.timeout;
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.state.is_active() && !session.is_expired(now, timeout));
        before - self.sessions.len()
    }

    /// Poll until `shutdown` resolves. Transient errors are retried after
    /// `retry_delay`; errors that retrying cannot fix are returned.
    ///
    /// Only the long poll itself is cancelled on shutdown. A fetched batch is
    /// always handled to the end, and the offset is confirmed before returning.
    pub async fn run<F: Future<Output = ()>>(&mut self, shutdown: F) -> Result<()> {
        tokio::pin!(shutdown);
        tracing::info!("🤖 Bot polling started");

        loop {
            let fetched = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                fetched = self.transport.get_updates(self.offset, self.poll_timeout_seconds) => fetched,
            };

            let e = match fetched {
                Ok(updates) => {
                    self.handle_batch(updates).await;
                    continue;
                }
                Err(e) => e,
            };

            if !e.is_retryable() && e.severity() >= crate::utils::error::ErrorSeverity::High {
                tracing::error!("❌ Polling stopped: {}", e);
                tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
                return Err(e);
            }
            tracing::warn!(
                "⚠️ Polling failed: {}; retrying in {:?}",
                e,
                self.retry_delay
            );
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.retry_delay) => {}
            }
        }

        self.confirm_offset().await;
        tracing::info!("👋 Bot polling stopped");
        Ok(())
    }
}
