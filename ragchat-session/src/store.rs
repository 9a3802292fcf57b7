//! The session store: REST-backed session and catalog state plus the chat socket

use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use ragchat_api::{ApiClients, AuthApi, ChatApi, DomainApi, TokenStore};
use ragchat_core::config::Config;
use ragchat_core::models::{
    CreateDomainRequest, CreateScenarioRequest, CreateSourceRequest, Domain, LoginResponse,
    Scenario, Session, ShortSession, Source,
};
use ragchat_core::protocol::{Envelope, Selection};
use ragchat_core::utils::{join_url, take_chars};

use crate::connection::{send_frame, ConnectionContext, ConnectionHandle, WsSink};
use crate::error::{StoreError, StoreResult};
use crate::events::StoreEvent;
use crate::reconnect::ReconnectPolicy;
use crate::state::{ConnectionState, StoreState};

const EVENT_CAPACITY: usize = 256;
const TITLE_MAX_CHARS: usize = 60;
const UNTITLED: &str = "Untitled";

/// Store settings that do not belong to a REST client
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Chat socket base; the session id is appended as the last path segment
    pub ws_url: String,
    pub reconnect: ReconnectPolicy,
    pub domains_limit: u32,
}

impl From<&Config> for StoreOptions {
    fn from(config: &Config) -> Self {
        Self {
            ws_url: config.api.ws_url.clone(),
            reconnect: ReconnectPolicy::from(&config.reconnect),
            domains_limit: config.pagination.domains_limit,
        }
    }
}

/// Session store.
///
/// Holds the session list, the active session with its displayed history,
/// the domain catalog with the current domain/scenario selection, and at most
/// one chat socket. State changes are announced on [`SessionStore::subscribe`].
pub struct SessionStore {
    options: StoreOptions,
    token: TokenStore,
    chat: Arc<dyn ChatApi>,
    domains: Arc<dyn DomainApi>,
    auth: Arc<dyn AuthApi>,
    state: Arc<RwLock<StoreState>>,
    ws_tx: Arc<RwLock<Option<WsSink>>>,
    connection: Mutex<Option<ConnectionHandle>>,
    events: broadcast::Sender<StoreEvent>,
}

impl SessionStore {
    pub fn new(
        options: StoreOptions,
        token: TokenStore,
        chat: Arc<dyn ChatApi>,
        domains: Arc<dyn DomainApi>,
        auth: Arc<dyn AuthApi>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let state = StoreState::new(options.domains_limit);

        Self {
            options,
            token,
            chat,
            domains,
            auth,
            state: Arc::new(RwLock::new(state)),
            ws_tx: Arc::new(RwLock::new(None)),
            connection: Mutex::new(None),
            events,
        }
    }

    /// Build the store with reqwest clients from configuration
    pub fn from_config(config: &Config) -> StoreResult<Self> {
        let token = TokenStore::new(config.auth.token().map(ToString::to_string));
        let clients = ApiClients::from_config(&config.api, token.clone())?;

        Ok(Self::new(
            StoreOptions::from(config),
            token,
            Arc::new(clients.chat),
            Arc::new(clients.domain),
            Arc::new(clients.auth),
        ))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> StoreState {
        self.state.read().await.clone()
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.state.read().await.connection
    }

    pub async fn selection(&self) -> Selection {
        self.state.read().await.selection()
    }

    pub fn token(&self) -> &TokenStore {
        &self.token
    }

    fn publish(&self, event: StoreEvent) {
        let _ = self.events.send(event);
    }

    pub async fn login(&self, email: &str, password: &str) -> StoreResult<LoginResponse> {
        let resp = self.auth.login(email, password).await?;
        self.token.set(resp.token.clone());
        Ok(resp)
    }

    /// Close the socket and forget the token and everything loaded with it
    pub async fn logout(&self) {
        self.disconnect().await;
        self.token.clear();
        {
            let mut state = self.state.write().await;
            state.sessions.clear();
            state.active_session = None;
            state.displayed_session = None;
            state.chat_error = None;
        }
        self.publish(StoreEvent::SessionsUpdated);
        info!("Logged out");
    }

    // Sessions

    /// Create a session, refresh the list and connect to it. Returns the new id.
    pub async fn create_session(&self) -> StoreResult<String> {
        let id = self.chat.create_session().await?;
        info!("Created chat session {}", id);

        self.state.write().await.displayed_session = None;

        if let Err(e) = self.get_sessions().await {
            warn!("Failed to refresh sessions after create: {}", e);
        }

        self.connect(&id).await?;
        Ok(id)
    }

    pub async fn get_sessions(&self) -> StoreResult<Vec<ShortSession>> {
        self.state.write().await.sessions_loading = true;
        let result = self.chat.list_sessions().await;

        {
            let mut state = self.state.write().await;
            state.sessions_loading = false;
            if let Ok(sessions) = &result {
                state.sessions = sessions.clone();
            }
        }

        let sessions = result?;
        self.publish(StoreEvent::SessionsUpdated);
        Ok(sessions)
    }

    /// Load a session's history into the display and connect to it
    pub async fn get_session(&self, id: &str) -> StoreResult<Session> {
        self.state.write().await.active_session_loading = true;
        let result = self.chat.get_session(id).await;

        {
            let mut state = self.state.write().await;
            state.active_session_loading = false;
            if let Ok(session) = &result {
                state.set_session(session.clone());
            }
        }

        let session = result?;
        self.connect(id).await?;
        Ok(session)
    }

    pub async fn rename_session(&self, id: &str, title: &str) -> StoreResult<()> {
        self.chat.rename_session(id, title).await?;
        Ok(())
    }

    /// Delete a session; if it is the active one the store forgets it and closes its socket
    pub async fn delete_session(&self, id: &str) -> StoreResult<()> {
        self.chat.delete_session(id).await?;

        let forgotten = self.state.write().await.forget_session(id);
        if forgotten {
            info!("Deleted active session {}", id);
            let connected_here = self
                .connection
                .lock()
                .await
                .as_ref()
                .is_some_and(|handle| handle.session_id() == id);
            if connected_here {
                self.disconnect().await;
            }
        }
        Ok(())
    }

    // Catalog

    /// Fetch the next page of domains, or the first one when `reset`. Returns whether more pages remain.
    pub async fn get_domains(&self, reset: bool) -> StoreResult<bool> {
        let (offset, limit) = {
            let mut state = self.state.write().await;
            if reset {
                state.reset_domains();
            }
            state.domains_loading = true;
            (state.domains_offset, state.domains_limit)
        };

        let result = self.domains.list_domains(offset, limit).await;

        let has_more = {
            let mut state = self.state.write().await;
            state.domains_loading = false;
            match result {
                Ok(page) => {
                    state.apply_domain_page(page);
                    state.has_more_domains
                }
                Err(e) => {
                    error!("Failed to load domains at offset {}: {}", offset, e);
                    return Err(e.into());
                }
            }
        };

        self.publish(StoreEvent::DomainsUpdated);
        Ok(has_more)
    }

    /// Select a domain and, when it has scenarios, its first scenario
    pub async fn set_selected_domain(&self, id: i64) -> StoreResult<()> {
        self.state.write().await.select_domain(id);

        let domain = self.domains.get_domain(id).await?;
        let next = self.state.write().await.apply_domain(domain);

        if let Some(scenario_id) = next {
            self.set_selected_scenario(scenario_id).await?;
        }
        Ok(())
    }

    pub async fn set_selected_scenario(&self, id: i64) -> StoreResult<()> {
        self.state.write().await.select_scenario(id);

        let scenario = self.domains.get_scenario(id).await?;
        if !self.state.write().await.apply_scenario(scenario) {
            debug!("Scenario {} is no longer selected, dropping fetch result", id);
        }
        Ok(())
    }

    pub async fn get_sources(&self) -> StoreResult<Vec<Source>> {
        Ok(self.domains.list_sources().await?)
    }

    pub async fn create_source(&self, req: &CreateSourceRequest) -> StoreResult<Source> {
        Ok(self.domains.create_source(req).await?)
    }

    pub async fn create_domain(&self, req: &CreateDomainRequest) -> StoreResult<Domain> {
        Ok(self.domains.create_domain(req).await?)
    }

    pub async fn get_domain(&self, id: i64) -> StoreResult<Domain> {
        Ok(self.domains.get_domain(id).await?)
    }

    pub async fn create_scenario(&self, req: &CreateScenarioRequest) -> StoreResult<Scenario> {
        Ok(self.domains.create_scenario(req).await?)
    }

    /// Create a scenario and select it, switching to its domain first when another one is selected
    pub async fn create_and_select_scenario(
        &self,
        req: &CreateScenarioRequest,
    ) -> StoreResult<Scenario> {
        let scenario = self.domains.create_scenario(req).await?;
        info!("Created scenario {} for domain {}", scenario.id, req.domain_id);

        let selected_domain = self.state.read().await.selected_domain_id;
        if selected_domain != Some(req.domain_id) {
            self.set_selected_domain(req.domain_id).await?;
        }
        self.set_selected_scenario(scenario.id).await?;
        Ok(scenario)
    }

    pub async fn get_scenarios(&self, offset: u32, limit: u32) -> StoreResult<Vec<Scenario>> {
        Ok(self.domains.list_scenarios(offset, limit).await?)
    }

    pub async fn get_scenario(&self, id: i64) -> StoreResult<Scenario> {
        Ok(self.domains.get_scenario(id).await?)
    }

    // Chat socket

    /// Open the chat socket for `session_id`, closing any existing one first
    pub async fn connect(&self, session_id: &str) -> StoreResult<()> {
        if self.token.get().is_none() {
            return Err(StoreError::NotAuthenticated);
        }

        let mut connection = self.connection.lock().await;
        if let Some(previous) = connection.take() {
            let previous_id = previous.session_id().to_string();
            info!("Closing chat socket for session {}", previous_id);
            previous.close().await;
            self.state.write().await.on_disconnect();
            self.publish(StoreEvent::Disconnected {
                session_id: previous_id,
            });
        }

        let ctx = ConnectionContext {
            session_id: session_id.to_string(),
            url: join_url(&self.options.ws_url, session_id),
            token: self.token.clone(),
            policy: self.options.reconnect.clone(),
            state: Arc::clone(&self.state),
            ws_tx: Arc::clone(&self.ws_tx),
            events: self.events.clone(),
        };
        *connection = Some(ConnectionHandle::spawn(ctx));
        Ok(())
    }

    /// Close the chat socket without reconnecting; no session is active afterwards
    pub async fn disconnect(&self) {
        let handle = self.connection.lock().await.take();
        let Some(handle) = handle else {
            return;
        };

        let session_id = handle.session_id().to_string();
        handle.close().await;
        self.state.write().await.on_disconnect();
        self.publish(StoreEvent::Disconnected { session_id });
        info!("Disconnected from chat socket");
    }

    /// Send a query on the active session.
    ///
    /// The unanswered entry is appended before the frame goes out. When the
    /// socket is not open the frame is dropped. The first query of a session
    /// also renames it in the background.
    pub async fn send_message(&self, content: &str) -> StoreResult<()> {
        let start = self.state.write().await.begin_query(content)?;

        let frame = Envelope::query(content, start.selection).encode()?;
        if !send_frame(&self.ws_tx, frame).await {
            debug!("Chat socket not open, query for {} not sent", start.session_id);
        }

        if start.is_first {
            self.spawn_rename(start.session_id, first_message_title(content));
        }
        Ok(())
    }

    /// Stop waiting for the current answer. Nothing is sent to the server.
    pub async fn cancel_request(&self) {
        self.state.write().await.cancel_request();
    }

    fn spawn_rename(&self, session_id: String, title: String) {
        let chat = Arc::clone(&self.chat);
        tokio::spawn(async move {
            match chat.rename_session(&session_id, &title).await {
                Ok(()) => debug!("Renamed session {} to {:?}", session_id, title),
                Err(e) => warn!("Failed to rename session {}: {}", session_id, e),
            }
        });
    }
}

/// Title derived from the first query of a session
fn first_message_title(content: &str) -> String {
    let title = take_chars(content, TITLE_MAX_CHARS);
    if title.trim().is_empty() {
        UNTITLED.to_string()
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_title() {
        assert_eq!(first_message_title("Hello world"), "Hello world");
        assert_eq!(first_message_title("   "), "Untitled");
        let long = "я".repeat(80);
        assert_eq!(first_message_title(&long).chars().count(), 60);
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.pagination.domains_limit = 25;
        let options = StoreOptions::from(&config);
        assert_eq!(options.domains_limit, 25);
        assert_eq!(options.ws_url, "ws://localhost:9000/api/v1/chat/ws");
        assert_eq!(options.reconnect.max_attempts, 5);
    }
}
