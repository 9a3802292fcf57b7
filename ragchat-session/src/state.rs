//! Store state and the transitions applied to it
//!
//! Every method here runs inside one write-lock critical section of the
//! store, so a transition is always observed as a whole. None of them perform
//! I/O; the store and the connection task do that around them.

use ragchat_core::models::{Domain, DisplayedSession, Scenario, Session, ShortSession};
use ragchat_core::protocol::{Envelope, Selection};

use crate::error::{StoreError, StoreResult};
use crate::events::StoreEvent;

/// Lifecycle of the chat socket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    Closed,
    Reconnecting { attempt: u32 },
}

/// Result of starting a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryStart {
    pub session_id: String,
    /// True when the session had no exchanges before this one
    pub is_first: bool,
    pub selection: Selection,
}

#[derive(Debug, Clone)]
pub struct StoreState {
    pub sessions: Vec<ShortSession>,
    pub sessions_loading: bool,

    pub domains: Vec<Domain>,
    pub domains_loading: bool,
    pub domains_offset: u32,
    pub domains_limit: u32,
    pub has_more_domains: bool,

    pub active_session_id: Option<String>,
    pub active_session: Option<Session>,
    pub active_session_loading: bool,
    pub displayed_session: Option<DisplayedSession>,

    pub is_chat_disabled: bool,
    pub is_model_answering: bool,
    pub chat_error: Option<String>,

    pub selected_domain_id: Option<i64>,
    pub selected_domain: Option<Domain>,
    pub selected_scenario_id: Option<i64>,
    pub selected_scenario: Option<Scenario>,

    pub connection: ConnectionState,
}

impl Default for StoreState {
    fn default() -> Self {
        Self::new(10)
    }
}

impl StoreState {
    pub fn new(domains_limit: u32) -> Self {
        Self {
            sessions: Vec::new(),
            sessions_loading: false,
            domains: Vec::new(),
            domains_loading: false,
            domains_offset: 0,
            domains_limit,
            has_more_domains: true,
            active_session_id: None,
            active_session: None,
            active_session_loading: false,
            displayed_session: None,
            is_chat_disabled: false,
            is_model_answering: false,
            chat_error: None,
            selected_domain_id: None,
            selected_domain: None,
            selected_scenario_id: None,
            selected_scenario: None,
            connection: ConnectionState::Disconnected,
        }
    }

    /// Domain/scenario attached to outgoing frames
    pub fn selection(&self) -> Selection {
        Selection {
            domain_id: self.selected_domain_id,
            scenario_id: self.selected_scenario_id,
        }
    }

    // Sessions

    pub fn set_session(&mut self, session: Session) {
        self.displayed_session = Some(DisplayedSession::from(&session));
        self.active_session = Some(session);
    }

    /// Drop the active session if `id` is it. Returns true when something was cleared.
    pub fn forget_session(&mut self, id: &str) -> bool {
        if self.active_session_id.as_deref() != Some(id) {
            return false;
        }
        self.active_session_id = None;
        self.active_session = None;
        true
    }

    // Domains

    pub fn reset_domains(&mut self) {
        self.domains_offset = 0;
        self.domains.clear();
        self.has_more_domains = true;
    }

    pub fn apply_domain_page(&mut self, page: Vec<Domain>) {
        if page.len() < self.domains_limit as usize {
            self.has_more_domains = false;
        }
        self.domains.extend(page);
        self.domains_offset += self.domains_limit;
    }

    pub fn select_domain(&mut self, id: i64) {
        self.selected_domain_id = Some(id);
        if self.selected_domain.as_ref().map(|d| d.id) != Some(id) {
            self.selected_domain = None;
        }
    }

    /// Store a fetched domain if it is still the selected one.
    ///
    /// Returns the scenario that should be selected next: the first listed
    /// one. A domain without scenarios clears the scenario selection.
    pub fn apply_domain(&mut self, domain: Domain) -> Option<i64> {
        if self.selected_domain_id != Some(domain.id) {
            return None;
        }

        let first = domain.scenario_ids.first().copied();
        if first.is_none() {
            self.selected_scenario_id = None;
            self.selected_scenario = None;
        }
        self.selected_domain = Some(domain);
        first
    }

    pub fn select_scenario(&mut self, id: i64) {
        self.selected_scenario_id = Some(id);
        if self.selected_scenario.as_ref().map(|s| s.id) != Some(id) {
            self.selected_scenario = None;
        }
    }

    /// Store a fetched scenario if it is still the selected one
    pub fn apply_scenario(&mut self, scenario: Scenario) -> bool {
        if self.selected_scenario_id != Some(scenario.id) {
            return false;
        }
        self.selected_scenario = Some(scenario);
        true
    }

    // Chat socket

    pub fn on_open(&mut self, session_id: &str) {
        self.is_chat_disabled = false;
        self.active_session_id = Some(session_id.to_string());
        self.connection = ConnectionState::Open;
    }

    pub fn on_close(&mut self) {
        self.is_chat_disabled = true;
        self.connection = ConnectionState::Closed;
    }

    /// Explicit disconnect: no session is active afterwards
    pub fn on_disconnect(&mut self) {
        self.active_session_id = None;
        self.connection = ConnectionState::Disconnected;
    }

    /// Apply one inbound frame and return the events it produced
    pub fn on_envelope(&mut self, env: &Envelope) -> Vec<StoreEvent> {
        let mut events = Vec::new();

        if let Some(message) = env.error_message() {
            self.chat_error = Some(message.to_string());
            self.is_model_answering = false;
            self.is_chat_disabled = false;
            events.push(StoreEvent::ChatError {
                message: message.to_string(),
            });
        }

        if env.is_chunked {
            self.is_model_answering = true;
            self.is_chat_disabled = true;
            if self.append_chunk(env.content_str()) {
                events.push(StoreEvent::Chunk {
                    content: env.content_str().to_string(),
                });
            }
        }

        if env.is_last || !env.is_chunked {
            self.is_model_answering = false;
        }

        if env.is_last {
            self.is_chat_disabled = false;
            events.push(StoreEvent::AnswerFinished);
        }

        events
    }

    fn append_chunk(&mut self, chunk: &str) -> bool {
        if self.active_session_id.is_none() {
            return false;
        }
        match self.displayed_session.as_mut() {
            Some(displayed) => displayed.append_chunk(chunk),
            None => false,
        }
    }

    /// Mark the model busy and append the unanswered query to the display
    pub fn begin_query(&mut self, content: &str) -> StoreResult<QueryStart> {
        let session_id = self
            .active_session_id
            .clone()
            .ok_or(StoreError::NoActiveSession)?;

        let displayed = self.displayed_session.get_or_insert_with(Default::default);
        let is_first = displayed.is_empty();
        displayed.push_query(content);

        self.is_model_answering = true;
        self.is_chat_disabled = true;
        self.chat_error = None;

        Ok(QueryStart {
            session_id,
            is_first,
            selection: self.selection(),
        })
    }

    pub fn cancel_request(&mut self) {
        self.is_chat_disabled = false;
        self.is_model_answering = false;
    }
}
