//! Session controller: the single owner and mutation point of conversation state
//!
//! The controller creates the conversation, submits prompts, records every
//! outcome as an exchange, and tracks which exchange and result page the user
//! is looking at. Submission is split into [`SessionController::begin_submission`],
//! [`PendingQuery::run`] and [`SessionController::complete_submission`] so the
//! network round-trip can run elsewhere while selection and paging stay
//! responsive.

use crate::client::{HttpQueryService, QueryClient, QueryService};
use crate::events::{Activity, ControllerPhase, QueryOutcome};
use crate::exchange::{QueryExchange, Row, new_exchange_id};
use crate::paginator::{self, PageWindow};
use crate::session::ConversationSession;

/// Which exchange is displayed and which page of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    /// `None` means "the most recent exchange"
    pub selected: Option<String>,
    /// 1-based page of the displayed exchange's rows
    pub page: usize,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            selected: None,
            page: 1,
        }
    }
}

/// A submission that has been accepted but not yet sent
pub struct PendingQuery<S: QueryService = HttpQueryService> {
    client: QueryClient<S>,
    prompt: String,
    conversation_id: Option<String>,
}

impl<S: QueryService> PendingQuery<S> {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Perform the request; never fails, errors are carried in the outcome
    pub async fn run(self) -> QueryOutcome {
        let result = self
            .client
            .submit(&self.prompt, self.conversation_id.as_deref())
            .await;
        QueryOutcome {
            prompt: self.prompt,
            result,
        }
    }
}

pub struct SessionController<S: QueryService = HttpQueryService> {
    client: QueryClient<S>,
    session: ConversationSession,
    selection: SelectionState,
    phase: ControllerPhase,
    page_size: usize,
    load_history: bool,
    last_error: Option<String>,
}

impl<S: QueryService> SessionController<S> {
    pub fn new(client: QueryClient<S>, page_size: usize) -> Self {
        Self {
            client,
            session: ConversationSession::detached(),
            selection: SelectionState::default(),
            phase: ControllerPhase::Uninitialized,
            page_size: page_size.max(1),
            load_history: false,
            last_error: None,
        }
    }

    /// Populate the session from the service's history on start
    pub fn with_history_loading(mut self, enabled: bool) -> Self {
        self.load_history = enabled;
        self
    }

    /// Create the conversation and, if enabled, load prior history
    ///
    /// A failed conversation bootstrap leaves the controller ready without a
    /// conversation id; a failed history load leaves the history empty.
    pub async fn start(&mut self) {
        if self.phase != ControllerPhase::Uninitialized {
            return;
        }
        self.phase = ControllerPhase::Creating;

        let client = self.client.clone();
        let load_history = self.load_history;
        let (created, history) = futures::join!(
            ConversationSession::create(&client),
            async {
                if !load_history {
                    return Vec::new();
                }
                match client.history().await {
                    Ok(exchanges) => exchanges,
                    Err(e) => {
                        tracing::warn!("Could not load query history: {}", e);
                        Vec::new()
                    }
                }
            }
        );

        self.session = match created {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("{}; continuing without a conversation id", e);
                ConversationSession::detached()
            }
        };

        // the service may list newest first; the session is oldest first
        let mut history = history;
        history.sort_by_key(|exchange| exchange.created_at);

        let mut loaded = 0;
        for exchange in history {
            if self.session.append(exchange) {
                loaded += 1;
            }
        }
        if loaded > 0 {
            tracing::info!(count = loaded, "Loaded query history");
        }

        self.selection = SelectionState::default();
        self.phase = ControllerPhase::Ready(Activity::Idle);
    }

    /// Accept a prompt for submission
    ///
    /// Returns `None` without side effects when the prompt is blank, a
    /// submission is already in flight, or the controller is not ready.
    pub fn begin_submission(&mut self, prompt: &str) -> Option<PendingQuery<S>> {
        if prompt.trim().is_empty() {
            tracing::debug!("Ignoring empty prompt");
            return None;
        }
        match self.phase {
            ControllerPhase::Ready(Activity::Idle) => {}
            ControllerPhase::Ready(Activity::Submitting) => {
                tracing::debug!("Submission already in flight; ignoring prompt");
                return None;
            }
            phase => {
                tracing::debug!(?phase, "Controller not ready; ignoring prompt");
                return None;
            }
        }

        self.phase = ControllerPhase::Ready(Activity::Submitting);
        tracing::info!(
            conversation_id = self.session.conversation_id().unwrap_or("-"),
            "Submitting prompt"
        );

        Some(PendingQuery {
            client: self.client.clone(),
            prompt: prompt.to_string(),
            conversation_id: self.session.conversation_id().map(str::to_string),
        })
    }

    /// Record the outcome of a submission as a new exchange at the end of history
    ///
    /// Failures become failed exchanges. The new exchange becomes the
    /// displayed one and paging restarts at 1.
    pub fn complete_submission(&mut self, outcome: QueryOutcome) -> &QueryExchange {
        let mut exchange = match outcome.result {
            Ok(exchange) => {
                self.last_error = None;
                exchange
            }
            Err(e) => {
                let message = e.user_message();
                tracing::warn!("Query failed: {}", message);
                self.last_error = Some(message.clone());
                QueryExchange::failure(outcome.prompt, message)
            }
        };

        if self.session.find(&exchange.id).is_some() {
            let fresh = new_exchange_id();
            tracing::warn!(old = %exchange.id, new = %fresh, "Service reused an exchange id; re-keying");
            exchange.id = fresh;
        }

        tracing::info!(
            id = %exchange.id,
            rows = exchange.row_count(),
            failed = exchange.failed,
            "Query completed"
        );
        self.session.append(exchange);
        self.selection = SelectionState::default();
        self.phase = ControllerPhase::Ready(Activity::Idle);

        // append cannot fail after re-keying, so the session is non-empty
        &self.session.exchanges()[self.session.len() - 1]
    }

    /// Submit a prompt and wait for the answer
    ///
    /// Returns the new exchange, or `None` if the prompt was not accepted.
    pub async fn submit(&mut self, prompt: &str) -> Option<&QueryExchange> {
        let pending = self.begin_submission(prompt)?;
        let outcome = pending.run().await;
        Some(self.complete_submission(outcome))
    }

    /// Display a specific exchange; unknown ids are ignored
    pub fn select(&mut self, id: &str) -> bool {
        if self.session.find(id).is_none() {
            tracing::debug!(%id, "Ignoring selection of unknown exchange");
            return false;
        }
        self.selection = SelectionState {
            selected: Some(id.to_string()),
            page: 1,
        };
        true
    }

    /// Go back to following the most recent exchange
    pub fn select_latest(&mut self) {
        self.selection = SelectionState::default();
    }

    /// Move the selection `delta` steps through history (negative is older)
    pub fn select_relative(&mut self, delta: isize) -> bool {
        let Some(current) = self.displayed_index() else {
            return false;
        };
        let last = self.session.len() - 1;
        let target = current.saturating_add_signed(delta).min(last);
        if target == current {
            return false;
        }
        let id = self.session.exchanges()[target].id.clone();
        self.select(&id)
    }

    /// Move `delta` pages, clamped to the displayed exchange's page range
    pub fn change_page(&mut self, delta: i64) -> usize {
        let target = (self.selection.page as i64).saturating_add(delta);
        self.go_to_page(target)
    }

    /// Jump to `page`, clamped to the displayed exchange's page range
    pub fn go_to_page(&mut self, page: i64) -> usize {
        let row_count = self.displayed().map(QueryExchange::row_count).unwrap_or(0);
        self.selection.page = paginator::clamp_page(page, row_count, self.page_size);
        self.selection.page
    }

    /// The exchange on screen: the selected one, or the latest when none is selected
    pub fn displayed(&self) -> Option<&QueryExchange> {
        match &self.selection.selected {
            Some(id) => self.session.find(id).or_else(|| self.session.latest()),
            None => self.session.latest(),
        }
    }

    fn displayed_index(&self) -> Option<usize> {
        let displayed = self.displayed()?;
        self.session.position(&displayed.id)
    }

    /// Current page of the displayed exchange's rows
    pub fn page_view(&self) -> Option<PageWindow<'_, Row>> {
        self.displayed().map(|exchange| {
            paginator::paginate(&exchange.rows, self.page_size, self.selection.page as i64)
        })
    }

    pub fn exchanges(&self) -> &[QueryExchange] {
        self.session.exchanges()
    }

    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.session.conversation_id()
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selection.selected.as_deref()
    }

    pub fn page(&self) -> usize {
        self.selection.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.phase, ControllerPhase::Ready(_))
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == ControllerPhase::Ready(Activity::Submitting)
    }

    /// Message of the most recent failed submission, cleared by the next success
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NlQueryError;
    use crate::test_utils::{ScriptedService, numbered_rows};
    use serde_json::json;

    async fn ready(service: ScriptedService) -> SessionController<ScriptedService> {
        let mut controller = SessionController::new(QueryClient::new(service), 10);
        controller.start().await;
        controller
    }

    fn ok_outcome(id: &str, rows: usize) -> QueryOutcome {
        QueryOutcome {
            prompt: format!("prompt {}", id),
            result: Ok(QueryExchange::succeeded(
                Some(id.to_string()),
                format!("prompt {}", id),
                "SELECT 1",
                numbered_rows(rows),
                None,
            )),
        }
    }

    #[tokio::test]
    async fn test_start_creates_conversation() {
        let controller = ready(ScriptedService::new().with_conversation_id("conv-1")).await;
        assert_eq!(controller.conversation_id(), Some("conv-1"));
        assert_eq!(controller.phase(), ControllerPhase::Ready(Activity::Idle));
        assert!(controller.exchanges().is_empty());
        assert!(controller.displayed().is_none());
        assert!(controller.page_view().is_none());
    }

    #[tokio::test]
    async fn test_start_degrades_without_conversation() {
        let controller = ready(ScriptedService::new().with_conversation_error("down")).await;
        assert_eq!(controller.conversation_id(), None);
        assert!(controller.is_ready());
    }

    #[tokio::test]
    async fn test_submit_before_start_is_ignored() {
        let mut controller =
            SessionController::new(QueryClient::new(ScriptedService::new()), 10);
        assert_eq!(controller.phase(), ControllerPhase::Uninitialized);
        assert!(controller.begin_submission("anything").is_none());
    }

    #[tokio::test]
    async fn test_submit_scenario_appends_exchange() {
        let service = ScriptedService::new().with_chat_json(json!({
            "id": "q1",
            "sql": "SELECT ...",
            "results": [{"a": 1}, {"a": 2}]
        }));
        let mut controller = ready(service).await;

        let exchange = controller.submit("show top 5 customers").await.unwrap().clone();

        assert_eq!(exchange.id, "q1");
        assert_eq!(exchange.prompt, "show top 5 customers");
        assert_eq!(exchange.rows.len(), 2);
        assert_eq!(exchange.rows[0]["a"], json!(1));
        assert_eq!(exchange.rows[1]["a"], json!(2));
        assert!(!exchange.failed);
        assert_eq!(controller.exchanges().len(), 1);
        assert!(controller.last_error().is_none());
    }

    #[tokio::test]
    async fn test_submit_sends_conversation_id() {
        let service = ScriptedService::new()
            .with_conversation_id("conv-7")
            .with_chat_json(json!({"id": "q1"}));
        let mut controller = ready(service).await;
        let pending = controller.begin_submission("hello").unwrap();
        assert_eq!(pending.prompt(), "hello");
        let outcome = pending.run().await;
        controller.complete_submission(outcome);
        assert_eq!(controller.exchanges().len(), 1);

        let requests = controller.client.service().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].message, "hello");
        assert_eq!(requests[0].conversation_id.as_deref(), Some("conv-7"));
    }

    #[tokio::test]
    async fn test_detached_controller_sends_no_conversation_id() {
        let service = ScriptedService::new()
            .with_conversation_error("refused")
            .with_chat_json(json!({"id": "q1"}));
        let mut controller = ready(service).await;
        controller.submit("hello").await.unwrap();

        let requests = controller.client.service().requests();
        assert_eq!(requests[0].conversation_id, None);
    }

    #[tokio::test]
    async fn test_failed_submission_is_recorded() {
        let service = ScriptedService::new().with_chat_error("Could not reach query service");
        let mut controller = ready(service).await;

        let exchange = controller.submit("revenue by month").await.unwrap().clone();

        assert!(exchange.failed);
        assert!(exchange.rows.is_empty());
        assert_eq!(exchange.prompt, "revenue by month");
        assert_eq!(controller.exchanges().len(), 1);
        assert_eq!(controller.last_error(), Some("Could not reach query service"));
        assert_eq!(controller.phase(), ControllerPhase::Ready(Activity::Idle));
    }

    #[tokio::test]
    async fn test_success_clears_last_error() {
        let service = ScriptedService::new()
            .with_chat_error("boom")
            .with_chat_json(json!({"id": "q2"}));
        let mut controller = ready(service).await;

        controller.submit("first").await;
        assert!(controller.last_error().is_some());
        controller.submit("second").await;
        assert!(controller.last_error().is_none());
        assert_eq!(controller.exchanges().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_prompt_is_ignored() {
        let service = ScriptedService::new();
        let mut controller = ready(service).await;

        assert!(controller.submit("   \t\n").await.is_none());
        assert!(controller.exchanges().is_empty());
        assert!(!controller.is_submitting());
    }

    #[tokio::test]
    async fn test_submit_while_submitting_is_noop() {
        let mut controller = ready(ScriptedService::new()).await;

        let first = controller.begin_submission("first");
        assert!(first.is_some());
        assert!(controller.is_submitting());
        assert!(controller.begin_submission("second").is_none());
        assert!(controller.exchanges().is_empty());

        controller.complete_submission(ok_outcome("a", 0));
        assert_eq!(controller.exchanges().len(), 1);
        assert!(!controller.is_submitting());
    }

    #[tokio::test]
    async fn test_select_and_page_while_submitting() {
        let mut controller = ready(ScriptedService::new()).await;
        controller.begin_submission("a").unwrap();
        controller.complete_submission(ok_outcome("a", 25));
        controller.begin_submission("b").unwrap();
        controller.complete_submission(ok_outcome("b", 3));

        let _pending = controller.begin_submission("c").unwrap();
        assert!(controller.select("a"));
        assert_eq!(controller.change_page(1), 2);

        controller.complete_submission(ok_outcome("c", 1));
        assert_eq!(controller.displayed().map(|e| e.id.as_str()), Some("c"));
        assert_eq!(controller.selected_id(), None);
        assert_eq!(controller.page(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_exchange_id_is_rekeyed() {
        let mut controller = ready(ScriptedService::new()).await;
        controller.begin_submission("one").unwrap();
        controller.complete_submission(ok_outcome("same", 0));
        controller.begin_submission("two").unwrap();
        let second = controller.complete_submission(ok_outcome("same", 0)).clone();

        assert_ne!(second.id, "same");
        assert_eq!(controller.exchanges().len(), 2);
        assert_eq!(controller.exchanges()[1].id, second.id);
    }

    #[tokio::test]
    async fn test_paging_scenario_clamps_at_last_page() {
        let mut controller = ready(ScriptedService::new()).await;
        controller.begin_submission("rows").unwrap();
        controller.complete_submission(ok_outcome("q", 25));

        assert_eq!(controller.page(), 1);
        assert_eq!(controller.page_view().unwrap().total_pages, 3);
        assert_eq!(controller.change_page(1), 2);
        assert_eq!(controller.change_page(1), 3);
        assert_eq!(controller.change_page(1), 3);

        let view = controller.page_view().unwrap();
        assert_eq!(view.rows.len(), 5);
        assert_eq!(view.first_row, 21);
        assert_eq!(controller.change_page(-10), 1);
    }

    #[tokio::test]
    async fn test_go_to_page_clamps() {
        let mut controller = ready(ScriptedService::new()).await;
        controller.begin_submission("rows").unwrap();
        controller.complete_submission(ok_outcome("q", 25));

        assert_eq!(controller.go_to_page(2), 2);
        assert_eq!(controller.go_to_page(99), 3);
        assert_eq!(controller.go_to_page(0), 1);
    }

    #[tokio::test]
    async fn test_change_page_without_exchanges_stays_on_one() {
        let mut controller = ready(ScriptedService::new()).await;
        assert_eq!(controller.change_page(1), 1);
        assert_eq!(controller.change_page(-1), 1);
    }

    #[tokio::test]
    async fn test_select_resets_page() {
        let mut controller = ready(ScriptedService::new()).await;
        controller.begin_submission("a").unwrap();
        controller.complete_submission(ok_outcome("a", 30));
        controller.begin_submission("b").unwrap();
        controller.complete_submission(ok_outcome("b", 30));

        controller.change_page(2);
        assert_eq!(controller.page(), 3);
        assert!(controller.select("a"));
        assert_eq!(controller.page(), 1);
        assert_eq!(controller.displayed().map(|e| e.id.as_str()), Some("a"));

        controller.change_page(1);
        controller.select_latest();
        assert_eq!(controller.page(), 1);
        assert_eq!(controller.displayed().map(|e| e.id.as_str()), Some("b"));
    }

    #[tokio::test]
    async fn test_select_unknown_id_is_ignored() {
        let mut controller = ready(ScriptedService::new()).await;
        controller.begin_submission("a").unwrap();
        controller.complete_submission(ok_outcome("a", 30));
        controller.change_page(1);

        assert!(!controller.select("missing"));
        assert_eq!(controller.page(), 2);
        assert_eq!(controller.selected_id(), None);
    }

    #[tokio::test]
    async fn test_select_relative_walks_history() {
        let mut controller = ready(ScriptedService::new()).await;
        for id in ["a", "b", "c"] {
            controller.begin_submission(id).unwrap();
            controller.complete_submission(ok_outcome(id, 1));
        }

        assert!(controller.select_relative(-1));
        assert_eq!(controller.selected_id(), Some("b"));
        assert!(controller.select_relative(-5));
        assert_eq!(controller.selected_id(), Some("a"));
        assert!(!controller.select_relative(-1));
        assert!(controller.select_relative(10));
        assert_eq!(controller.selected_id(), Some("c"));
    }

    fn past(id: &str, minutes_ago: i64) -> QueryExchange {
        let mut exchange =
            QueryExchange::succeeded(Some(id.to_string()), id, "SELECT 1", Vec::new(), None);
        exchange.created_at = chrono::Utc::now() - chrono::Duration::minutes(minutes_ago);
        exchange
    }

    #[tokio::test]
    async fn test_start_loads_history_in_order() {
        let history = vec![past("h1", 30), past("h2", 20), past("h1", 10)];
        let client = QueryClient::new(ScriptedService::new().with_history(history));
        let mut controller = SessionController::new(client, 10).with_history_loading(true);
        controller.start().await;

        let ids: Vec<_> = controller.exchanges().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["h1", "h2"]);
        assert_eq!(controller.displayed().map(|e| e.id.as_str()), Some("h2"));
    }

    #[tokio::test]
    async fn test_newest_first_history_is_reordered() {
        let history = vec![past("h3", 1), past("h2", 5), past("h1", 9)];
        let client = QueryClient::new(ScriptedService::new().with_history(history));
        let mut controller = SessionController::new(client, 10).with_history_loading(true);
        controller.start().await;

        let ids: Vec<_> = controller.exchanges().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["h1", "h2", "h3"]);
    }

    #[tokio::test]
    async fn test_history_failure_is_not_fatal() {
        let client = QueryClient::new(ScriptedService::new().with_history_error("404"));
        let mut controller = SessionController::new(client, 10).with_history_loading(true);
        controller.start().await;

        assert!(controller.is_ready());
        assert!(controller.exchanges().is_empty());
        assert_eq!(controller.conversation_id(), Some("conv-test"));
    }

    #[tokio::test]
    async fn test_start_twice_is_noop() {
        let mut controller = ready(ScriptedService::new()).await;
        controller.begin_submission("a").unwrap();
        controller.complete_submission(ok_outcome("a", 1));
        controller.start().await;
        assert_eq!(controller.exchanges().len(), 1);
        assert!(controller.is_ready());
    }

    #[tokio::test]
    async fn test_empty_input_error_becomes_failed_exchange() {
        let mut controller = ready(ScriptedService::new()).await;
        controller.begin_submission("x").unwrap();
        let exchange = controller.complete_submission(QueryOutcome {
            prompt: "x".to_string(),
            result: Err(NlQueryError::EmptyInput),
        });
        assert!(exchange.failed);
    }
}
