//! Debate session state.
//!
//! A session owns the current topic, the arguments shown for each stance
//! and the chat transcript. Transitions are async methods on `&mut self`,
//! so calls against one session are serialized: a second request cannot
//! start until the first resolves or is cancelled.

use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::SendersConfig;
use crate::error::DebateError;
use crate::flows::DebateFlows;
use crate::schema::{AnalysisResult, AnalyzeWeaknessesInput, GenerateArgumentsInput};
use crate::stance::Stance;

/// Where the session is in its request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    AwaitingProArguments,
    AwaitingConArguments,
    Ready,
    AwaitingAnalysis,
}

impl SessionState {
    fn awaiting(stance: Stance) -> Self {
        match stance {
            Stance::Pro => SessionState::AwaitingProArguments,
            Stance::Con => SessionState::AwaitingConArguments,
        }
    }

    pub fn is_pending(&self) -> bool {
        !matches!(self, SessionState::Idle | SessionState::Ready)
    }
}

/// A line in the chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub sender: String,
}

/// A user-visible notice, shown instead of silently dropping a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    /// Whether the session can keep taking requests after this notice.
    pub recoverable: bool,
}

impl Notice {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            recoverable: true,
        }
    }

    pub fn missing_topic() -> Self {
        Self::new("Missing topic!", "Please enter a debate topic.")
    }

    pub fn no_debate() -> Self {
        Self::new(
            "No debate yet",
            "Submit a debate topic before analyzing arguments.",
        )
    }

    pub fn from_error(err: &DebateError) -> Self {
        Self {
            recoverable: err.is_recoverable(),
            ..Self::new(err.title(), err.to_string())
        }
    }
}

/// Events emitted as the session changes.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(SessionState),
    /// The argument list for a stance was replaced wholesale.
    ArgumentsReplaced {
        stance: Stance,
        arguments: Vec<String>,
    },
    MessageAppended(ChatMessage),
    Notice(Notice),
}

/// Callback for session events.
pub type SessionCallback = Box<dyn Fn(SessionEvent) + Send + Sync>;

/// Result of a handler invocation.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The handler stopped early and surfaced a notice.
    Noticed(Notice),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }

    /// The surfaced notice, if the handler stopped early.
    pub fn notice(&self) -> Option<&Notice> {
        match self {
            Outcome::Completed => None,
            Outcome::Noticed(notice) => Some(notice),
        }
    }

    /// True unless the handler surfaced a notice the session cannot recover from.
    pub fn is_recoverable(&self) -> bool {
        self.notice().is_none_or(|notice| notice.recoverable)
    }
}

/// A single debate practice session.
pub struct DebateSession {
    topic: Option<String>,
    pro_arguments: Vec<String>,
    con_arguments: Vec<String>,
    transcript: Vec<ChatMessage>,
    state: SessionState,
    last_notice: Option<Notice>,
    senders: SendersConfig,
    callback: Option<SessionCallback>,
}

impl Default for DebateSession {
    fn default() -> Self {
        Self::new(SendersConfig::default())
    }
}

impl DebateSession {
    pub fn new(senders: SendersConfig) -> Self {
        Self {
            topic: None,
            pro_arguments: Vec::new(),
            con_arguments: Vec::new(),
            transcript: Vec::new(),
            state: SessionState::Idle,
            last_notice: None,
            senders,
            callback: None,
        }
    }

    /// Set a callback for session events.
    pub fn with_callback(mut self, callback: SessionCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Submit a topic and generate arguments for both stances, pro first.
    ///
    /// Both argument lists are cleared as soon as a non-empty topic is
    /// accepted. The transcript is never cleared. If the pro request fails
    /// the con request is not attempted.
    pub async fn submit_topic(
        &mut self,
        flows: &DebateFlows,
        topic: &str,
        cancel: &CancellationToken,
    ) -> Outcome {
        let topic = topic.trim();
        if topic.is_empty() {
            return self.notify(Notice::missing_topic());
        }

        info!(topic, "starting debate");
        self.topic = Some(topic.to_string());
        for stance in Stance::ALL {
            self.replace_arguments(stance, Vec::new());
        }

        for stance in Stance::ALL {
            self.set_state(SessionState::awaiting(stance));

            let generated = match GenerateArgumentsInput::new(topic, stance) {
                Ok(input) => with_cancel(cancel, flows.generate_arguments(&input)).await,
                Err(e) => Err(e),
            };

            match generated {
                Ok(output) => {
                    let sender = self.senders.for_stance(stance).to_string();
                    self.replace_arguments(stance, output.arguments.clone());
                    for argument in output.arguments {
                        self.append_message(argument, &sender);
                    }
                }
                Err(e) => return self.fail(e),
            }
        }

        self.set_state(SessionState::Ready);
        Outcome::Completed
    }

    /// Analyze `argument` from the point of view of `side`.
    pub async fn analyze(
        &mut self,
        flows: &DebateFlows,
        argument: &str,
        side: Stance,
        cancel: &CancellationToken,
    ) -> Outcome {
        let topic = match self.topic.clone() {
            Some(topic) if self.state == SessionState::Ready => topic,
            _ => return self.notify(Notice::no_debate()),
        };

        let input = match AnalyzeWeaknessesInput::new(topic, argument, side) {
            Ok(input) => input,
            Err(e) => return self.fail(e),
        };

        self.set_state(SessionState::AwaitingAnalysis);
        match with_cancel(cancel, flows.analyze_weaknesses(&input)).await {
            Ok(result) => {
                let sender = self.senders.analyst.clone();
                self.append_message(format_analysis(&result), &sender);
                self.set_state(SessionState::Ready);
                Outcome::Completed
            }
            Err(e) => self.fail(e),
        }
    }

    /// Analyze the `index`th displayed argument of `stance`.
    ///
    /// The analysis is requested from the opposing side, the way a debater
    /// would probe the other team's case.
    pub async fn analyze_displayed(
        &mut self,
        flows: &DebateFlows,
        stance: Stance,
        index: usize,
        cancel: &CancellationToken,
    ) -> Outcome {
        let Some(argument) = self.arguments(stance).get(index).cloned() else {
            let shown = self.arguments(stance).len();
            if shown == 0 {
                return self.notify(Notice::no_debate());
            }
            return self.notify(Notice::new(
                "No such argument",
                format!(
                    "There are {} {} arguments; pick a number from 1 to {}.",
                    shown,
                    stance.as_str(),
                    shown
                ),
            ));
        };
        self.analyze(flows, &argument, stance.opposite(), cancel).await
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn arguments(&self, stance: Stance) -> &[String] {
        match stance {
            Stance::Pro => &self.pro_arguments,
            Stance::Con => &self.con_arguments,
        }
    }

    /// Get the full transcript.
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn last_notice(&self) -> Option<&Notice> {
        self.last_notice.as_ref()
    }

    fn replace_arguments(&mut self, stance: Stance, arguments: Vec<String>) {
        match stance {
            Stance::Pro => self.pro_arguments = arguments.clone(),
            Stance::Con => self.con_arguments = arguments.clone(),
        }
        self.emit_event(SessionEvent::ArgumentsReplaced { stance, arguments });
    }

    fn append_message(&mut self, text: String, sender: &str) {
        let message = ChatMessage {
            text,
            sender: sender.to_string(),
        };
        self.transcript.push(message.clone());
        self.emit_event(SessionEvent::MessageAppended(message));
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            self.state = state;
            self.emit_event(SessionEvent::StateChanged(state));
        }
    }

    /// Settle back to a stable state after an error and surface it.
    fn fail(&mut self, err: DebateError) -> Outcome {
        if err.is_recoverable() {
            warn!(error = %err, state = ?self.state, "request failed");
        } else {
            error!(error = %err, state = ?self.state, "request failed; session cannot continue");
        }
        let settled = if self.pro_arguments.is_empty() && self.con_arguments.is_empty() {
            SessionState::Idle
        } else {
            SessionState::Ready
        };
        self.set_state(settled);
        self.notify(Notice::from_error(&err))
    }

    fn notify(&mut self, notice: Notice) -> Outcome {
        self.last_notice = Some(notice.clone());
        self.emit_event(SessionEvent::Notice(notice.clone()));
        Outcome::Noticed(notice)
    }

    /// Emit an event if a callback is registered.
    fn emit_event(&self, event: SessionEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }
}

/// Transcript text for an analysis result.
pub fn format_analysis(result: &AnalysisResult) -> String {
    format!(
        "Weaknesses: {}\nRebuttals: {}",
        result.weaknesses.join(", "),
        result.rebuttals.join(", ")
    )
}

async fn with_cancel<T>(
    cancel: &CancellationToken,
    request: impl Future<Output = Result<T, DebateError>>,
) -> Result<T, DebateError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DebateError::Cancelled),
        result = request => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PromptsConfig;
    use crate::provider::mock::{PendingProvider, ScriptedProvider};
    use std::sync::{Arc, Mutex};

    fn reply(json: &str) -> Result<String, DebateError> {
        Ok(json.to_string())
    }

    fn scripted(replies: Vec<Result<String, DebateError>>) -> (Arc<ScriptedProvider>, DebateFlows) {
        let provider = Arc::new(ScriptedProvider::new(replies));
        let flows = DebateFlows::new(provider.clone(), PromptsConfig::default());
        (provider, flows)
    }

    fn message(text: &str, sender: &str) -> ChatMessage {
        ChatMessage {
            text: text.to_string(),
            sender: sender.to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_topic_shows_notice_without_calls() {
        let (provider, flows) = scripted(vec![]);
        let mut session = DebateSession::default();

        let outcome = session
            .submit_topic(&flows, "   ", &CancellationToken::new())
            .await;

        assert_eq!(outcome, Outcome::Noticed(Notice::missing_topic()));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(provider.prompts().is_empty());
        assert!(session.transcript().is_empty());
        assert_eq!(session.topic(), None);
    }

    #[tokio::test]
    async fn test_submit_generates_pro_then_con() {
        let (provider, flows) = scripted(vec![
            reply(r#"{"arguments": ["A", "B"]}"#),
            reply(r#"{"arguments": ["C"]}"#),
        ]);
        let mut session = DebateSession::default();

        let outcome = session
            .submit_topic(&flows, "School uniforms", &CancellationToken::new())
            .await;

        assert!(outcome.is_completed());
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.topic(), Some("School uniforms"));
        assert_eq!(session.arguments(Stance::Pro), ["A", "B"]);
        assert_eq!(session.arguments(Stance::Con), ["C"]);
        assert_eq!(
            session.transcript(),
            [
                message("A", "Pro AI"),
                message("B", "Pro AI"),
                message("C", "Con AI"),
            ]
        );

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Stance: pro"));
        assert!(prompts[1].contains("Stance: con"));
    }

    #[tokio::test]
    async fn test_analyze_appends_analyst_message() {
        let (provider, flows) = scripted(vec![
            reply(r#"{"arguments": ["Uniforms reduce bullying"]}"#),
            reply(r#"{"arguments": ["Uniforms limit expression"]}"#),
            reply(r#"{"weaknesses": ["W1", "W2"], "rebuttals": ["R1"]}"#),
        ]);
        let cancel = CancellationToken::new();
        let mut session = DebateSession::default();
        let _ = session.submit_topic(&flows, "School uniforms", &cancel).await;

        let outcome = session
            .analyze(&flows, "Uniforms reduce bullying", Stance::Con, &cancel)
            .await;

        assert!(outcome.is_completed());
        assert_eq!(session.state(), SessionState::Ready);
        let last = session.transcript().last().unwrap();
        assert_eq!(last.sender, "AI Analyst");
        assert_eq!(last.text, "Weaknesses: W1, W2\nRebuttals: R1");

        let prompts = provider.prompts();
        assert!(prompts[2].contains("Side: con"));
        assert!(prompts[2].contains("Argument: Uniforms reduce bullying"));
    }

    #[tokio::test]
    async fn test_analyze_with_empty_lists() {
        let (_provider, flows) = scripted(vec![
            reply(r#"{"arguments": ["A"]}"#),
            reply(r#"{"arguments": ["B"]}"#),
            reply(r#"{"weaknesses": [], "rebuttals": []}"#),
        ]);
        let cancel = CancellationToken::new();
        let mut session = DebateSession::default();
        let _ = session.submit_topic(&flows, "School uniforms", &cancel).await;

        let _ = session.analyze(&flows, "A", Stance::Con, &cancel).await;

        let last = session.transcript().last().unwrap();
        assert!(last.text.contains("Weaknesses:"));
        assert!(last.text.contains("Rebuttals:"));
    }

    #[tokio::test]
    async fn test_resubmit_replaces_arguments_keeps_transcript() {
        let (_provider, flows) = scripted(vec![
            reply(r#"{"arguments": ["A", "B"]}"#),
            reply(r#"{"arguments": ["C"]}"#),
            reply(r#"{"arguments": ["D"]}"#),
            reply(r#"{"arguments": ["E", "F"]}"#),
        ]);
        let cancel = CancellationToken::new();
        let mut session = DebateSession::default();

        let _ = session.submit_topic(&flows, "School uniforms", &cancel).await;
        let _ = session.submit_topic(&flows, "Homework bans", &cancel).await;

        assert_eq!(session.topic(), Some("Homework bans"));
        assert_eq!(session.arguments(Stance::Pro), ["D"]);
        assert_eq!(session.arguments(Stance::Con), ["E", "F"]);
        let texts: Vec<&str> = session.transcript().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["A", "B", "C", "D", "E", "F"]);
    }

    #[tokio::test]
    async fn test_pro_failure_skips_con_and_surfaces_notice() {
        let (provider, flows) = scripted(vec![
            Err(DebateError::ModelError("timed out".to_string())),
            reply(r#"{"arguments": ["C"]}"#),
        ]);
        let mut session = DebateSession::default();

        let outcome = session
            .submit_topic(&flows, "School uniforms", &CancellationToken::new())
            .await;

        assert!(outcome.is_recoverable());
        match outcome {
            Outcome::Noticed(notice) => {
                assert_eq!(notice.title, "Model unavailable");
                assert!(notice.recoverable);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(provider.prompts().len(), 1);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.transcript().is_empty());
        assert!(session.last_notice().is_some());
    }

    #[tokio::test]
    async fn test_con_schema_mismatch_keeps_pro_arguments() {
        let (_provider, flows) = scripted(vec![
            reply(r#"{"arguments": ["A"]}"#),
            reply(r#"{"arguments": [1, 2]}"#),
        ]);
        let mut session = DebateSession::default();

        let outcome = session
            .submit_topic(&flows, "School uniforms", &CancellationToken::new())
            .await;

        assert!(!outcome.is_completed());
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.arguments(Stance::Pro), ["A"]);
        assert!(session.arguments(Stance::Con).is_empty());
        assert_eq!(
            session.last_notice().unwrap().title,
            "Unexpected model response"
        );
    }

    #[tokio::test]
    async fn test_analyze_before_topic_is_rejected() {
        let (provider, flows) = scripted(vec![]);
        let mut session = DebateSession::default();

        let outcome = session
            .analyze(&flows, "Anything", Stance::Pro, &CancellationToken::new())
            .await;

        assert_eq!(outcome, Outcome::Noticed(Notice::no_debate()));
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_failure_returns_to_ready() {
        let (_provider, flows) = scripted(vec![
            reply(r#"{"arguments": ["A"]}"#),
            reply(r#"{"arguments": ["B"]}"#),
            reply("I cannot answer that."),
        ]);
        let cancel = CancellationToken::new();
        let mut session = DebateSession::default();
        let _ = session.submit_topic(&flows, "School uniforms", &cancel).await;
        let before = session.transcript().len();

        let outcome = session.analyze(&flows, "A", Stance::Con, &cancel).await;

        assert!(!outcome.is_completed());
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.transcript().len(), before);
    }

    #[tokio::test]
    async fn test_analyze_displayed_uses_opposite_side() {
        let (provider, flows) = scripted(vec![
            reply(r#"{"arguments": ["A"]}"#),
            reply(r#"{"arguments": ["B"]}"#),
            reply(r#"{"weaknesses": ["w"], "rebuttals": ["r"]}"#),
        ]);
        let cancel = CancellationToken::new();
        let mut session = DebateSession::default();
        let _ = session.submit_topic(&flows, "School uniforms", &cancel).await;

        let missing = session
            .analyze_displayed(&flows, Stance::Con, 5, &cancel)
            .await;
        assert!(!missing.is_completed());

        let outcome = session
            .analyze_displayed(&flows, Stance::Con, 0, &cancel)
            .await;
        assert!(outcome.is_completed());
        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[2].contains("Side: pro"));
        assert!(prompts[2].contains("Argument: B"));
    }

    #[tokio::test]
    async fn test_cancelled_request_surfaces_notice() {
        let flows = DebateFlows::new(Arc::new(PendingProvider), PromptsConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut session = DebateSession::default();

        let outcome = session.submit_topic(&flows, "School uniforms", &cancel).await;

        assert_eq!(outcome, Outcome::Noticed(Notice::from_error(&DebateError::Cancelled)));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_events_follow_transitions() {
        let (_provider, flows) = scripted(vec![
            reply(r#"{"arguments": ["A"]}"#),
            reply(r#"{"arguments": ["B"]}"#),
        ]);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let mut session = DebateSession::default().with_callback(Box::new(move |event| {
            sink.lock().expect("lock poisoned").push(event);
        }));

        let _ = session
            .submit_topic(&flows, "School uniforms", &CancellationToken::new())
            .await;

        let events = events.lock().expect("lock poisoned").clone();
        let states: Vec<SessionState> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::StateChanged(s) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            [
                SessionState::AwaitingProArguments,
                SessionState::AwaitingConArguments,
                SessionState::Ready,
            ]
        );
        assert!(events.contains(&SessionEvent::MessageAppended(message("A", "Pro AI"))));
    }

    #[test]
    fn test_notice_carries_recoverability() {
        let fatal = Notice::from_error(&DebateError::ConfigError("bad template".into()));
        assert!(!fatal.recoverable);
        assert!(!Outcome::Noticed(fatal).is_recoverable());

        let transient = Notice::from_error(&DebateError::SchemaMismatchError {
            field: "arguments".into(),
            reason: "missing".into(),
        });
        assert!(transient.recoverable);
        assert!(Outcome::Completed.is_recoverable());
        assert!(Notice::missing_topic().recoverable);
    }

    #[test]
    fn test_format_analysis() {
        let result = AnalysisResult {
            weaknesses: vec!["a".into(), "b".into()],
            rebuttals: vec![],
        };
        assert_eq!(format_analysis(&result), "Weaknesses: a, b\nRebuttals: ");
    }
}
