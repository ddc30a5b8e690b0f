//! Comment submission lifecycle
//!
//! `Idle → Validating → Submitting → {Accepted, Failed}`. Validation
//! failures go back to `Idle` without touching the network. `Accepted` is
//! terminal; `Failed` keeps the draft so it can be submitted again.

use thiserror::Error;

use super::form::{CommentDraft, FieldErrors};
use super::intake::CommentIntake;
use crate::config::AcceptancePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    Submitting,
    Accepted,
    Failed,
}

/// Submit attempts the flow refuses outright
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("a submission is already in flight")]
    InFlight,
    #[error("the comment was already submitted")]
    AlreadyAccepted,
}

/// One comment form and its submission state
#[derive(Debug, Clone)]
pub struct CommentFlow {
    draft: CommentDraft,
    errors: FieldErrors,
    state: SubmissionState,
    policy: AcceptancePolicy,
    failure: Option<String>,
}

impl CommentFlow {
    /// A blank form for a post
    pub fn new(post_id: impl Into<String>, policy: AcceptancePolicy) -> Self {
        Self::with_draft(CommentDraft::for_post(post_id), policy)
    }

    /// A form pre-filled with user input
    pub fn with_draft(draft: CommentDraft, policy: AcceptancePolicy) -> Self {
        Self {
            draft,
            errors: FieldErrors::default(),
            state: SubmissionState::Idle,
            policy,
            failure: None,
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn draft(&self) -> &CommentDraft {
        &self.draft
    }

    pub fn errors(&self) -> FieldErrors {
        self.errors
    }

    /// Why the last attempt failed, if it did
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// The form is replaced by the acknowledgment
    pub fn submitted(&self) -> bool {
        self.state == SubmissionState::Accepted
    }

    /// Validate and, when valid, hand the draft to `intake`
    ///
    /// Returns the state the flow settled in.
    pub async fn submit<I>(&mut self, intake: &I) -> Result<SubmissionState, SubmitError>
    where
        I: CommentIntake + ?Sized,
    {
        match self.state {
            SubmissionState::Submitting => return Err(SubmitError::InFlight),
            SubmissionState::Accepted => return Err(SubmitError::AlreadyAccepted),
            _ => {}
        }

        self.state = SubmissionState::Validating;
        self.failure = None;
        self.errors = self.draft.validate();
        if self.errors.any() {
            tracing::debug!("Comment form incomplete: {:?}", self.errors);
            self.state = SubmissionState::Idle;
            return Ok(self.state);
        }

        self.state = SubmissionState::Submitting;
        match intake.send(&self.draft).await {
            Ok(response) if self.policy == AcceptancePolicy::Transport || response.is_success() => {
                tracing::info!("Comment for post {} accepted", self.draft.post_id);
                self.draft = CommentDraft::for_post(std::mem::take(&mut self.draft.post_id));
                self.state = SubmissionState::Accepted;
            }
            Ok(response) => {
                tracing::warn!("Comment intake rejected the comment ({})", response.status);
                self.failure = Some(format!("intake answered {}", response.status));
                self.state = SubmissionState::Failed;
            }
            Err(e) => {
                tracing::warn!("{}", e);
                self.failure = Some(e.to_string());
                self.state = SubmissionState::Failed;
            }
        }

        Ok(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::intake::{IntakeError, IntakeResponse};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers every request the same way and counts them
    struct StubIntake {
        outcome: Result<u16, &'static str>,
        calls: AtomicUsize,
    }

    impl StubIntake {
        fn answering(status: u16) -> Self {
            Self {
                outcome: Ok(status),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                outcome: Err("connection reset"),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CommentIntake for StubIntake {
        async fn send(&self, _draft: &CommentDraft) -> Result<IntakeResponse, IntakeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Ok(status) => Ok(IntakeResponse { status }),
                Err(msg) => Err(IntakeError(msg.to_string())),
            }
        }
    }

    /// Never answers
    struct HangingIntake;

    #[async_trait]
    impl CommentIntake for HangingIntake {
        async fn send(&self, _draft: &CommentDraft) -> Result<IntakeResponse, IntakeError> {
            std::future::pending().await
        }
    }

    fn flow(name: &str, email: &str, comment: &str, policy: AcceptancePolicy) -> CommentFlow {
        CommentFlow::with_draft(
            CommentDraft {
                post_id: "post-1".to_string(),
                name: name.to_string(),
                email: email.to_string(),
                comment: comment.to_string(),
            },
            policy,
        )
    }

    #[tokio::test]
    async fn test_missing_name_blocks_network() {
        let intake = StubIntake::answering(200);
        let mut flow = flow("", "x@y.com", "nice", AcceptancePolicy::Status);

        let state = flow.submit(&intake).await.unwrap();
        assert_eq!(state, SubmissionState::Idle);
        assert_eq!(
            flow.errors(),
            FieldErrors {
                name_required: true,
                email_required: false,
                comment_required: false,
            }
        );
        assert_eq!(intake.calls(), 0);
        assert_eq!(flow.draft().email, "x@y.com");
    }

    #[tokio::test]
    async fn test_each_missing_field_sets_only_its_flag() {
        let cases = [
            (("", "e", "c"), (true, false, false)),
            (("n", "", "c"), (false, true, false)),
            (("n", "e", ""), (false, false, true)),
            (("", "", ""), (true, true, true)),
        ];
        for ((name, email, comment), (n, e, c)) in cases {
            let intake = StubIntake::answering(200);
            let mut flow = flow(name, email, comment, AcceptancePolicy::Status);
            flow.submit(&intake).await.unwrap();
            let errors = flow.errors();
            assert_eq!(
                (errors.name_required, errors.email_required, errors.comment_required),
                (n, e, c)
            );
            assert_eq!(intake.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_accepted_is_terminal() {
        let intake = StubIntake::answering(200);
        let mut flow = flow("Ada", "x@y.com", "nice", AcceptancePolicy::Status);

        assert_eq!(flow.submit(&intake).await.unwrap(), SubmissionState::Accepted);
        assert!(flow.submitted());
        assert_eq!(intake.calls(), 1);
        assert_eq!(flow.draft(), &CommentDraft::for_post("post-1"));

        assert_eq!(
            flow.submit(&intake).await,
            Err(SubmitError::AlreadyAccepted)
        );
        assert_eq!(intake.calls(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_keeps_fields() {
        let intake = StubIntake::failing();
        let mut flow = flow("Ada", "x@y.com", "nice", AcceptancePolicy::Transport);

        assert_eq!(flow.submit(&intake).await.unwrap(), SubmissionState::Failed);
        assert!(!flow.submitted());
        assert_eq!(flow.draft().name, "Ada");
        assert_eq!(flow.draft().comment, "nice");
        assert!(flow.failure().unwrap().contains("connection reset"));

        // Failed is not terminal
        let retry = StubIntake::answering(201);
        assert_eq!(flow.submit(&retry).await.unwrap(), SubmissionState::Accepted);
    }

    #[tokio::test]
    async fn test_acceptance_policy() {
        let intake = StubIntake::answering(500);

        let mut lenient = flow("Ada", "x@y.com", "nice", AcceptancePolicy::Transport);
        assert_eq!(lenient.submit(&intake).await.unwrap(), SubmissionState::Accepted);

        let mut strict = flow("Ada", "x@y.com", "nice", AcceptancePolicy::Status);
        assert_eq!(strict.submit(&intake).await.unwrap(), SubmissionState::Failed);
        assert_eq!(strict.failure(), Some("intake answered 500"));
    }

    #[tokio::test]
    async fn test_hung_request_blocks_second_submit() {
        let mut flow = flow("Ada", "x@y.com", "nice", AcceptancePolicy::Status);

        let attempt =
            tokio::time::timeout(Duration::from_millis(20), flow.submit(&HangingIntake)).await;
        assert!(attempt.is_err());
        assert_eq!(flow.state(), SubmissionState::Submitting);

        let intake = StubIntake::answering(200);
        assert_eq!(flow.submit(&intake).await, Err(SubmitError::InFlight));
        assert_eq!(intake.calls(), 0);
    }
}
