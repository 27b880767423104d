//! Runtime adapter around the pure `QuizSession` state machine.
//!
//! The controller performs the effects a transition asks for (countdown,
//! grace delay, background submission) and feeds their callbacks back through
//! a single channel, so every transition is applied from `&mut self` in the
//! order it was observed.

use std::sync::Arc;

use quiz_core::model::{Question, QuizId, QuizSubmission, SessionId, SubmissionStatus, UserId};
use quiz_core::{AnswerStatus, Clock, Effect, QuizSession, SessionEvent, SessionState, Transition};
use rand::seq::SliceRandom;
use storage::repository::{QuizCatalog, StorageError};
use tokio::sync::{mpsc, watch};

use crate::config::EngineConfig;
use crate::error::SessionError;
use crate::submitter::ResultSubmitter;
use crate::timer::{CountdownTimer, GraceDelay};

/// Callbacks routed back into the controller. Each one names the session it
/// was created for; anything aimed at a session that is no longer live is
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Tick {
        session_id: SessionId,
        generation: u64,
    },
    Advance {
        session_id: SessionId,
        generation: u64,
        question_index: usize,
    },
    SubmissionSettled {
        session_id: SessionId,
        status: SubmissionStatus,
    },
}

/// Read-only view of the live session for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub session_id: Option<SessionId>,
    pub quiz_id: Option<QuizId>,
    pub quiz_title: Option<String>,
    pub state: SessionState,
    pub question_index: usize,
    pub total: u32,
    pub question: Option<Question>,
    pub time_left_secs: u32,
    pub selected_answer: Option<String>,
    pub answer_status: Option<AnswerStatus>,
    pub score: u32,
    pub submission: SubmissionStatus,
}

impl SessionSnapshot {
    #[must_use]
    pub fn from_session(session: &QuizSession) -> Self {
        Self {
            session_id: session.id(),
            quiz_id: session.quiz().map(|q| q.id()),
            quiz_title: session.quiz().map(|q| q.title().to_string()),
            state: session.state(),
            question_index: session.current_index(),
            total: session.total(),
            question: session.current_question().cloned(),
            time_left_secs: session.time_left_secs(),
            selected_answer: session.selected_answer().map(str::to_string),
            answer_status: session.answer_status(),
            score: session.score(),
            submission: session.submission().clone(),
        }
    }

    /// One-based question number for display, `0` while idle.
    #[must_use]
    pub fn question_number(&self) -> usize {
        if self.question.is_some() {
            self.question_index + 1
        } else {
            0
        }
    }
}

/// Drives one quiz session at a time for a single user.
pub struct SessionController {
    catalog: Arc<dyn QuizCatalog>,
    submitter: Arc<dyn ResultSubmitter>,
    user_id: UserId,
    clock: Clock,
    shuffle_questions: bool,
    session: QuizSession,
    timer: CountdownTimer,
    grace: GraceDelay,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    events_rx: mpsc::UnboundedReceiver<EngineEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionController {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn QuizCatalog>,
        submitter: Arc<dyn ResultSubmitter>,
        user_id: UserId,
        clock: Clock,
        config: &EngineConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::default());
        Self {
            catalog,
            submitter,
            user_id,
            clock,
            shuffle_questions: false,
            session: QuizSession::new(),
            timer: CountdownTimer::new(config.tick),
            grace: GraceDelay::new(config.grace),
            events_tx,
            events_rx,
            snapshot_tx,
        }
    }

    #[must_use]
    pub fn with_shuffle_questions(mut self, shuffle_questions: bool) -> Self {
        self.shuffle_questions = shuffle_questions;
        self
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::from_session(&self.session)
    }

    /// Receiver that sees a fresh snapshot after every applied transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Load `quiz_id` from the catalog and begin a new session.
    ///
    /// A session that is still running is torn down first, but only once the
    /// catalog lookup has succeeded.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::CatalogNotFound` for an unknown quiz,
    /// `SessionError::NoQuestions` for a quiz without questions,
    /// `SessionError::QuestionCountMismatch` when the catalog holds a different
    /// number of questions than the quiz declares, or `SessionError::Storage`
    /// if the catalog cannot be read.
    pub async fn start(&mut self, quiz_id: QuizId) -> Result<SessionId, SessionError> {
        let not_found = |e: StorageError| match e {
            StorageError::NotFound => SessionError::CatalogNotFound(quiz_id),
            other => SessionError::Storage(other),
        };
        let quiz = self.catalog.lookup(quiz_id).await.map_err(not_found)?;
        let mut questions = self.catalog.questions_for(quiz_id).await.map_err(not_found)?;
        if questions.is_empty() {
            return Err(SessionError::NoQuestions(quiz_id));
        }
        let found = questions.len();
        quiz.check_question_count(found)
            .map_err(|_| SessionError::QuestionCountMismatch {
                quiz_id,
                expected: quiz.question_count(),
                found,
            })?;
        if self.shuffle_questions {
            questions.shuffle(&mut rand::rng());
        }

        if self.session.state() != SessionState::Idle {
            self.teardown();
        }

        let session_id = SessionId::new();
        let title = quiz.title().to_string();
        let transition = self.session.apply(SessionEvent::Start {
            session_id,
            quiz,
            questions,
        });
        if !self.finish(transition) {
            return Err(SessionError::NoQuestions(quiz_id));
        }

        tracing::info!(
            %session_id,
            %quiz_id,
            quiz = %title,
            questions = self.session.total(),
            "quiz session started"
        );
        Ok(session_id)
    }

    /// Answer the current question. Ignored unless a question is open.
    pub fn select_answer(&mut self, answer: impl Into<String>) -> bool {
        let transition = self.session.apply(SessionEvent::SelectAnswer(answer.into()));
        self.finish(transition)
    }

    /// Return a completed session to idle.
    pub fn restart(&mut self) -> bool {
        let transition = self.session.apply(SessionEvent::Restart);
        self.finish(transition)
    }

    /// Leave the current session, cancelling its countdown and any pending advance.
    pub fn abandon(&mut self) -> bool {
        let session_id = self.session.id();
        let abandoned = self.teardown();
        if abandoned {
            if let Some(session_id) = session_id {
                tracing::info!(%session_id, "quiz session abandoned");
            }
        }
        abandoned
    }

    /// Wait for the next internal event and apply it. Returns whether it
    /// changed the session; stale events return `false`.
    ///
    /// Cancel-safe: dropping the future before it resolves loses no event.
    pub async fn pump(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => self.handle_event(event),
            None => false,
        }
    }

    /// Apply every event that is already queued, without waiting.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            if self.handle_event(event) {
                applied += 1;
            }
        }
        applied
    }

    pub fn handle_event(&mut self, event: EngineEvent) -> bool {
        match event {
            EngineEvent::Tick {
                session_id,
                generation,
            } => {
                if !self.is_live(session_id) || !self.timer.is_current(generation) {
                    tracing::debug!(%session_id, generation, "dropping stale tick");
                    return false;
                }
                let transition = self.session.apply(SessionEvent::Tick);
                self.finish(transition)
            }
            EngineEvent::Advance {
                session_id,
                generation,
                question_index,
            } => {
                if !self.is_live(session_id)
                    || !self.grace.is_current(generation)
                    || question_index != self.session.current_index()
                {
                    tracing::debug!(%session_id, question_index, "dropping stale advance");
                    return false;
                }
                let transition = self.session.apply(SessionEvent::Advance);
                self.finish(transition)
            }
            EngineEvent::SubmissionSettled { session_id, status } => {
                if !self.is_live(session_id) {
                    tracing::debug!(%session_id, "dropping settlement for a closed session");
                    return false;
                }
                let recorded = self.session.record_submission(status);
                if recorded {
                    self.publish();
                }
                recorded
            }
        }
    }

    fn is_live(&self, session_id: SessionId) -> bool {
        self.session.id() == Some(session_id)
    }

    fn teardown(&mut self) -> bool {
        let transition = self.session.apply(SessionEvent::Abandon);
        self.finish(transition)
    }

    fn finish(&mut self, transition: Transition) -> bool {
        if !transition.applied {
            return false;
        }
        for effect in transition.effects {
            self.perform(effect);
        }
        self.publish();
        true
    }

    fn perform(&mut self, effect: Effect) {
        match effect {
            Effect::ArmTimer => self.arm_timer(),
            Effect::DisarmTimer => self.timer.disarm(),
            Effect::ScheduleAdvance => self.schedule_advance(),
            Effect::CancelAdvance => self.grace.cancel(),
            Effect::Submit(final_score) => self.submit(final_score),
        }
    }

    fn arm_timer(&mut self) {
        let Some(session_id) = self.session.id() else {
            return;
        };
        let tx = self.events_tx.clone();
        self.timer.arm(move |generation| {
            tx.send(EngineEvent::Tick {
                session_id,
                generation,
            })
            .is_ok()
        });
    }

    fn schedule_advance(&mut self) {
        let Some(session_id) = self.session.id() else {
            return;
        };
        let question_index = self.session.current_index();
        let tx = self.events_tx.clone();
        self.grace.schedule(move |generation| {
            let _ = tx.send(EngineEvent::Advance {
                session_id,
                generation,
                question_index,
            });
        });
    }

    fn submit(&mut self, final_score: quiz_core::model::FinalScore) {
        let Some(session_id) = self.session.id() else {
            return;
        };
        tracing::info!(
            %session_id,
            quiz_id = %final_score.quiz_id,
            score = final_score.score.correct(),
            total = final_score.score.total(),
            "quiz completed"
        );

        let submission = QuizSubmission::new(self.user_id.clone(), final_score, self.clock.now());
        let submitter = Arc::clone(&self.submitter);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let status = match submitter.submit(&submission).await {
                Ok(()) => {
                    tracing::info!(
                        %session_id,
                        quiz = %submission.quiz_title,
                        score = %submission.score,
                        "quiz result submitted"
                    );
                    SubmissionStatus::Succeeded
                }
                Err(e) => {
                    tracing::warn!(%session_id, error = %e, "quiz result submission failed");
                    SubmissionStatus::Failed(e.to_string())
                }
            };
            let _ = tx.send(EngineEvent::SubmissionSettled { session_id, status });
        });
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(SessionSnapshot::from_session(&self.session));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use quiz_core::model::{Difficulty, QuestionId, QuizDefinition};
    use quiz_core::time::fixed_clock;
    use storage::repository::{InMemoryRepository, QuizCatalogWriter};

    use crate::submitter::RepositorySubmitter;

    async fn controller() -> SessionController {
        let repo = InMemoryRepository::new();
        let quiz = QuizDefinition::new(QuizId::new(1), "Rust", Difficulty::Easy, 2, 3).unwrap();
        let questions: Vec<_> = (1..=2)
            .map(|id| {
                Question::new(
                    QuestionId::new(id),
                    format!("Q{id}"),
                    vec!["a".into(), "b".into()],
                    "a",
                    "Rust",
                )
                .unwrap()
            })
            .collect();
        repo.upsert_quiz(&quiz, &questions).await.unwrap();
        let repo = Arc::new(repo);
        SessionController::new(
            repo.clone(),
            Arc::new(RepositorySubmitter::new(repo)),
            UserId::new("ada@example.com").unwrap(),
            fixed_clock(),
            &EngineConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_follows_transitions() {
        let mut controller = controller().await;
        let mut snapshots = controller.subscribe();
        controller.start(QuizId::new(1)).await.unwrap();

        assert!(snapshots.has_changed().unwrap());
        let snapshot = snapshots.borrow_and_update().clone();
        assert_eq!(snapshot.state, SessionState::InProgress);
        assert_eq!(snapshot.question_number(), 1);
        assert_eq!(snapshot.time_left_secs, 3);
        assert_eq!(snapshot.quiz_title.as_deref(), Some("Rust"));

        assert!(controller.select_answer("a"));
        let snapshot = snapshots.borrow_and_update().clone();
        assert_eq!(snapshot.state, SessionState::Locked);
        assert_eq!(snapshot.answer_status, Some(AnswerStatus::Correct));
        assert_eq!(snapshot.score, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn foreign_session_events_are_dropped() {
        let mut controller = controller().await;
        controller.start(QuizId::new(1)).await.unwrap();

        let other = SessionId::new();
        assert!(!controller.handle_event(EngineEvent::Tick {
            session_id: other,
            generation: 1,
        }));
        assert!(!controller.handle_event(EngineEvent::SubmissionSettled {
            session_id: other,
            status: SubmissionStatus::Succeeded,
        }));
        assert_eq!(controller.session().time_left_secs(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn advance_for_another_question_is_dropped() {
        let mut controller = controller().await;
        let session_id = controller.start(QuizId::new(1)).await.unwrap();
        controller.select_answer("b");

        assert!(!controller.handle_event(EngineEvent::Advance {
            session_id,
            generation: 1,
            question_index: 1,
        }));
        assert_eq!(controller.session().state(), SessionState::Locked);

        tokio::time::sleep(Duration::from_millis(1_600)).await;
        assert_eq!(controller.drain(), 1);
        assert_eq!(controller.session().current_index(), 1);
        assert_eq!(controller.session().state(), SessionState::InProgress);
    }
}
