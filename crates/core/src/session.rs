//! Pure quiz session state machine.
//!
//! `QuizSession::apply` takes one event and returns the side effects the
//! runtime must perform (arm/disarm the countdown, schedule the post-answer
//! advance, submit the final score). Nothing here sleeps, spawns, or does I/O.

use crate::model::{
    FinalScore, Question, QuestionId, QuizDefinition, Score, SessionId, SubmissionStatus,
};

//
// ─── STATES, EVENTS, EFFECTS ───────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    InProgress,
    Locked,
    Completed,
}

/// Feedback for the answer chosen while the session is locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerStatus {
    Correct,
    Incorrect,
}

/// What happened to one question. `selected == None` means it timed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    pub selected: Option<String>,
    pub correct: bool,
}

impl AnswerRecord {
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.selected.is_none()
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Start {
        session_id: SessionId,
        quiz: QuizDefinition,
        questions: Vec<Question>,
    },
    Tick,
    SelectAnswer(String),
    Advance,
    Restart,
    Abandon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ArmTimer,
    DisarmTimer,
    ScheduleAdvance,
    CancelAdvance,
    Submit(FinalScore),
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[must_use]
pub struct Transition {
    pub applied: bool,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn ignored() -> Self {
        Self::default()
    }

    fn applied(effects: Vec<Effect>) -> Self {
        Self {
            applied: true,
            effects,
        }
    }

    /// The score handed to the submitter, if this transition completed the session.
    #[must_use]
    pub fn submission(&self) -> Option<&FinalScore> {
        self.effects.iter().find_map(|effect| match effect {
            Effect::Submit(score) => Some(score),
            _ => None,
        })
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One play-through of a quiz. `Default` is the idle session.
#[derive(Debug, Clone, Default)]
pub struct QuizSession {
    id: Option<SessionId>,
    quiz: Option<QuizDefinition>,
    questions: Vec<Question>,
    current_index: usize,
    time_left_secs: u32,
    selected_answer: Option<String>,
    answer_status: Option<AnswerStatus>,
    score: u32,
    answers: Vec<AnswerRecord>,
    state: SessionState,
    submission: SubmissionStatus,
    submit_emitted: bool,
}

impl QuizSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn id(&self) -> Option<SessionId> {
        self.id
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&QuizDefinition> {
        self.quiz.as_ref()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            SessionState::InProgress | SessionState::Locked => {
                self.questions.get(self.current_index)
            }
            SessionState::Idle | SessionState::Completed => None,
        }
    }

    #[must_use]
    pub fn time_left_secs(&self) -> u32 {
        self.time_left_secs
    }

    #[must_use]
    pub fn selected_answer(&self) -> Option<&str> {
        self.selected_answer.as_deref()
    }

    #[must_use]
    pub fn answer_status(&self) -> Option<AnswerStatus> {
        self.answer_status
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        u32::try_from(self.questions.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn submission(&self) -> &SubmissionStatus {
        &self.submission
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Completed
    }

    /// Score so far as `correct/total`, or `None` while idle.
    #[must_use]
    pub fn running_score(&self) -> Option<Score> {
        self.quiz
            .as_ref()
            .map(|_| Score::saturating(self.score, self.total()))
    }

    /// Apply one event. Events that are not valid in the current state are
    /// ignored: the session is left untouched and no effects are returned.
    pub fn apply(&mut self, event: SessionEvent) -> Transition {
        match event {
            SessionEvent::Start {
                session_id,
                quiz,
                questions,
            } => self.start(session_id, quiz, questions),
            SessionEvent::Tick => self.tick(),
            SessionEvent::SelectAnswer(answer) => self.select_answer(answer),
            SessionEvent::Advance => self.advance_from_locked(),
            SessionEvent::Restart => self.restart(),
            SessionEvent::Abandon => self.abandon(),
        }
    }

    /// Settle a pending submission. Only `Pending -> Succeeded | Failed` is accepted.
    pub fn record_submission(&mut self, status: SubmissionStatus) -> bool {
        if self.state != SessionState::Completed || self.submission != SubmissionStatus::Pending {
            return false;
        }
        match status {
            SubmissionStatus::Succeeded | SubmissionStatus::Failed(_) => {
                self.submission = status;
                true
            }
            SubmissionStatus::NotAttempted | SubmissionStatus::Pending => false,
        }
    }

    fn start(
        &mut self,
        session_id: SessionId,
        quiz: QuizDefinition,
        mut questions: Vec<Question>,
    ) -> Transition {
        if self.state != SessionState::Idle || questions.is_empty() {
            return Transition::ignored();
        }

        questions.truncate(usize::try_from(quiz.question_count()).unwrap_or(usize::MAX));
        let time_left_secs = quiz.per_question_time_limit_secs();

        *self = Self {
            id: Some(session_id),
            quiz: Some(quiz),
            questions,
            time_left_secs,
            state: SessionState::InProgress,
            ..Self::default()
        };

        Transition::applied(vec![Effect::ArmTimer])
    }

    fn tick(&mut self) -> Transition {
        if self.state != SessionState::InProgress {
            return Transition::ignored();
        }
        if self.time_left_secs > 1 {
            self.time_left_secs -= 1;
            return Transition::applied(Vec::new());
        }

        let Some(question_id) = self.questions.get(self.current_index).map(Question::id) else {
            return Transition::ignored();
        };
        self.time_left_secs = 0;
        self.answers.push(AnswerRecord {
            question_id,
            selected: None,
            correct: false,
        });

        Transition::applied(self.advance())
    }

    fn select_answer(&mut self, answer: String) -> Transition {
        if self.state != SessionState::InProgress {
            return Transition::ignored();
        }
        let Some(question) = self.questions.get(self.current_index) else {
            return Transition::ignored();
        };

        let correct = question.is_correct(&answer);
        let question_id = question.id();
        if correct {
            self.score = self.score.saturating_add(1).min(self.total());
        }

        self.answers.push(AnswerRecord {
            question_id,
            selected: Some(answer.clone()),
            correct,
        });
        self.selected_answer = Some(answer);
        self.answer_status = Some(if correct {
            AnswerStatus::Correct
        } else {
            AnswerStatus::Incorrect
        });
        self.state = SessionState::Locked;

        Transition::applied(vec![Effect::DisarmTimer, Effect::ScheduleAdvance])
    }

    fn advance_from_locked(&mut self) -> Transition {
        if self.state != SessionState::Locked {
            return Transition::ignored();
        }
        let mut effects = vec![Effect::CancelAdvance];
        effects.extend(self.advance());
        Transition::applied(effects)
    }

    /// Shared by the grace-delay path and the timeout path.
    fn advance(&mut self) -> Vec<Effect> {
        self.selected_answer = None;
        self.answer_status = None;

        let mut effects = vec![Effect::DisarmTimer];
        if self.current_index + 1 < self.questions.len() {
            self.current_index += 1;
            self.time_left_secs = self
                .quiz
                .as_ref()
                .map_or(0, QuizDefinition::per_question_time_limit_secs);
            self.state = SessionState::InProgress;
            effects.push(Effect::ArmTimer);
            return effects;
        }

        self.current_index = self.questions.len();
        self.state = SessionState::Completed;
        if !self.submit_emitted {
            if let Some(quiz) = &self.quiz {
                self.submit_emitted = true;
                self.submission = SubmissionStatus::Pending;
                effects.push(Effect::Submit(FinalScore {
                    quiz_id: quiz.id(),
                    quiz_title: quiz.title().to_string(),
                    score: Score::saturating(self.score, self.total()),
                }));
            }
        }
        effects
    }

    fn restart(&mut self) -> Transition {
        if self.state != SessionState::Completed {
            return Transition::ignored();
        }
        *self = Self::default();
        Transition::applied(vec![Effect::DisarmTimer, Effect::CancelAdvance])
    }

    fn abandon(&mut self) -> Transition {
        if self.state == SessionState::Idle {
            return Transition::ignored();
        }
        *self = Self::default();
        Transition::applied(vec![Effect::DisarmTimer, Effect::CancelAdvance])
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
