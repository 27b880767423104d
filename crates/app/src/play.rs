//! Terminal front end for a quiz session.

use std::error::Error;
use std::fmt::Write as _;
use std::time::Duration;

use quiz_core::model::{Question, QuizDefinition, QuizId, SessionId, SubmissionStatus, UserId};
use quiz_core::{AnswerRecord, QuizSession, SessionState};
use services::{QuizHistoryItem, QuizServices, SessionController};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

const WARNING_SECS: u32 = 5;
const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

type Input = Lines<BufReader<Stdin>>;

/// Play `quiz_id` (or a quiz picked interactively) until the user declines a replay.
pub async fn run(
    services: &QuizServices,
    user: UserId,
    quiz_id: Option<QuizId>,
    shuffle: bool,
) -> Result<(), Box<dyn Error>> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let quiz_id = match quiz_id {
        Some(id) => id,
        None => match choose_quiz(services, &mut input).await? {
            Some(id) => id,
            None => return Ok(()),
        },
    };

    let mut controller = services
        .controller(user.clone())
        .with_shuffle_questions(shuffle);
    loop {
        controller.start(quiz_id).await?;
        if !play_session(&mut controller, &mut input).await? {
            return Ok(());
        }
        report_submission(&mut controller, services, &user).await;

        println!("Play again? [y/N]");
        let again = input
            .next_line()
            .await?
            .is_some_and(|line| matches!(line.trim(), "y" | "Y" | "yes"));
        if !again {
            return Ok(());
        }
        controller.restart();
    }
}

async fn choose_quiz(
    services: &QuizServices,
    input: &mut Input,
) -> Result<Option<QuizId>, Box<dyn Error>> {
    let quizzes = services.list_quizzes().await?;
    print!("{}", render_quiz_list(&quizzes));
    loop {
        println!("Pick a quiz id (or q to quit):");
        let Some(line) = input.next_line().await? else {
            return Ok(None);
        };
        let line = line.trim();
        if matches!(line, "q" | "quit") {
            return Ok(None);
        }
        match line.parse::<QuizId>() {
            Ok(id) if quizzes.iter().any(|q| q.id() == id) => return Ok(Some(id)),
            _ => println!("No quiz with id {line:?}."),
        }
    }
}

/// Returns `false` if the user left before the quiz finished.
async fn play_session(
    controller: &mut SessionController,
    input: &mut Input,
) -> Result<bool, Box<dyn Error>> {
    let mut view = SessionView::default();
    print_lines(view.update(controller.session()));

    while !controller.session().is_complete() {
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else {
                    controller.abandon();
                    return Ok(false);
                };
                let line = line.trim();
                if matches!(line, "q" | "quit") {
                    controller.abandon();
                    println!("Quiz abandoned.");
                    return Ok(false);
                }
                let answer = controller
                    .session()
                    .current_question()
                    .and_then(|question| parse_answer(line, question));
                match answer {
                    Some(answer) => {
                        if !controller.select_answer(answer) {
                            println!("Answer already locked in.");
                        }
                    }
                    None => println!("Enter an option number or its text."),
                }
            }
            _ = controller.pump() => {}
        }
        print_lines(view.update(controller.session()));
    }

    println!("{}", render_final(controller.session()));
    Ok(true)
}

async fn report_submission(
    controller: &mut SessionController,
    services: &QuizServices,
    user: &UserId,
) {
    let settled = tokio::time::timeout(SETTLE_TIMEOUT, async {
        while !controller.session().submission().is_settled() {
            controller.pump().await;
        }
    })
    .await
    .is_ok();

    match controller.session().submission() {
        SubmissionStatus::Succeeded => {
            println!("Result saved.");
            match services.recent_history(user).await {
                Ok(items) => print!("{}", render_history(&items)),
                Err(e) => tracing::warn!(error = %e, "could not refresh quiz history"),
            }
        }
        SubmissionStatus::Failed(reason) => println!("Could not save result: {reason}"),
        SubmissionStatus::NotAttempted | SubmissionStatus::Pending => {
            if !settled {
                println!("Result is still being saved.");
            }
        }
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

//
// ─── RENDERING ─────────────────────────────────────────────────────────────────
//

/// Tracks what has already been printed so each update only emits new lines.
#[derive(Debug, Default)]
struct SessionView {
    question: Option<(SessionId, usize)>,
    answers_seen: usize,
    warned_at: Option<u32>,
}

impl SessionView {
    fn update(&mut self, session: &QuizSession) -> Vec<String> {
        let mut lines = Vec::new();

        let answers = session.answers();
        for record in answers.iter().skip(self.answers_seen) {
            lines.push(feedback_line(record, session.questions()));
        }
        self.answers_seen = answers.len();

        if let (Some(id), Some(question)) = (session.id(), session.current_question()) {
            let key = (id, session.current_index());
            if self.question != Some(key) {
                self.question = Some(key);
                self.warned_at = None;
                lines.push(render_question(
                    session.current_index(),
                    session.total(),
                    question,
                    session.time_left_secs(),
                ));
            }
        }

        let left = session.time_left_secs();
        if session.state() == SessionState::InProgress
            && left <= WARNING_SECS
            && self.warned_at != Some(left)
        {
            self.warned_at = Some(left);
            lines.push(format!("  {left}s left"));
        }

        lines
    }
}

fn feedback_line(record: &AnswerRecord, questions: &[Question]) -> String {
    let correct = questions
        .iter()
        .find(|q| q.id() == record.question_id)
        .map_or("?", Question::correct_answer);
    if record.timed_out() {
        format!("Time's up! The answer was {correct}.")
    } else if record.correct {
        "Correct!".to_string()
    } else {
        format!("Incorrect. The answer was {correct}.")
    }
}

fn render_question(index: usize, total: u32, question: &Question, time_left: u32) -> String {
    let mut out = format!(
        "\nQuestion {}/{total} [{}] ({time_left}s)\n{}",
        index + 1,
        question.category(),
        question.text()
    );
    for (i, option) in question.options().iter().enumerate() {
        let _ = write!(out, "\n  {}) {option}", i + 1);
    }
    out
}

fn render_final(session: &QuizSession) -> String {
    let Some(score) = session.running_score() else {
        return String::new();
    };
    let mut out = format!("\nFinal score: {score} ({}%)", score.percent());
    if score.is_perfect() {
        out.push_str("\nPerfect score!");
    }
    out
}

/// Resolve an option number (1-based) or option text to the option itself.
fn parse_answer(input: &str, question: &Question) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(n) = input.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| question.options().get(i))
            .cloned();
    }
    question
        .options()
        .iter()
        .find(|option| option.eq_ignore_ascii_case(input))
        .cloned()
}

pub fn render_quiz_list(quizzes: &[QuizDefinition]) -> String {
    let mut out = String::new();
    for quiz in quizzes {
        let _ = writeln!(
            out,
            "{:>3}. {} [{}] {} questions, {}s each",
            quiz.id().value(),
            quiz.title(),
            quiz.difficulty(),
            quiz.question_count(),
            quiz.per_question_time_limit_secs()
        );
        if let Some(description) = quiz.description() {
            let _ = writeln!(out, "     {description}");
        }
    }
    out
}

pub fn render_history(items: &[QuizHistoryItem]) -> String {
    if items.is_empty() {
        return "No quizzes taken yet.\n".to_string();
    }
    let mut out = String::from("Recent quizzes:\n");
    for item in items {
        let _ = writeln!(
            out,
            "  {:<12} {:>5}  {}",
            item.title,
            item.score.to_string(),
            item.time_ago
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::SessionEvent;
    use quiz_core::model::{Difficulty, QuestionId, Score};

    fn question(id: u64) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Question {id}"),
            vec!["HashMap".into(), "Vec".into(), "BTreeMap".into()],
            "Vec",
            "Rust",
        )
        .unwrap()
    }

    fn started(limit: u32) -> QuizSession {
        let quiz = QuizDefinition::new(QuizId::new(1), "Rust", Difficulty::Easy, 2, limit).unwrap();
        let mut session = QuizSession::new();
        let _ = session.apply(SessionEvent::Start {
            session_id: SessionId::new(),
            quiz,
            questions: vec![question(1), question(2)],
        });
        session
    }

    #[test]
    fn parses_numbers_and_option_text() {
        let q = question(1);
        assert_eq!(parse_answer("2", &q).as_deref(), Some("Vec"));
        assert_eq!(parse_answer(" btreemap ", &q).as_deref(), Some("BTreeMap"));
        assert_eq!(parse_answer("0", &q), None);
        assert_eq!(parse_answer("4", &q), None);
        assert_eq!(parse_answer("Array", &q), None);
    }

    #[test]
    fn view_prints_question_once_then_feedback() {
        let mut session = started(30);
        let mut view = SessionView::default();

        let first = view.update(&session);
        assert_eq!(first.len(), 1);
        assert!(first[0].contains("Question 1/2 [Rust] (30s)"));
        assert!(first[0].contains("2) Vec"));
        assert!(view.update(&session).is_empty());

        let _ = session.apply(SessionEvent::SelectAnswer("HashMap".into()));
        assert_eq!(
            view.update(&session),
            vec!["Incorrect. The answer was Vec.".to_string()]
        );

        let _ = session.apply(SessionEvent::Advance);
        let lines = view.update(&session);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Question 2/2"));
    }

    #[test]
    fn view_warns_near_the_end_and_reports_timeouts() {
        let mut session = started(6);
        let mut view = SessionView::default();
        let _ = view.update(&session);

        let _ = session.apply(SessionEvent::Tick);
        assert_eq!(view.update(&session), vec!["  5s left".to_string()]);
        assert!(view.update(&session).is_empty());

        for _ in 0..5 {
            let _ = session.apply(SessionEvent::Tick);
        }
        let lines = view.update(&session);
        assert_eq!(lines[0], "Time's up! The answer was Vec.");
        assert!(lines[1].contains("Question 2/2"));
    }

    #[test]
    fn final_score_mentions_perfect_runs() {
        let mut session = started(30);
        for _ in 0..2 {
            let _ = session.apply(SessionEvent::SelectAnswer("Vec".into()));
            let _ = session.apply(SessionEvent::Advance);
        }
        assert_eq!(render_final(&session), "\nFinal score: 2/2 (100%)\nPerfect score!");
    }

    #[test]
    fn history_lists_rows_or_placeholder() {
        assert_eq!(render_history(&[]), "No quizzes taken yet.\n");
        let rendered = render_history(&[QuizHistoryItem {
            title: "SQL".into(),
            score: Score::new(3, 5).unwrap(),
            time_ago: "2 days ago".into(),
        }]);
        assert!(rendered.starts_with("Recent quizzes:\n"));
        assert!(rendered.contains("SQL"));
        assert!(rendered.contains("3/5"));
        assert!(rendered.contains("2 days ago"));
    }
}
