use chrono::Duration;
use quiz_core::model::{
    Difficulty, FinalScore, Question, QuestionId, QuizDefinition, QuizError, QuizId,
    QuizSubmission, Score, UserId,
};
use quiz_core::time::fixed_now;
use storage::catalog::{builtin_catalog, ensure_catalog};
use storage::repository::{QuizCatalog, QuizCatalogWriter, QuizResultRepository, StorageError};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_quiz(id: u64, question_ids: &[u64]) -> (QuizDefinition, Vec<Question>) {
    let count = u32::try_from(question_ids.len()).unwrap();
    let quiz = QuizDefinition::new(QuizId::new(id), "Rust", Difficulty::Hard, count, 20)
        .unwrap()
        .with_description("Ownership and lifetimes");
    let questions = question_ids
        .iter()
        .map(|q| {
            Question::new(
                QuestionId::new(*q),
                format!("Question {q}"),
                vec!["move".into(), "copy".into(), "clone".into()],
                "move",
                "Rust",
            )
            .unwrap()
        })
        .collect();
    (quiz, questions)
}

fn submission(user: &UserId, correct: u32, days_ago: i64) -> QuizSubmission {
    QuizSubmission::new(
        user.clone(),
        FinalScore {
            quiz_id: QuizId::new(1),
            quiz_title: "Rust".into(),
            score: Score::new(correct, 5).unwrap(),
        },
        fixed_now() - Duration::days(days_ago),
    )
}

#[tokio::test]
async fn sqlite_catalog_roundtrip_keeps_question_order() {
    let repo = connect("memdb_catalog_roundtrip").await;
    let (quiz, questions) = build_quiz(7, &[30, 10, 20]);
    repo.upsert_quiz(&quiz, &questions).await.unwrap();

    let fetched = repo.lookup(quiz.id()).await.unwrap();
    assert_eq!(fetched, quiz);

    let ids: Vec<_> = repo
        .questions_for(quiz.id())
        .await
        .unwrap()
        .iter()
        .map(|q| q.id().value())
        .collect();
    assert_eq!(ids, vec![30, 10, 20]);
}

#[tokio::test]
async fn sqlite_upsert_replaces_question_list() {
    let repo = connect("memdb_catalog_replace").await;
    let (quiz, questions) = build_quiz(1, &[1, 2, 3]);
    repo.upsert_quiz(&quiz, &questions).await.unwrap();
    let (shorter, replacement) = build_quiz(1, &[4]);
    repo.upsert_quiz(&shorter, &replacement).await.unwrap();

    let ids: Vec<_> = repo
        .questions_for(quiz.id())
        .await
        .unwrap()
        .iter()
        .map(|q| q.id().value())
        .collect();
    assert_eq!(ids, vec![4]);
    assert_eq!(repo.lookup(quiz.id()).await.unwrap().question_count(), 1);
    assert_eq!(repo.list_quizzes().await.unwrap().len(), 1);
}

#[tokio::test]
async fn sqlite_upsert_rejects_question_count_mismatch() {
    let repo = connect("memdb_catalog_mismatch").await;
    let (quiz, questions) = build_quiz(2, &[1, 2, 3]);
    repo.upsert_quiz(&quiz, &questions).await.unwrap();

    let err = repo.upsert_quiz(&quiz, &questions[..2]).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::InvalidQuiz(QuizError::QuestionCountMismatch {
            expected: 3,
            found: 2
        })
    ));
    assert_eq!(repo.questions_for(quiz.id()).await.unwrap().len(), 3);
}

#[tokio::test]
async fn sqlite_file_database_uses_wal_journal() {
    let path = std::env::temp_dir().join(format!("quiz-wal-{}.sqlite3", std::process::id()));
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let repo = SqliteRepository::connect(&url).await.expect("connect");

    let mode: String = sqlx::query_scalar("PRAGMA journal_mode;")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");

    repo.pool().close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

#[tokio::test]
async fn sqlite_unknown_quiz_is_not_found() {
    let repo = connect("memdb_catalog_missing").await;
    assert!(matches!(
        repo.lookup(QuizId::new(404)).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        repo.questions_for(QuizId::new(404)).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_seeds_builtin_catalog_once() {
    let repo = connect("memdb_catalog_seed").await;
    let entries = builtin_catalog().unwrap();

    let first = ensure_catalog(&repo, &repo, &entries).await.unwrap();
    let second = ensure_catalog(&repo, &repo, &entries).await.unwrap();
    assert_eq!(first, entries.len());
    assert_eq!(second, 0);

    let quizzes = repo.list_quizzes().await.unwrap();
    assert_eq!(quizzes.len(), entries.len());
    assert_eq!(quizzes[0].title(), "JavaScript");
    assert_eq!(
        repo.questions_for(quizzes[0].id()).await.unwrap().len(),
        5
    );
}

#[tokio::test]
async fn sqlite_results_are_listed_newest_first_per_user() {
    let repo = connect("memdb_results_recent").await;
    let ada = UserId::new("ada@example.com").unwrap();
    let bob = UserId::new("bob@example.com").unwrap();

    repo.append_result(&submission(&ada, 1, 4)).await.unwrap();
    let newest = repo.append_result(&submission(&ada, 5, 0)).await.unwrap();
    repo.append_result(&submission(&ada, 3, 2)).await.unwrap();
    repo.append_result(&submission(&bob, 2, 0)).await.unwrap();

    let recent = repo.list_recent(&ada, 2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id(), newest);
    assert_eq!(recent[0].score().to_string(), "5/5");
    assert_eq!(recent[1].score().to_string(), "3/5");
    assert!(recent.iter().all(|r| r.user_id() == &ada));

    let stored = repo.get_result(newest).await.unwrap();
    assert_eq!(stored.completed_at(), fixed_now());
    assert!(matches!(
        repo.get_result(9_999).await,
        Err(StorageError::NotFound)
    ));
}
