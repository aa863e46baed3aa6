use crate::domain::models::{QuestionChoice, QuestionRow, QuestionnaireDetail, QuestionnaireSummary};
use crate::domain::questionnaire::NewQuestionnaire;
use anyhow::Result;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const SUMMARY_COLUMNS: &str =
    "q.id, q.author, q.client_rep, q.title, q.description, q.is_active, q.due_at, q.created_at";

/// Which questionnaires a caller may see: those assigned to `client_rep`, plus
/// those authored by `sales_manager` or assigned to a representative of one of
/// their clients. `everything` lifts the restriction; the default matches nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuestionnaireScope {
    pub everything: bool,
    pub client_rep: Option<Uuid>,
    pub sales_manager: Option<Uuid>,
}

const SCOPE_FILTER: &str = r#"
    (
        $1::boolean
        OR q.client_rep = $2::uuid
        OR q.author = $3::uuid
        OR q.client_rep IN (
            SELECT c.client_rep FROM clients c
            WHERE c.sales_manager = $3::uuid AND c.client_rep IS NOT NULL
        )
    )
"#;

/// Inserts the questionnaire, its questions and their choices in one transaction.
pub async fn create_questionnaire(pool: &PgPool, author: Uuid, new: &NewQuestionnaire) -> Result<Uuid> {
    let mut tx = pool.begin().await?;
    let questionnaire_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO questionnaires (id, title, description, is_active, due_at, author, client_rep)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(questionnaire_id)
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.is_active)
    .bind(new.due_at)
    .bind(author)
    .bind(new.client_rep)
    .execute(&mut *tx)
    .await?;

    for question in &new.questions {
        let question_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO questions (id, questionnaire_id, question_type, question_text, required, "order")
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(question_id)
        .bind(questionnaire_id)
        .bind(question.question_type)
        .bind(&question.question_text)
        .bind(question.required)
        .bind(question.order)
        .execute(&mut *tx)
        .await?;

        if question.choices.is_empty() {
            continue;
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(r#"INSERT INTO question_choices (id, question_id, value, "order") "#);
        builder.push_values(&question.choices, |mut row, choice| {
            row.push_bind(Uuid::new_v4())
                .push_bind(question_id)
                .push_bind(choice.value.clone())
                .push_bind(choice.order);
        });
        builder.build().execute(&mut *tx).await?;
    }

    tx.commit().await?;

    tracing::info!(
        "Questionnaire created: id={}, author={}, client_rep={}, questions={}, choices={}",
        questionnaire_id,
        author,
        new.client_rep,
        new.questions.len(),
        new.choice_count()
    );

    Ok(questionnaire_id)
}

pub async fn find_summary(pool: &PgPool, id: Uuid) -> Result<Option<QuestionnaireSummary>> {
    let row = sqlx::query_as::<_, QuestionnaireSummary>(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM questionnaires q WHERE q.id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_visible_summary(
    pool: &PgPool,
    id: Uuid,
    scope: QuestionnaireScope,
) -> Result<Option<QuestionnaireSummary>> {
    let row = sqlx::query_as::<_, QuestionnaireSummary>(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM questionnaires q WHERE q.id = $4 AND {SCOPE_FILTER}"
    ))
    .bind(scope.everything)
    .bind(scope.client_rep)
    .bind(scope.sales_manager)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn count_visible(pool: &PgPool, scope: QuestionnaireScope) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM questionnaires q WHERE {SCOPE_FILTER}"
    ))
    .bind(scope.everything)
    .bind(scope.client_rep)
    .bind(scope.sales_manager)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn list_visible(
    pool: &PgPool,
    scope: QuestionnaireScope,
    limit: i64,
    offset: i64,
) -> Result<Vec<QuestionnaireSummary>> {
    let rows = sqlx::query_as::<_, QuestionnaireSummary>(&format!(
        r#"
        SELECT {SUMMARY_COLUMNS}
        FROM questionnaires q
        WHERE {SCOPE_FILTER}
        ORDER BY q.created_at DESC, q.id
        LIMIT $4 OFFSET $5
        "#
    ))
    .bind(scope.everything)
    .bind(scope.client_rep)
    .bind(scope.sales_manager)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn load_questions(pool: &PgPool, questionnaire_id: Uuid) -> Result<Vec<QuestionRow>> {
    let rows = sqlx::query_as::<_, QuestionRow>(
        r#"
        SELECT id, questionnaire_id, question_type, question_text, required, "order"
        FROM questions
        WHERE questionnaire_id = $1
        ORDER BY "order", id
        "#,
    )
    .bind(questionnaire_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn load_choices(pool: &PgPool, questionnaire_id: Uuid) -> Result<Vec<QuestionChoice>> {
    let rows = sqlx::query_as::<_, QuestionChoice>(
        r#"
        SELECT c.id, c.question_id, c.value, c."order"
        FROM question_choices c
        JOIN questions q ON q.id = c.question_id
        WHERE q.questionnaire_id = $1
        ORDER BY c."order", c.id
        "#,
    )
    .bind(questionnaire_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn load_detail(pool: &PgPool, summary: QuestionnaireSummary) -> Result<QuestionnaireDetail> {
    let questions = load_questions(pool, summary.id).await?;
    let choices = load_choices(pool, summary.id).await?;
    Ok(QuestionnaireDetail::assemble(summary, questions, choices))
}

pub async fn count_questions(pool: &PgPool, questionnaire_id: Uuid) -> Result<(i64, i64)> {
    let questions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE questionnaire_id = $1")
        .bind(questionnaire_id)
        .fetch_one(pool)
        .await?;
    let choices: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM question_choices c
        JOIN questions q ON q.id = c.question_id
        WHERE q.questionnaire_id = $1
        "#,
    )
    .bind(questionnaire_id)
    .fetch_one(pool)
    .await?;
    Ok((questions, choices))
}
