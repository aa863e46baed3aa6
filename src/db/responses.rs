use crate::db::{outbox, DbUser};
use crate::domain::models::{AnswerChoice, AnswerRow, QuestionType, ResponseDetail, ResponseRow};
use crate::domain::response::{AnswerSheet, CollectError, NewResponse, SheetQuestion};
use crate::domain::validation::{FieldErrors, NON_FIELD_ERRORS};
use crate::services::mail::EmailMessage;
use anyhow::Result;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct TargetQuestionnaire {
    title: String,
    client_rep: Option<Uuid>,
    author_email: Option<String>,
    author_name: Option<String>,
}

#[derive(Debug, FromRow)]
struct SheetRow {
    id: Uuid,
    question_type: QuestionType,
    required: bool,
}

#[derive(Debug, FromRow)]
struct SheetChoiceRow {
    id: Uuid,
    question_id: Uuid,
}

async fn load_sheet(conn: &mut PgConnection, questionnaire_id: Uuid) -> Result<AnswerSheet, sqlx::Error> {
    let questions = sqlx::query_as::<_, SheetRow>(
        r#"SELECT id, question_type, required FROM questions WHERE questionnaire_id = $1 ORDER BY "order", id"#,
    )
    .bind(questionnaire_id)
    .fetch_all(&mut *conn)
    .await?;

    let choices = sqlx::query_as::<_, SheetChoiceRow>(
        r#"
        SELECT c.id, c.question_id
        FROM question_choices c
        JOIN questions q ON q.id = c.question_id
        WHERE q.questionnaire_id = $1
        "#,
    )
    .bind(questionnaire_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(AnswerSheet {
        questions: questions
            .into_iter()
            .map(|q| SheetQuestion {
                id: q.id,
                question_type: q.question_type,
                required: q.required,
                choice_ids: choices.iter().filter(|c| c.question_id == q.id).map(|c| c.id).collect(),
            })
            .collect(),
    })
}

/// Ids written by [`create_response`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredResponse {
    pub id: Uuid,
    /// Outbox row of the author notification, when the author has an email.
    pub alert: Option<Uuid>,
}

/// Stores a representative's response with all answers and selected choices in
/// one transaction, and queues the author notification in the same transaction.
///
/// The questionnaire row is locked for the duration so two submissions by the
/// same representative cannot both pass the duplicate check.
pub async fn create_response(
    pool: &PgPool,
    questionnaire_id: Uuid,
    respondent: &DbUser,
    new: &NewResponse,
) -> Result<StoredResponse, CollectError> {
    let mut tx = pool.begin().await?;

    let target = sqlx::query_as::<_, TargetQuestionnaire>(
        r#"
        SELECT q.title, q.client_rep, u.email AS author_email, u.name AS author_name
        FROM questionnaires q
        LEFT JOIN users u ON u.id = q.author
        WHERE q.id = $1
        FOR UPDATE OF q
        "#,
    )
    .bind(questionnaire_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(CollectError::NotFound)?;

    if target.client_rep != Some(respondent.id) {
        return Err(CollectError::NotFound);
    }

    let already_responded: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM responses WHERE questionnaire_id = $1 AND respondent = $2)",
    )
    .bind(questionnaire_id)
    .bind(respondent.id)
    .fetch_one(&mut *tx)
    .await?;
    if already_responded {
        return Err(CollectError::Invalid(FieldErrors::single(
            NON_FIELD_ERRORS,
            "You have already responded to this questionnaire.",
        )));
    }

    let sheet = load_sheet(&mut *tx, questionnaire_id).await?;
    sheet.check(new).map_err(CollectError::Invalid)?;

    let response_id = Uuid::new_v4();
    sqlx::query("INSERT INTO responses (id, questionnaire_id, respondent) VALUES ($1, $2, $3)")
        .bind(response_id)
        .bind(questionnaire_id)
        .bind(respondent.id)
        .execute(&mut *tx)
        .await?;

    for answer in &new.answers {
        let answer_id = Uuid::new_v4();
        sqlx::query("INSERT INTO answers (id, response_id, question_id, answer_text) VALUES ($1, $2, $3, $4)")
            .bind(answer_id)
            .bind(response_id)
            .bind(answer.question_id)
            .bind(&answer.answer_text)
            .execute(&mut *tx)
            .await?;

        if answer.choice_ids.is_empty() {
            continue;
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO answer_choices (id, answer_id, question_choice_id) ");
        builder.push_values(&answer.choice_ids, |mut row, choice_id| {
            row.push_bind(Uuid::new_v4()).push_bind(answer_id).push_bind(*choice_id);
        });
        builder.build().execute(&mut *tx).await?;
    }

    let alert = match &target.author_email {
        Some(email) => {
            let message = EmailMessage::response_alert(
                &target.title,
                target.author_name.as_deref().unwrap_or_default(),
                email,
                &respondent.name,
            );
            Some(outbox::enqueue(&mut *tx, &message).await?)
        }
        None => {
            tracing::warn!("Questionnaire {} has no author, skipping response alert", questionnaire_id);
            None
        }
    };

    tx.commit().await?;

    tracing::info!(
        "Response stored: id={}, questionnaire={}, respondent={}, answers={}, choices={}",
        response_id,
        questionnaire_id,
        respondent.id,
        new.answers.len(),
        new.choice_count()
    );

    Ok(StoredResponse { id: response_id, alert })
}

pub async fn count_responses(pool: &PgPool, questionnaire_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM responses WHERE questionnaire_id = $1")
        .bind(questionnaire_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn list_responses(
    pool: &PgPool,
    questionnaire_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<ResponseDetail>> {
    let rows = sqlx::query_as::<_, ResponseRow>(
        r#"
        SELECT id, questionnaire_id, respondent, submitted_at
        FROM responses
        WHERE questionnaire_id = $1
        ORDER BY submitted_at, id
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(questionnaire_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(load_detail(pool, row).await?);
    }
    Ok(out)
}

pub async fn find_detail(pool: &PgPool, response_id: Uuid) -> Result<Option<ResponseDetail>> {
    let row = sqlx::query_as::<_, ResponseRow>(
        "SELECT id, questionnaire_id, respondent, submitted_at FROM responses WHERE id = $1",
    )
    .bind(response_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(load_detail(pool, row).await?)),
        None => Ok(None),
    }
}

async fn load_detail(pool: &PgPool, row: ResponseRow) -> Result<ResponseDetail> {
    let answers = sqlx::query_as::<_, AnswerRow>(
        r#"
        SELECT a.id, a.response_id, a.question_id, a.answer_text
        FROM answers a
        JOIN questions q ON q.id = a.question_id
        WHERE a.response_id = $1
        ORDER BY q."order", a.id
        "#,
    )
    .bind(row.id)
    .fetch_all(pool)
    .await?;

    let choices = sqlx::query_as::<_, AnswerChoice>(
        r#"
        SELECT ac.id, ac.answer_id, ac.question_choice_id
        FROM answer_choices ac
        JOIN answers a ON a.id = ac.answer_id
        JOIN question_choices qc ON qc.id = ac.question_choice_id
        WHERE a.response_id = $1
        ORDER BY qc."order", ac.id
        "#,
    )
    .bind(row.id)
    .fetch_all(pool)
    .await?;

    Ok(ResponseDetail::assemble(row, answers, choices))
}

pub async fn count_answer_choices(pool: &PgPool, response_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM answer_choices ac
        JOIN answers a ON a.id = ac.answer_id
        WHERE a.response_id = $1
        "#,
    )
    .bind(response_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
