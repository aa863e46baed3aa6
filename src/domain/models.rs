use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const SALES_MANAGER_GROUP: &str = "Sales Managers";
pub const CLIENT_REP_GROUP: &str = "Corporate Client Representatives";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SalesManager,
    ClientRep,
}

impl Role {
    pub fn group_name(&self) -> &'static str {
        match self {
            Role::SalesManager => SALES_MANAGER_GROUP,
            Role::ClientRep => CLIENT_REP_GROUP,
        }
    }

    pub fn from_group_name(name: &str) -> Option<Role> {
        match name {
            SALES_MANAGER_GROUP => Some(Role::SalesManager),
            CLIENT_REP_GROUP => Some(Role::ClientRep),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "question_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    Open,
    Logical,
    MultipleChoice,
    Dropdown,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Client {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub client_rep: Option<Uuid>,
    pub sales_manager: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Questionnaire without its questions, as returned by list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct QuestionnaireSummary {
    pub id: Uuid,
    pub author: Option<Uuid>,
    pub client_rep: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub due_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct QuestionChoice {
    pub id: Uuid,
    #[serde(skip)]
    pub question_id: Uuid,
    pub value: String,
    pub order: i16,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct QuestionRow {
    pub id: Uuid,
    pub questionnaire_id: Uuid,
    pub question_type: QuestionType,
    pub question_text: String,
    pub required: bool,
    pub order: i16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: Uuid,
    pub question_type: QuestionType,
    pub question_text: String,
    pub order: i16,
    pub required: bool,
    pub choices: Vec<QuestionChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionnaireDetail {
    #[serde(flatten)]
    pub summary: QuestionnaireSummary,
    pub questions: Vec<Question>,
}

impl QuestionnaireDetail {
    /// Attaches choices to their questions, keeping the input ordering of both.
    pub fn assemble(
        summary: QuestionnaireSummary,
        questions: Vec<QuestionRow>,
        choices: Vec<QuestionChoice>,
    ) -> Self {
        let questions = questions
            .into_iter()
            .map(|q| Question {
                id: q.id,
                question_type: q.question_type,
                question_text: q.question_text,
                order: q.order,
                required: q.required,
                choices: choices.iter().filter(|c| c.question_id == q.id).cloned().collect(),
            })
            .collect();
        Self { summary, questions }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ResponseRow {
    pub id: Uuid,
    pub questionnaire_id: Uuid,
    pub respondent: Option<Uuid>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct AnswerRow {
    pub id: Uuid,
    pub response_id: Uuid,
    pub question_id: Uuid,
    pub answer_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct AnswerChoice {
    pub id: Uuid,
    #[serde(skip)]
    pub answer_id: Uuid,
    pub question_choice_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub id: Uuid,
    pub answer_text: String,
    pub question_id: Uuid,
    pub choices: Vec<AnswerChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseDetail {
    pub id: Uuid,
    pub respondent: Option<Uuid>,
    pub submitted_at: DateTime<Utc>,
    pub answers: Vec<Answer>,
}

impl ResponseDetail {
    pub fn assemble(response: ResponseRow, answers: Vec<AnswerRow>, choices: Vec<AnswerChoice>) -> Self {
        let answers = answers
            .into_iter()
            .map(|a| Answer {
                id: a.id,
                answer_text: a.answer_text,
                question_id: a.question_id,
                choices: choices.iter().filter(|c| c.answer_id == a.id).cloned().collect(),
            })
            .collect();
        Self {
            id: response.id,
            respondent: response.respondent,
            submitted_at: response.submitted_at,
            answers,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct MonthlyFeedback {
    pub id: Uuid,
    pub month: String,
    pub feedback: String,
    pub client_rep: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_group_names_round_trip() {
        for role in [Role::SalesManager, Role::ClientRep] {
            assert_eq!(Role::from_group_name(role.group_name()), Some(role));
        }
        assert_eq!(Role::from_group_name("Admins"), None);
    }

    #[test]
    fn test_question_type_wire_format() {
        let json = serde_json::to_string(&QuestionType::MultipleChoice).unwrap();
        assert_eq!(json, "\"MULTIPLE_CHOICE\"");
        let parsed: QuestionType = serde_json::from_str("\"DROPDOWN\"").unwrap();
        assert_eq!(parsed, QuestionType::Dropdown);
    }

    #[test]
    fn test_questionnaire_detail_groups_choices_by_question() {
        let now = Utc::now();
        let qn_id = Uuid::new_v4();
        let (q1, q2) = (Uuid::new_v4(), Uuid::new_v4());
        let summary = QuestionnaireSummary {
            id: qn_id,
            author: None,
            client_rep: None,
            title: "Quarterly review".into(),
            description: None,
            is_active: true,
            due_at: now,
            created_at: now,
        };
        let questions = vec![
            QuestionRow {
                id: q1,
                questionnaire_id: qn_id,
                question_type: QuestionType::Open,
                question_text: "Anything else?".into(),
                required: true,
                order: 1,
            },
            QuestionRow {
                id: q2,
                questionnaire_id: qn_id,
                question_type: QuestionType::Dropdown,
                question_text: "Pick one".into(),
                required: false,
                order: 2,
            },
        ];
        let choices = vec![
            QuestionChoice { id: Uuid::new_v4(), question_id: q2, value: "A".into(), order: 1 },
            QuestionChoice { id: Uuid::new_v4(), question_id: q2, value: "B".into(), order: 2 },
        ];

        let detail = QuestionnaireDetail::assemble(summary, questions, choices);

        assert_eq!(detail.questions.len(), 2);
        assert!(detail.questions[0].choices.is_empty());
        assert_eq!(detail.questions[1].choices.len(), 2);
        assert_eq!(detail.questions[1].choices[1].value, "B");

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["title"], "Quarterly review");
        assert!(json["questions"][1]["choices"][0].get("question_id").is_none());
    }
}
