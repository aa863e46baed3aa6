use crate::domain::models::QuestionType;
use crate::domain::validation::{FieldErrors, NON_FIELD_ERRORS};
use serde::Deserialize;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct AnswerChoicePayload {
    pub question_choice_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnswerPayload {
    pub question_id: Option<Uuid>,
    pub answer_text: Option<String>,
    #[serde(default)]
    pub choices: Vec<AnswerChoicePayload>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponsePayload {
    pub answers: Option<Vec<AnswerPayload>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAnswer {
    pub question_id: Uuid,
    pub answer_text: String,
    pub choice_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewResponse {
    pub answers: Vec<NewAnswer>,
}

impl NewResponse {
    pub fn choice_count(&self) -> usize {
        self.answers.iter().map(|a| a.choice_ids.len()).sum()
    }
}

impl ResponsePayload {
    /// Shape checks that need no knowledge of the questionnaire.
    pub fn validate(self) -> Result<NewResponse, FieldErrors> {
        let mut errors = FieldErrors::new();
        let raw_answers = self.answers.unwrap_or_default();
        if raw_answers.is_empty() {
            errors.add("answers", "At least one answer is required.");
        }

        let mut answers = Vec::with_capacity(raw_answers.len());
        for (idx, a) in raw_answers.into_iter().enumerate() {
            let question_id = a.question_id.unwrap_or_else(|| {
                errors.add(format!("answers[{idx}].question_id"), "This field is required.");
                Uuid::nil()
            });
            let mut choice_ids = Vec::with_capacity(a.choices.len());
            for (c_idx, c) in a.choices.into_iter().enumerate() {
                match c.question_choice_id {
                    Some(id) if choice_ids.contains(&id) => errors.add(
                        format!("answers[{idx}].choices[{c_idx}].question_choice_id"),
                        "Choice selected more than once.",
                    ),
                    Some(id) => choice_ids.push(id),
                    None => errors.add(
                        format!("answers[{idx}].choices[{c_idx}].question_choice_id"),
                        "This field is required.",
                    ),
                }
            }
            answers.push(NewAnswer {
                question_id,
                answer_text: a.answer_text.map(|t| t.trim().to_string()).unwrap_or_default(),
                choice_ids,
            });
        }

        errors.into_result(NewResponse { answers })
    }
}

#[derive(Debug, Clone)]
pub struct SheetQuestion {
    pub id: Uuid,
    pub question_type: QuestionType,
    pub required: bool,
    pub choice_ids: Vec<Uuid>,
}

/// The questions of one questionnaire, used to check a submitted response.
#[derive(Debug, Clone, Default)]
pub struct AnswerSheet {
    pub questions: Vec<SheetQuestion>,
}

impl AnswerSheet {
    pub fn check(&self, response: &NewResponse) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut answered: HashSet<Uuid> = HashSet::new();

        for (idx, answer) in response.answers.iter().enumerate() {
            let Some(question) = self.questions.iter().find(|q| q.id == answer.question_id) else {
                errors.add(
                    format!("answers[{idx}].question_id"),
                    "Question does not belong to this questionnaire.",
                );
                continue;
            };
            if !answered.insert(question.id) {
                errors.add(format!("answers[{idx}].question_id"), "Question answered more than once.");
            }

            match question.question_type {
                QuestionType::Open if !answer.choice_ids.is_empty() => {
                    errors.add(format!("answers[{idx}].choices"), "Open questions do not accept choices.");
                }
                QuestionType::Logical | QuestionType::Dropdown if answer.choice_ids.len() > 1 => {
                    errors.add(format!("answers[{idx}].choices"), "Select at most one choice.");
                }
                _ => {}
            }

            for (c_idx, choice_id) in answer.choice_ids.iter().enumerate() {
                if !question.choice_ids.contains(choice_id) {
                    errors.add(
                        format!("answers[{idx}].choices[{c_idx}].question_choice_id"),
                        "Choice does not belong to this question.",
                    );
                }
            }

            if question.required && answer.answer_text.is_empty() && answer.choice_ids.is_empty() {
                errors.add(format!("answers[{idx}].answer_text"), "This question is required.");
            }
        }

        for question in self.questions.iter().filter(|q| q.required) {
            if !answered.contains(&question.id) {
                errors.add(NON_FIELD_ERRORS, format!("Question {} is required.", question.id));
            }
        }

        errors.into_result(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// Missing questionnaire, or the caller is not its assigned representative.
    #[error("questionnaire not found")]
    NotFound,
    #[error("response rejected")]
    Invalid(FieldErrors),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
