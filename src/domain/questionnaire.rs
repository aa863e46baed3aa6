use crate::domain::models::QuestionType;
use crate::domain::validation::{required_text, FieldErrors};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

const MAX_TITLE_LEN: usize = 255;

#[derive(Debug, Default, Deserialize)]
pub struct ChoicePayload {
    pub value: Option<String>,
    pub order: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuestionPayload {
    pub question_type: Option<String>,
    pub question_text: Option<String>,
    pub required: Option<bool>,
    pub order: Option<i64>,
    #[serde(default)]
    pub choices: Vec<ChoicePayload>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuestionnairePayload {
    pub client_rep: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub due_at: Option<DateTime<Utc>>,
    pub questions: Option<Vec<QuestionPayload>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewChoice {
    pub value: String,
    pub order: i16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub question_type: QuestionType,
    pub question_text: String,
    pub required: bool,
    pub order: i16,
    pub choices: Vec<NewChoice>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestionnaire {
    pub client_rep: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub due_at: DateTime<Utc>,
    pub questions: Vec<NewQuestion>,
}

impl NewQuestionnaire {
    pub fn choice_count(&self) -> usize {
        self.questions.iter().map(|q| q.choices.len()).sum()
    }
}

pub fn parse_question_type(raw: &str) -> Option<QuestionType> {
    match raw {
        "OPEN" => Some(QuestionType::Open),
        "LOGICAL" => Some(QuestionType::Logical),
        "MULTIPLE_CHOICE" => Some(QuestionType::MultipleChoice),
        "DROPDOWN" => Some(QuestionType::Dropdown),
        _ => None,
    }
}

fn parse_order(errors: &mut FieldErrors, field: &str, raw: Option<i64>) -> i16 {
    match raw {
        None => {
            errors.add(field, "This field is required.");
            0
        }
        Some(v) if !(0..=i16::MAX as i64).contains(&v) => {
            errors.add(field, format!("Ensure this value is between 0 and {}.", i16::MAX));
            0
        }
        Some(v) => v as i16,
    }
}

impl QuestionnairePayload {
    pub fn validate(self) -> Result<NewQuestionnaire, FieldErrors> {
        let mut errors = FieldErrors::new();

        let client_rep = self.client_rep.unwrap_or_else(|| {
            errors.add("client_rep", "This field is required.");
            Uuid::nil()
        });
        let title = required_text(&mut errors, "title", self.title.as_deref(), Some(MAX_TITLE_LEN));
        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        let due_at = self.due_at.unwrap_or_else(|| {
            errors.add("due_at", "This field is required.");
            DateTime::<Utc>::MIN_UTC
        });

        let raw_questions = self.questions.unwrap_or_default();
        if raw_questions.is_empty() {
            errors.add("questions", "At least one question is required.");
        }

        let mut questions = Vec::with_capacity(raw_questions.len());
        for (idx, q) in raw_questions.into_iter().enumerate() {
            let prefix = format!("questions[{idx}]");
            let question_type = match q.question_type.as_deref().map(str::trim) {
                None | Some("") => {
                    errors.add(format!("{prefix}.question_type"), "This field is required.");
                    QuestionType::Open
                }
                Some(raw) => parse_question_type(raw).unwrap_or_else(|| {
                    errors.add(format!("{prefix}.question_type"), format!("\"{raw}\" is not a valid choice."));
                    QuestionType::Open
                }),
            };
            let question_text = required_text(
                &mut errors,
                &format!("{prefix}.question_text"),
                q.question_text.as_deref(),
                None,
            );
            let order = parse_order(&mut errors, &format!("{prefix}.order"), q.order);

            let mut choices = Vec::with_capacity(q.choices.len());
            for (c_idx, c) in q.choices.into_iter().enumerate() {
                let c_prefix = format!("{prefix}.choices[{c_idx}]");
                let value = required_text(&mut errors, &format!("{c_prefix}.value"), c.value.as_deref(), None);
                let order = parse_order(&mut errors, &format!("{c_prefix}.order"), c.order);
                choices.push(NewChoice { value, order });
            }

            questions.push(NewQuestion {
                question_type,
                question_text,
                required: q.required.unwrap_or(false),
                order,
                choices,
            });
        }

        errors.into_result(NewQuestionnaire {
            client_rep,
            title,
            description,
            is_active: self.is_active.unwrap_or(true),
            due_at,
            questions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> serde_json::Value {
        json!({
            "client_rep": Uuid::new_v4(),
            "title": "Sample title",
            "description": "Sample description",
            "due_at": "2022-07-12T18:30:45Z",
            "questions": [
                {"question_type": "OPEN", "question_text": "What is your name?", "required": true, "order": 1, "choices": []},
                {"question_type": "LOGICAL", "question_text": "True or False?", "required": true, "order": 2},
                {"question_type": "MULTIPLE_CHOICE", "question_text": "Select all which apply.", "required": false, "order": 3,
                 "choices": [{"value": "Option 1", "order": 1}, {"value": "Option 2", "order": 2}, {"value": "Option 3", "order": 3}]},
                {"question_type": "DROPDOWN", "question_text": "Which of the following?", "order": 4,
                 "choices": [{"value": "Option 1", "order": 1}, {"value": "Option 2", "order": 2}, {"value": "Option 3", "order": 3}]}
            ]
        })
    }

    #[test]
    fn test_valid_payload_preserves_order_and_required() {
        let payload: QuestionnairePayload = serde_json::from_value(sample_payload()).unwrap();
        let q = payload.validate().unwrap();

        assert_eq!(q.questions.len(), 4);
        assert_eq!(q.choice_count(), 6);
        assert!(q.is_active);
        let required: Vec<bool> = q.questions.iter().map(|q| q.required).collect();
        assert_eq!(required, vec![true, true, false, false]);
        let orders: Vec<i16> = q.questions.iter().map(|q| q.order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4]);
        assert_eq!(q.questions[3].question_type, QuestionType::Dropdown);
        assert_eq!(q.questions[2].choices[2], NewChoice { value: "Option 3".into(), order: 3 });
    }

    #[test]
    fn test_empty_question_list_rejected() {
        let mut value = sample_payload();
        value["questions"] = json!([]);
        let payload: QuestionnairePayload = serde_json::from_value(value).unwrap();

        let errors = payload.validate().unwrap_err();
        assert_eq!(errors.get("questions").unwrap(), ["At least one question is required."]);
    }

    #[test]
    fn test_missing_question_list_rejected() {
        let mut value = sample_payload();
        value.as_object_mut().unwrap().remove("questions");
        let payload: QuestionnairePayload = serde_json::from_value(value).unwrap();

        assert!(payload.validate().unwrap_err().contains("questions"));
    }

    #[test]
    fn test_nested_errors_are_keyed_by_position() {
        let mut value = sample_payload();
        value["questions"][1]["question_type"] = json!("ESSAY");
        value["questions"][2]["choices"][0]["value"] = json!("  ");
        value["questions"][3]["order"] = json!(-1);
        let payload: QuestionnairePayload = serde_json::from_value(value).unwrap();

        let errors = payload.validate().unwrap_err();
        assert!(errors.contains("questions[1].question_type"));
        assert!(errors.contains("questions[2].choices[0].value"));
        assert!(errors.contains("questions[3].order"));
        assert!(!errors.contains("questions"));
    }

    #[test]
    fn test_missing_top_level_fields() {
        let payload = QuestionnairePayload::default();
        let errors = payload.validate().unwrap_err();
        for field in ["client_rep", "title", "due_at", "questions"] {
            assert!(errors.contains(field), "{field}");
        }
    }

    #[test]
    fn test_blank_description_becomes_none() {
        let mut value = sample_payload();
        value["description"] = json!("   ");
        let payload: QuestionnairePayload = serde_json::from_value(value).unwrap();
        assert_eq!(payload.validate().unwrap().description, None);
    }
}
