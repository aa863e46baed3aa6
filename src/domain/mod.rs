pub mod models;
pub mod month;
pub mod questionnaire;
pub mod response;
pub mod validation;
