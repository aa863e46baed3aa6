pub mod mail;
pub mod outbox;
pub mod password;
