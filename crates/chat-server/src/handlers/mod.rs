pub mod chat;
pub mod greeting;
