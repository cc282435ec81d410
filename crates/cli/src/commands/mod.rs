pub mod chat;
pub mod compact;
pub mod onboard;
pub mod remind;
pub mod transcript;
