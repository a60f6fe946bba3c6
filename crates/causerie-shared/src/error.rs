use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Conversation key has no '{sep}' separator: {value}")]
    MissingSeparator { sep: &'static str, value: String },

    #[error("Conversation key names an empty participant: {0}")]
    EmptyParticipant(String),
}
