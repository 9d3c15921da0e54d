use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomError {
    #[error("unknown node handle")]
    DeadNode,

    #[error("node is not an element")]
    NotAnElement,

    #[error("node is not a text node")]
    NotText,

    #[error("node has no parent")]
    Detached,

    #[error("insertion would create a cycle")]
    Cycle,

    #[error("parse error at byte {offset}: {message}")]
    Parse { message: String, offset: usize },
}

pub type DomResult<T> = Result<T, DomError>;
