use thiserror::Error;

/// Registry-level skill errors. A skill whose completion call fails is not an
/// error here: it yields a `SkillResult` with `success == false`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkillError {
    #[error("unknown skill: {0}")]
    NotFound(String),

    #[error("skill id `{0}` is already registered")]
    DuplicateId(String),

    #[error("invalid skill `{id}`: {reason}")]
    InvalidDefinition { id: String, reason: String },
}

impl SkillError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound(_) => 13,
            Self::DuplicateId(_) | Self::InvalidDefinition { .. } => 11,
        }
    }
}
