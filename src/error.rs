use thiserror::Error;

/// Errors raised while translating a single statement.
///
/// None of these abort translation: the emitter records them as diagnostics,
/// leaves a marker comment in the generated source and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("`{keyword}` has no matching open block")]
    Structural { keyword: String },

    #[error("block opened by `{opener}` is never closed")]
    Unterminated { opener: String },

    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    #[error("unsupported operator `{0}`")]
    UnsupportedOperator(String),
}

impl TranslateError {
    pub fn structural(keyword: impl Into<String>) -> Self {
        Self::Structural { keyword: keyword.into() }
    }

    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::UnsupportedConstruct(what.into())
    }

    pub fn operator(op: impl Into<String>) -> Self {
        Self::UnsupportedOperator(op.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_single_line() {
        let errs = [
            TranslateError::structural("fi"),
            TranslateError::Unterminated { opener: "if [ -f x ]".into() },
            TranslateError::unsupported("ls -l"),
            TranslateError::operator("-x"),
        ];
        for e in errs {
            assert!(!e.to_string().contains('\n'), "{}", e);
        }
    }

    #[test]
    fn messages_name_the_offender() {
        assert_eq!(
            TranslateError::structural("done").to_string(),
            "`done` has no matching open block"
        );
        assert_eq!(TranslateError::operator("-x").to_string(), "unsupported operator `-x`");
        assert_eq!(
            TranslateError::unsupported("ls -l").to_string(),
            "unsupported construct: ls -l"
        );
    }
}
