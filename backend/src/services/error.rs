/// Outcome category shared by every service error. Handlers turn this into
/// an HTTP status and a stable `error` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    Expired,
    InvalidInput,
    UpstreamFailure,
    Internal,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Expired => "expired",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::UpstreamFailure => "upstream_failure",
            ErrorKind::Internal => "internal_error",
        }
    }

    /// Classify a storage error. Constraint races surface as `Conflict`, and
    /// writes that reference a row deleted underneath them as `NotFound`.
    pub fn from_db(err: &sqlx::Error) -> Self {
        if crate::db::is_unique_violation(err) {
            ErrorKind::Conflict
        } else if crate::db::is_foreign_key_violation(err) {
            ErrorKind::NotFound
        } else {
            ErrorKind::Internal
        }
    }
}

pub trait ServiceError: std::error::Error {
    fn kind(&self) -> ErrorKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let kinds = [
            ErrorKind::Unauthenticated,
            ErrorKind::Forbidden,
            ErrorKind::NotFound,
            ErrorKind::Conflict,
            ErrorKind::Expired,
            ErrorKind::InvalidInput,
            ErrorKind::UpstreamFailure,
            ErrorKind::Internal,
        ];
        let mut codes: Vec<_> = kinds.iter().map(|k| k.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_non_constraint_db_error_is_internal() {
        assert_eq!(ErrorKind::from_db(&sqlx::Error::RowNotFound), ErrorKind::Internal);
    }
}
