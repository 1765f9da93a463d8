use thiserror::Error;

use crate::index::IndexError;

/// Errors from parsing and running a search
#[derive(Error, Debug)]
pub enum SearchError {
    /// Every validation problem found in one pass, reported as a single
    /// aggregated message
    #[error("{}", .0.join(". "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl SearchError {
    pub fn validation_errors(&self) -> &[String] {
        match self {
            SearchError::Validation(errors) => errors,
            SearchError::Index(_) => &[],
        }
    }
}

pub type SearchResult<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_joined_with_full_stops() {
        let error = SearchError::Validation(vec![
            "\"beer\" is not a valid sort field".to_string(),
            "Unexpected parameters: froth".to_string(),
        ]);
        assert_eq!(
            error.to_string(),
            "\"beer\" is not a valid sort field. Unexpected parameters: froth"
        );
    }

    #[test]
    fn test_index_errors_pass_through() {
        let error = SearchError::from(IndexError::MissingScrollToken);
        assert!(error.validation_errors().is_empty());
        assert!(error.to_string().contains("cursor token"));
    }
}
