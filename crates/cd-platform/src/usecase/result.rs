//! Use Case Result Type
//!
//! Success is only constructed inside the crate, after the unit of work has
//! committed. Anything may construct a failure.

use super::error::UseCaseError;

pub enum UseCaseResult<T> {
    Success(T),
    Failure(UseCaseError),
}

impl<T> UseCaseResult<T> {
    pub fn failure(error: UseCaseError) -> Self {
        UseCaseResult::Failure(error)
    }

    pub(crate) fn success(value: T) -> Self {
        UseCaseResult::Success(value)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UseCaseResult::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, UseCaseResult::Failure(_))
    }

    pub fn map<U, F>(self, f: F) -> UseCaseResult<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            UseCaseResult::Success(v) => UseCaseResult::Success(f(v)),
            UseCaseResult::Failure(e) => UseCaseResult::Failure(e),
        }
    }

    pub fn into_result(self) -> Result<T, UseCaseError> {
        match self {
            UseCaseResult::Success(v) => Ok(v),
            UseCaseResult::Failure(e) => Err(e),
        }
    }
}

impl<T> From<UseCaseResult<T>> for Result<T, UseCaseError> {
    fn from(result: UseCaseResult<T>) -> Self {
        result.into_result()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for UseCaseResult<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UseCaseResult::Success(v) => f.debug_tuple("Success").field(v).finish(),
            UseCaseResult::Failure(e) => f.debug_tuple("Failure").field(e).finish(),
        }
    }
}

/// Early-return the failure of a `Result<T, E: Into<UseCaseError>>`.
#[macro_export]
macro_rules! try_use_case {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => return $crate::usecase::UseCaseResult::failure(err.into()),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_result() {
        let result: UseCaseResult<String> = UseCaseResult::success("ok".to_string());
        assert!(result.is_success());
        assert_eq!(result.into_result().unwrap(), "ok");
    }

    #[test]
    fn test_failure_result() {
        let result: UseCaseResult<String> =
            UseCaseResult::failure(UseCaseError::validation("CODE", "message"));
        assert!(result.is_failure());
        assert_eq!(result.into_result().unwrap_err().code(), "CODE");
    }

    #[test]
    fn test_map() {
        let result: UseCaseResult<i32> = UseCaseResult::success(21);
        assert_eq!(result.map(|v| v * 2).into_result().unwrap(), 42);
    }

    #[test]
    fn test_try_use_case_macro() {
        fn run(input: Result<i32, crate::PlatformError>) -> UseCaseResult<i32> {
            let value = crate::try_use_case!(input);
            UseCaseResult::success(value + 1)
        }

        assert_eq!(run(Ok(1)).into_result().unwrap(), 2);
        assert_eq!(
            run(Err(crate::PlatformError::validation("bad"))).into_result().unwrap_err().http_status_code(),
            400
        );
    }
}
