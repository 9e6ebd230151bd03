//! # Result Shapes
//!
//! `Option` is presence, `Result` is fallibility. Worker replies combine both:
//!
//! ```text
//! AppResult<T> = Result<Option<T>, AppError>
//!
//!   Ok(Some(v))  → Success(Present(v))
//!   Ok(None)     → Success(Absent)
//!   Err(e)       → Failure(e)
//! ```
//!
//! JSON `null` never crosses a boundary as a value: [`success_json`] maps it to
//! the absent variant.

use serde_json::Value;

use crate::error::AppError;

/// Reply shape for every worker operation.
pub type AppResult<T = Value> = Result<Option<T>, AppError>;

/// Success carrying a present value.
pub fn success<T>(value: T) -> AppResult<T> {
    Ok(Some(value))
}

/// Success carrying a JSON value; `null` becomes absent.
pub fn success_json(value: Value) -> AppResult<Value> {
    if value.is_null() {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}

/// Success with nothing to return.
pub fn absent<T>() -> AppResult<T> {
    Ok(None)
}

/// Failure carrying `err`.
pub fn failure<T>(err: AppError) -> AppResult<T> {
    Err(err)
}

/// Unwrapping helpers for [`AppResult`].
pub trait AppResultExt<T> {
    /// Returns the present value, or a `NotFoundError` naming `context` when
    /// the success was absent.
    fn require_present(self, context: &str) -> Result<T, AppError>;
}

impl<T> AppResultExt<T> for AppResult<T> {
    fn require_present(self, context: &str) -> Result<T, AppError> {
        match self {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(AppError::not_found(format!(
                "Expected a value for {}, found none",
                context
            ))),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_success_json_maps_null_to_absent() {
        assert_eq!(success_json(json!(null)).unwrap(), None);
        assert_eq!(success_json(json!("v")).unwrap(), Some(json!("v")));
        assert_eq!(success_json(json!(0)).unwrap(), Some(json!(0)));
        assert_eq!(success_json(json!(false)).unwrap(), Some(json!(false)));
    }

    #[test]
    fn test_require_present() {
        assert_eq!(success(5).require_present("count").unwrap(), 5);

        let err = absent::<i32>().require_present("count").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(err.message.contains("count"));

        let err = failure::<i32>(AppError::cache("boom"))
            .require_present("count")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cache);
    }
}
