//! Utility macros shared by the codec modules.

/// Returns early with `$error` unless `$predicate` holds.
///
/// Like `assert!`, but for validation that reports an error instead of
/// panicking.
///
/// ```ignore
/// ensure!(headers.len() <= MAX_HEADER_NUM, ParseError::too_many_headers(MAX_HEADER_NUM));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
