//! Logging of failed results at the point where they are propagated.

use std::fmt::Display;

/// Adds [`log`](ResultExt::log) to any `Result` whose error is printable.
pub trait ResultExt<T, E> {
    /// Emit an error event carrying `context` and the caller's location if
    /// this is an `Err`, then hand the result back unchanged.
    ///
    /// ```ignore
    /// let doc = store.get(id).await.log("loading execution")?;
    /// ```
    fn log<S: Display>(self, context: S) -> Result<T, E>;
}

impl<T, E: Display> ResultExt<T, E> for Result<T, E> {
    #[track_caller]
    fn log<S: Display>(self, context: S) -> Result<T, E> {
        if let Err(ref e) = self {
            let location = std::panic::Location::caller();
            tracing::error!(
                target: "fpl_indexer",
                error = %e,
                context = %context,
                location = %format_args!("{}:{}", location.file(), location.line()),
                "Operation failed"
            );
        }
        self
    }
}
