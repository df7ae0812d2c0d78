//! Generic, opaque error handling.
//!
//! Provides the error vocabulary used across the workspace: a boxed, source-chained
//! [`GenericError`] for fallible operations whose callers only ever report the failure, plus
//! helpers for constructing one and attaching context while propagating.

#![deny(warnings)]
#![deny(missing_docs)]

/// A generic, opaque error.
///
/// Carries a source chain and renders it on display. Used wherever the caller's only recourse is
/// reporting the failure rather than matching on its variants.
pub type GenericError = anyhow::Error;

/// Macro for constructing a generic, opaque error.
///
/// Accepts a string literal, a format string with arguments, or any value implementing `Debug`
/// and `Display`. If the given value implements `std::error::Error`, its source chain is carried
/// over into the resulting [`GenericError`].
#[macro_export]
macro_rules! generic_error {
    // Forwards to `anyhow::anyhow`. We wrap it in our own macro so that callers depend on this
    // crate's vocabulary rather than on `anyhow` directly.
    ($msg:literal $(,)?) => { $crate::_anyhow!($msg) };
    ($err:expr $(,)?) => { $crate::_anyhow!($err) };
    ($fmt:expr, $($arg:tt)*) => { $crate::_anyhow!($fmt, $($arg)*) };
}

use std::fmt::Display;

#[doc(hidden)]
pub use anyhow::anyhow as _anyhow;

pub(crate) mod private {
    pub trait Sealed {}

    impl<T, E> Sealed for Result<T, E> {}
}

/// Extension trait for attaching context to errors as they propagate.
///
/// Wraps `anyhow::Context` under a different set of method names so it can be brought into scope
/// alongside `snafu::ResultExt` without the extension methods colliding.
pub trait ErrorContext<T, E>: private::Sealed {
    /// Attaches the given context to the error value.
    fn error_context<C>(self, context: C) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static;

    /// Attaches context to the error value, evaluated lazily only when an error occurs.
    fn with_error_context<C, F>(self, f: F) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ErrorContext<T, E> for Result<T, E>
where
    Result<T, E>: anyhow::Context<T, E>,
{
    fn error_context<C>(self, context: C) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static,
    {
        <Self as anyhow::Context<T, E>>::context(self, context)
    }

    fn with_error_context<C, F>(self, context: F) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        <Self as anyhow::Context<T, E>>::with_context(self, context)
    }
}
