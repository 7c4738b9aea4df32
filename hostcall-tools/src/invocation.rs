//! Bound arguments and the erased result of invoking a tool body.

use std::fmt;

use futures::future::LocalBoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{CallingConvention, ToolError, ToolResult};

/// Type-erased entry point generated for each tool.
pub type Invoker = fn(BoundArgs) -> ToolResult<Invocation>;

/// Ordered argument values produced by the binder.
///
/// Structured-input tools receive exactly one object; positional tools
/// receive one value per declared parameter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoundArgs {
    values: Vec<Value>,
}

impl BoundArgs {
    /// Wraps already bound values.
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Number of bound values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when no values are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the raw value at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Moves the value at `index` out and deserializes it into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArguments`] when the value does not fit `T`.
    pub fn take<T: DeserializeOwned>(&mut self, index: usize, name: &str) -> ToolResult<T> {
        let value = self.values.get_mut(index).map_or(Value::Null, Value::take);
        serde_json::from_value(value)
            .map_err(|err| ToolError::invalid_arguments(format!("argument `{name}`: {err}")))
    }

    /// Returns the underlying values.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// What a tool body handed back when it was called on the host thread.
///
/// Futures are polled on the host thread, so they need not be `Send`.
pub enum Invocation {
    /// Synchronous result.
    Complete(Value),
    /// Asynchronous result still being produced.
    Pending(LocalBoxFuture<'static, ToolResult<Value>>),
    /// Fire-and-forget body that already finished.
    Done,
    /// Fire-and-forget body with an outstanding continuation.
    Detached(LocalBoxFuture<'static, ToolResult<()>>),
}

impl Invocation {
    /// Calling convention this invocation corresponds to.
    #[must_use]
    pub const fn convention(&self) -> CallingConvention {
        match self {
            Self::Complete(_) => CallingConvention::Synchronous,
            Self::Pending(_) => CallingConvention::AsyncWithResult,
            Self::Done | Self::Detached(_) => CallingConvention::FireAndForget,
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete(value) => f.debug_tuple("Complete").field(value).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
            Self::Done => f.write_str("Done"),
            Self::Detached(_) => f.write_str("Detached(..)"),
        }
    }
}

/// Adapters used by `#[tool]` expansions to erase concrete return types.
pub(crate) mod support {
    use std::fmt::Display;
    use std::future::Future;

    use serde::Serialize;
    use serde_json::Value;

    use super::Invocation;
    use crate::{ToolError, ToolResult};

    fn encode<T: Serialize>(value: T) -> ToolResult<Value> {
        serde_json::to_value(value)
            .map_err(|err| ToolError::execution(format!("failed to encode tool output: {err}")))
    }

    fn failed<E: Display>(err: E) -> ToolError {
        ToolError::execution(err.to_string())
    }

    /// Serializes a parameter default declared with `#[arg(default = ..)]`.
    pub fn default_value<T: Serialize>(value: T) -> Option<Value> {
        serde_json::to_value(value).ok()
    }

    /// Synchronous infallible result.
    ///
    /// # Errors
    ///
    /// Fails when the value cannot be serialized.
    pub fn complete<T: Serialize>(value: T) -> ToolResult<Invocation> {
        encode(value).map(Invocation::Complete)
    }

    /// Synchronous fallible result.
    ///
    /// # Errors
    ///
    /// Propagates the tool's error or a serialization failure.
    pub fn complete_result<T: Serialize, E: Display>(
        result: Result<T, E>,
    ) -> ToolResult<Invocation> {
        result.map_err(failed).and_then(complete)
    }

    /// Fire-and-forget body that returned nothing.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other adapters.
    pub fn done(_: ()) -> ToolResult<Invocation> {
        Ok(Invocation::Done)
    }

    /// Fire-and-forget body that returned `Result<(), E>`.
    ///
    /// # Errors
    ///
    /// Propagates the tool's error.
    pub fn done_result<E: Display>(result: Result<(), E>) -> ToolResult<Invocation> {
        result.map(|()| Invocation::Done).map_err(failed)
    }

    /// Asynchronous infallible result.
    ///
    /// # Errors
    ///
    /// Never fails synchronously; encoding errors surface from the future.
    pub fn pending<F, T>(future: F) -> ToolResult<Invocation>
    where
        F: Future<Output = T> + 'static,
        T: Serialize,
    {
        Ok(Invocation::Pending(Box::pin(async move { encode(future.await) })))
    }

    /// Asynchronous fallible result.
    ///
    /// # Errors
    ///
    /// Never fails synchronously; tool errors surface from the future.
    pub fn pending_result<F, T, E>(future: F) -> ToolResult<Invocation>
    where
        F: Future<Output = Result<T, E>> + 'static,
        T: Serialize,
        E: Display,
    {
        Ok(Invocation::Pending(Box::pin(async move {
            future.await.map_err(failed).and_then(encode)
        })))
    }

    /// Fire-and-forget continuation that yields nothing.
    ///
    /// # Errors
    ///
    /// Never fails synchronously.
    pub fn detached<F>(future: F) -> ToolResult<Invocation>
    where
        F: Future<Output = ()> + 'static,
    {
        Ok(Invocation::Detached(Box::pin(async move {
            future.await;
            Ok(())
        })))
    }

    /// Fire-and-forget continuation that yields `Result<(), E>`.
    ///
    /// # Errors
    ///
    /// Never fails synchronously; tool errors surface from the future.
    pub fn detached_result<F, E>(future: F) -> ToolResult<Invocation>
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Display,
    {
        Ok(Invocation::Detached(Box::pin(async move {
            future.await.map_err(failed)
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::support::*;
    use super::*;

    #[test]
    fn take_deserializes_and_reports_argument_name() {
        let mut args = BoundArgs::new(vec![Value::from(2), Value::from("x")]);
        assert_eq!(args.take::<i64>(0, "a").expect("integer"), 2);

        let err = args.take::<i64>(1, "b").expect_err("string is not an integer");
        assert!(matches!(err, ToolError::InvalidArguments { ref reason } if reason.contains("`b`")));
    }

    #[test]
    fn missing_arguments_read_as_null() {
        let mut args = BoundArgs::default();
        assert_eq!(args.take::<Option<u8>>(3, "missing").expect("null"), None);
    }

    #[test]
    fn adapters_classify_results() {
        assert_eq!(
            complete(5).expect("ok").convention(),
            CallingConvention::Synchronous
        );
        assert!(matches!(done(()), Ok(Invocation::Done)));
        assert_eq!(
            complete_result::<u8, _>(Err("nope")).err(),
            Some(ToolError::execution("nope"))
        );
        assert_eq!(
            done_result(Err::<(), _>("boom")).map(|inv| inv.convention()),
            Err(ToolError::execution("boom"))
        );
    }

    #[tokio::test]
    async fn pending_adapters_encode_future_output() {
        let Ok(Invocation::Pending(future)) = pending(async { vec![1, 2] }) else {
            panic!("expected pending invocation");
        };
        assert_eq!(future.await, Ok(serde_json::json!([1, 2])));

        let Ok(Invocation::Detached(future)) =
            detached_result(async { Err::<(), _>("late failure") })
        else {
            panic!("expected detached invocation");
        };
        assert_eq!(future.await, Err(ToolError::execution("late failure")));
    }
}
