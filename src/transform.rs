//! Response transformer pipeline.
//!
//! Stages operate on an untyped [`serde_json::Value`] so that each one may
//! reshape the payload freely. The single typed conversion happens once the
//! whole pipeline has run, in [`FetchClient::execute`](crate::FetchClient::execute).

use std::{fmt, future::Future, marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{error::BoxError, FetchError, RawResponse, Result};

/// Outcome of a single stage.
pub type StageResult = std::result::Result<Value, BoxError>;

/// One stage of the response pipeline.
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Maps the current payload to the next one.
    async fn transform(&self, value: Value, response: &RawResponse) -> StageResult;
}

/// Synchronous closure stage.
pub struct FnTransformer<F>(F);

impl<F> FnTransformer<F> {
    pub fn new(f: F) -> Self
    where
        F: Fn(Value, &RawResponse) -> StageResult + Send + Sync,
    {
        Self(f)
    }
}

#[async_trait]
impl<F> Transformer for FnTransformer<F>
where
    F: Fn(Value, &RawResponse) -> StageResult + Send + Sync,
{
    async fn transform(&self, value: Value, response: &RawResponse) -> StageResult {
        (self.0)(value, response)
    }
}

/// Asynchronous closure stage. The closure receives an owned response
/// snapshot so its future can be `'static`.
pub struct AsyncFnTransformer<F>(F);

impl<F> AsyncFnTransformer<F> {
    pub fn new<Fut>(f: F) -> Self
    where
        F: Fn(Value, RawResponse) -> Fut + Send + Sync,
        Fut: Future<Output = StageResult> + Send,
    {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> Transformer for AsyncFnTransformer<F>
where
    F: Fn(Value, RawResponse) -> Fut + Send + Sync,
    Fut: Future<Output = StageResult> + Send + 'static,
{
    async fn transform(&self, value: Value, response: &RawResponse) -> StageResult {
        (self.0)(value, response.clone()).await
    }
}

/// Validate-or-fail stage that passes the payload through unchanged.
pub struct Validator<F, E>(F, PhantomData<fn() -> E>);

impl<F, E> Validator<F, E> {
    pub fn new(f: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<(), E> + Send + Sync,
        E: Into<BoxError>,
    {
        Self(f, PhantomData)
    }
}

#[async_trait]
impl<F, E> Transformer for Validator<F, E>
where
    F: Fn(&Value) -> std::result::Result<(), E> + Send + Sync,
    E: Into<BoxError>,
{
    async fn transform(&self, value: Value, _response: &RawResponse) -> StageResult {
        (self.0)(&value).map_err(Into::into)?;
        Ok(value)
    }
}

/// Schema stage: the payload must deserialize into `T`; the output is `T`
/// serialized back, so unknown fields dropped by `T` disappear.
pub struct Schema<T>(PhantomData<fn() -> T>);

impl<T> Schema<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Schema<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Transformer for Schema<T>
where
    T: DeserializeOwned + Serialize,
{
    async fn transform(&self, value: Value, _response: &RawResponse) -> StageResult {
        let typed: T = serde_json::from_value(value)?;
        Ok(serde_json::to_value(typed)?)
    }
}

/// Ordered list of transformer stages.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Transformer>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .finish()
    }
}

impl Pipeline {
    pub fn new(stages: Vec<Arc<dyn Transformer>>) -> Self {
        Self { stages }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs every stage in registration order, stopping at the first error.
    pub async fn run(&self, mut value: Value, response: &RawResponse) -> Result<Value> {
        for (stage, transformer) in self.stages.iter().enumerate() {
            value = transformer
                .transform(value, response)
                .await
                .map_err(|source| FetchError::Transform { stage, source })?;
        }
        Ok(value)
    }
}
