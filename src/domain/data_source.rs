// Data source capability - anything that can be asked for a widget value
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Produces the current value for a widget.
///
/// Implementations may resolve immediately or suspend; the widget awaits
/// both the same way. They are called repeatedly on a timer, so `fetch`
/// must be safe to invoke any number of times.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self) -> anyhow::Result<Value>;
}

/// Synchronous closure source. See [`from_fn`].
pub struct FnSource<F> {
    f: F,
}

#[async_trait]
impl<F, T> DataSource for FnSource<F>
where
    F: Fn() -> anyhow::Result<T> + Send + Sync,
    T: Serialize + 'static,
{
    async fn fetch(&self) -> anyhow::Result<Value> {
        let value = (self.f)()?;
        Ok(serde_json::to_value(value)?)
    }
}

/// Closure source returning a future. See [`from_async`].
pub struct AsyncFnSource<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, T> DataSource for AsyncFnSource<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Serialize + 'static,
{
    async fn fetch(&self) -> anyhow::Result<Value> {
        let value = (self.f)().await?;
        Ok(serde_json::to_value(value)?)
    }
}

/// Fixed value, returned as-is on every fetch.
#[derive(Debug, Clone)]
pub struct ConstantSource(Value);

#[async_trait]
impl DataSource for ConstantSource {
    async fn fetch(&self) -> anyhow::Result<Value> {
        Ok(self.0.clone())
    }
}

pub fn from_fn<F, T>(f: F) -> Arc<dyn DataSource>
where
    F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    T: Serialize + 'static,
{
    Arc::new(FnSource { f })
}

pub fn from_async<F, Fut, T>(f: F) -> Arc<dyn DataSource>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Serialize + 'static,
{
    Arc::new(AsyncFnSource { f })
}

pub fn constant(value: impl Into<Value>) -> Arc<dyn DataSource> {
    Arc::new(ConstantSource(value.into()))
}
