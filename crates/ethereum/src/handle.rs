//! Lazy handles for remote calls

use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use bindery_core::Result;

type Operation<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// A remote call that has not been executed yet.
///
/// Nothing touches the network until the handle is sent or awaited. Every
/// [`send`](CallHandle::send) starts a fresh network operation, and nothing is
/// retried on failure.
pub struct CallHandle<T> {
    label: Arc<str>,
    op: Operation<T>,
}

impl<T: Send + 'static> CallHandle<T> {
    pub fn new<F, Fut>(label: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            label: label.into(),
            op: Arc::new(move || f().boxed()),
        }
    }

    /// What this handle calls, e.g. `balanceOf(address)`
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Execute the call
    pub async fn send(&self) -> Result<T> {
        (self.op)().await
    }

    /// Transform the result once the call resolves
    pub fn map<U, M>(self, m: M) -> CallHandle<U>
    where
        U: Send + 'static,
        M: Fn(T) -> Result<U> + Send + Sync + 'static,
    {
        let op = self.op;
        let m = Arc::new(m);
        CallHandle {
            label: self.label,
            op: Arc::new(move || {
                let fut = op();
                let m = m.clone();
                async move { m(fut.await?) }.boxed()
            }),
        }
    }
}

impl<T> Clone for CallHandle<T> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            op: self.op.clone(),
        }
    }
}

impl<T> fmt::Debug for CallHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallHandle").field("label", &self.label).finish()
    }
}

impl<T: Send + 'static> IntoFuture for CallHandle<T> {
    type Output = Result<T>;
    type IntoFuture = BoxFuture<'static, Result<T>>;

    fn into_future(self) -> Self::IntoFuture {
        (self.op)()
    }
}
