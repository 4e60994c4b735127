//! Ordered middleware execution.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use keystone_core::{PipelineError, RequestContext};

use crate::middleware::{BoxedMiddleware, Middleware};

/// An ordered list of middleware steps.
///
/// Steps run strictly in declaration order. Each one sees the context
/// assembled so far, including every earlier step's additions. The first
/// failure stops the chain.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    steps: Vec<BoxedMiddleware>,
}

impl MiddlewareChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    pub fn push<M: Middleware>(&mut self, middleware: M) {
        self.steps.push(Arc::new(middleware));
    }

    /// Appends a shared step.
    pub fn push_boxed(&mut self, middleware: BoxedMiddleware) {
        self.steps.push(middleware);
    }

    /// Appends a step, builder style.
    #[must_use]
    pub fn with<M: Middleware>(mut self, middleware: M) -> Self {
        self.push(middleware);
        self
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if there are no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns the step names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Runs every step and returns the final context.
    ///
    /// Errors and panics raised by a step are classified with
    /// [`PipelineError::from_raised`] and [`PipelineError::from_panic`];
    /// a key collision becomes [`PipelineError::Collision`].
    pub async fn run(&self, mut ctx: RequestContext) -> Result<RequestContext, PipelineError> {
        for step in &self.steps {
            let name = step.name();
            tracing::debug!(middleware = name, "running middleware");

            let outcome = AssertUnwindSafe(async { step.apply(&ctx).await })
                .catch_unwind()
                .await;

            let additions = match outcome {
                Ok(Ok(additions)) => additions,
                Ok(Err(err)) => return Err(PipelineError::from_raised(err)),
                Err(panic) => return Err(PipelineError::from_panic(panic)),
            };

            ctx = ctx
                .merge(additions)
                .map_err(|source| PipelineError::Collision {
                    step: name.to_string(),
                    source,
                })?;
        }

        Ok(ctx)
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("steps", &self.names())
            .finish()
    }
}
