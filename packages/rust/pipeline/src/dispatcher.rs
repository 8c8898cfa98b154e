//! Ordered stage execution with per-stage error containment.
//!
//! Stages run strictly in list order, driven by an explicit index cursor
//! rather than recursion through closures. Each stage receives a single-use
//! [`Next`] continuation: calling [`Next::proceed`] marks the run to advance
//! to the following stage once the current one returns; not calling it ends
//! the run after the current stage.
//!
//! Failure policy is a per-stage convention, not enforced here:
//!
//! - **fail-closed** stages return their error. The dispatcher records it
//!   into the context and stops the chain — correct for stages whose failure
//!   makes everything downstream meaningless (structural parses).
//! - **fail-open** stages record the error themselves via
//!   [`ProcessingContext::record_error`], call `proceed`, and return `Ok` —
//!   degraded continuation (e.g. link extraction yielding zero links).

use std::sync::Arc;

use docsweep_shared::{DocsweepError, Result};

use crate::context::ProcessingContext;

/// One unit of a content-processing pipeline.
#[async_trait::async_trait]
pub trait Stage: Send + Sync {
    /// Stage name used in error messages and tracing.
    fn name(&self) -> &'static str;

    /// Process the context, calling `next.proceed()` to let the chain
    /// continue past this stage.
    async fn process(&self, ctx: &mut ProcessingContext, next: &mut Next) -> Result<()>;
}

/// Single-use continuation handed to each stage invocation.
#[derive(Debug)]
pub struct Next {
    calls: u32,
    advance: bool,
}

impl Next {
    fn new() -> Self {
        Self {
            calls: 0,
            advance: false,
        }
    }

    /// Let the chain continue with the next stage after this one returns.
    ///
    /// A second call within the same stage invocation is a programming error
    /// and aborts the remainder of the run.
    pub fn proceed(&mut self) -> Result<()> {
        self.calls += 1;
        if self.calls > 1 {
            return Err(DocsweepError::Dispatch(
                "next called multiple times".into(),
            ));
        }
        self.advance = true;
        Ok(())
    }
}

/// Run the stage list over the context.
///
/// Any error a stage returns — and any misuse of the continuation — is
/// caught here, appended to `ctx.errors`, and stops the chain; nothing
/// escapes the dispatcher boundary.
pub async fn dispatch(stages: &[Arc<dyn Stage>], ctx: &mut ProcessingContext) {
    let mut cursor = 0;

    while let Some(stage) = stages.get(cursor) {
        tracing::trace!(stage = stage.name(), cursor, "running stage");
        let mut next = Next::new();

        match stage.process(ctx, &mut next).await {
            Ok(()) => {
                // A stage may swallow the proceed error; the call count
                // still convicts it.
                if next.calls > 1 {
                    ctx.errors.push(DocsweepError::Dispatch(
                        "next called multiple times".into(),
                    ));
                    return;
                }
                if !next.advance {
                    return;
                }
                cursor += 1;
            }
            Err(error) => {
                tracing::debug!(stage = stage.name(), %error, "stage failed, chain stopped");
                ctx.errors.push(error);
                return;
            }
        }
    }
}
