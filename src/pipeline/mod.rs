//! Per-file processing pipeline.
//!
//! A `ProcessorChain` is an ordered list of async byte transforms applied to
//! every loaded file before it is committed:
//!
//! ```text
//! ┌───────────────┐   ┌──────────────────────────┐   ┌────────┐
//! │ loaded bytes  │──►│ step 1 ──► step 2 ──► .. │──►│ commit │
//! └───────────────┘   └──────────────────────────┘   └────────┘
//!                        first Err short-circuits
//! ```
//!
//! - Images, scripts: empty chain (bytes pass through unchanged)
//! - Styles: `StyleRewriter` (placeholder substitution + compiler)

mod compile;
mod style;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::asset::LogicalPath;
use crate::error::BuildError;

pub use compile::{
    BuiltinCompiler, CompileContext, CompileError, CompileFuture, CompilerSpec, CustomCompiler,
    LESSC, compile,
};
pub use style::{MissingReferencePolicy, StyleRewriter, missing_marker};

// =============================================================================
// Types
// =============================================================================

/// Future returned by a processing step.
pub type ProcessFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, BuildError>> + Send + 'a>>;

/// One async transform over a file's bytes.
pub trait Processor: Send + Sync {
    fn process<'a>(&'a self, bytes: Vec<u8>, logical: &'a LogicalPath) -> ProcessFuture<'a>;
}

// =============================================================================
// Chain
// =============================================================================

/// Ordered processing steps, shared by every task of a stage.
#[derive(Clone, Default)]
pub struct ProcessorChain {
    steps: Vec<Arc<dyn Processor>>,
}

impl ProcessorChain {
    /// Empty chain: the identity transform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn pipe(mut self, step: impl Processor + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order. The first error is returned and later
    /// steps are not invoked.
    pub async fn apply(&self, mut bytes: Vec<u8>, logical: &LogicalPath) -> Result<Vec<u8>, BuildError> {
        for step in &self.steps {
            bytes = step.process(bytes, logical).await?;
        }
        Ok(bytes)
    }
}

impl fmt::Debug for ProcessorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorChain")
            .field("steps", &self.steps.len())
            .finish()
    }
}
