pub mod query_result;
pub mod session;

use std::sync::Arc;

use session::Session;

use crate::catalog::Catalog;
use crate::pipeline::Pipeline;

/// Shared state for all sessions: the catalog and the compilation pipeline.
#[derive(Debug, Clone)]
pub struct Engine {
    catalog: Arc<Catalog>,
    pipeline: Pipeline,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with an empty catalog and the default pipeline.
    pub fn new() -> Self {
        Self::with_catalog(Arc::new(Catalog::new()))
    }

    pub fn with_catalog(catalog: Arc<Catalog>) -> Self {
        let pipeline = Pipeline::with_catalog(catalog.clone());
        Engine { catalog, pipeline }
    }

    /// Replace the pipeline, e.g. to swap in a different collaborator.
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Create a new session with a default config.
    pub fn new_session(&self) -> Session {
        Session::new(self.catalog.clone(), self.pipeline.clone())
    }
}
