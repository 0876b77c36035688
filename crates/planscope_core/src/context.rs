use uuid::Uuid;

use crate::catalog::DEFAULT_DATABASE;
use crate::config::session::SessionConfig;
use crate::plan::AttributeId;

/// State for compiling a single statement.
///
/// A context is created per explain invocation and passed by mutable
/// reference to every stage of the pipeline. Attribute ids are allocated from
/// the context, so concurrent compilations never share a counter.
#[derive(Debug)]
pub struct CompilationContext {
    pub query_id: Uuid,
    pub default_database: String,
    pub session_user: String,
    pub enable_whole_stage_codegen: bool,
    pub(crate) next_attribute_id: u64,
}

impl CompilationContext {
    pub fn new(config: &SessionConfig) -> Self {
        CompilationContext {
            query_id: Uuid::new_v4(),
            default_database: config.default_database.clone(),
            session_user: config.session_user.clone(),
            enable_whole_stage_codegen: config.enable_whole_stage_codegen,
            next_attribute_id: 0,
        }
    }

    /// Allocate a new attribute id.
    ///
    /// Ids are handed out in increasing order and never reused.
    pub fn next_attribute_id(&mut self) -> AttributeId {
        let id = AttributeId(self.next_attribute_id);
        self.next_attribute_id += 1;
        id
    }

    /// Number of ids allocated so far.
    pub fn allocated_ids(&self) -> u64 {
        self.next_attribute_id
    }
}

impl Default for CompilationContext {
    fn default() -> Self {
        CompilationContext {
            query_id: Uuid::new_v4(),
            default_database: DEFAULT_DATABASE.to_string(),
            session_user: SessionConfig::default().session_user,
            enable_whole_stage_codegen: true,
            next_attribute_id: 0,
        }
    }
}
