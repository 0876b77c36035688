use std::sync::Arc;

use planscope_core::context::CompilationContext;
use planscope_core::engine::Engine;
use planscope_core::pipeline::{Parser, Pipeline};
use planscope_core::plan::PlanNode;
use planscope_core::testutil::normalize_ids;
use planscope_error::Result;

/// Parser that burns a number of attribute ids before parsing, so every id
/// in the compiled plan is shifted.
#[derive(Debug)]
struct ShiftedIds {
    inner: Arc<dyn Parser>,
    skip: usize,
}

impl Parser for ShiftedIds {
    fn parse(&self, ctx: &mut CompilationContext, sql: &str) -> Result<PlanNode> {
        for _ in 0..self.skip {
            ctx.next_attribute_id();
        }
        self.inner.parse(ctx, sql)
    }
}

#[test]
fn same_plan_modulo_ids() {
    let engine = Engine::new();
    let mut session = engine.new_session();
    session
        .sql("CREATE TABLE src (key INT, value STRING)")
        .unwrap();

    let pipeline = Pipeline::with_catalog(engine.catalog().clone());
    let shifted = Pipeline {
        parser: Arc::new(ShiftedIds {
            inner: pipeline.parser.clone(),
            skip: 7,
        }),
        ..pipeline
    };
    let mut shifted_session = engine.clone().with_pipeline(shifted).new_session();

    let queries = [
        "EXPLAIN EXTENDED SELECT key + 1 AS k, value FROM src WHERE key > 3",
        "EXPLAIN SELECT a.key, count(*) FROM src a JOIN src b ON a.key = b.key GROUP BY a.key",
        "EXPLAIN COST SELECT key FROM src WHERE key = 1",
    ];

    for query in queries {
        let lines = session.sql(query).unwrap().remove(0).lines;
        let shifted_lines = shifted_session.sql(query).unwrap().remove(0).lines;
        assert_ne!(lines, shifted_lines, "{query}");

        let normalized: Vec<_> = lines.iter().map(|l| normalize_ids(l)).collect();
        let shifted_normalized: Vec<_> = shifted_lines.iter().map(|l| normalize_ids(l)).collect();
        assert_eq!(normalized, shifted_normalized, "{query}");
    }
}
