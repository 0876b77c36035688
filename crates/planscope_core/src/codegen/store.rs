use planscope_error::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CodeFragment;
use crate::pipeline::CodeGenerator;
use crate::plan::PlanNode;

/// A fragment along with its position in visitation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFragment {
    /// 1-based position among the fragments of a single plan.
    pub sequence: usize,
    pub fragment: CodeFragment,
}

/// Generated fragments for a physical plan, in pre-order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFragmentStore {
    fragments: Vec<StoredFragment>,
}

impl CodeFragmentStore {
    /// Visit the plan in pre-order, asking the generator for a fragment at
    /// every node.
    ///
    /// Numbering starts at 1 for every store.
    pub fn collect(generator: &dyn CodeGenerator, plan: &PlanNode) -> Result<Self> {
        let mut store = CodeFragmentStore::default();
        plan.for_each_pre_order(&mut |node| {
            if let Some(fragment) = generator.generate(node)? {
                let sequence = store.fragments.len() + 1;
                debug!(sequence, stage_id = fragment.stage_id, "generated code fragment");
                store.fragments.push(StoredFragment { sequence, fragment });
            }
            Ok(())
        })?;
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoredFragment> {
        self.fragments.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableRef;
    use crate::plan::NodeKind;

    /// Generates a fragment for every scan, naming the table.
    #[derive(Debug)]
    struct ScanNames;

    impl CodeGenerator for ScanNames {
        fn generate(&self, node: &PlanNode) -> Result<Option<CodeFragment>> {
            Ok(match &node.kind {
                NodeKind::HiveTableScan { table } => Some(CodeFragment::new(0, table.to_string())),
                _ => None,
            })
        }
    }

    fn scan(table: &str) -> PlanNode {
        PlanNode::new(
            NodeKind::HiveTableScan {
                table: TableRef::unqualified(table),
            },
            Vec::new(),
            Vec::new(),
        )
    }

    #[test]
    fn pre_order_numbering() {
        let plan = PlanNode::new(
            NodeKind::BroadcastNestedLoopJoin {
                join_type: crate::plan::JoinType::Cross,
                condition: None,
            },
            vec![scan("a"), scan("b")],
            Vec::new(),
        );
        let store = CodeFragmentStore::collect(&ScanNames, &plan).unwrap();

        let got: Vec<_> = store
            .iter()
            .map(|f| (f.sequence, f.fragment.source.clone()))
            .collect();
        assert_eq!(vec![(1, "a".to_string()), (2, "b".to_string())], got);
    }

    #[test]
    fn no_fragments() {
        let scan = PlanNode::new(NodeKind::LocalTableScan, Vec::new(), Vec::new());
        let store = CodeFragmentStore::collect(&ScanNames, &scan).unwrap();
        assert!(store.is_empty());
    }
}
