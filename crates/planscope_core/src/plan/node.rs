use std::collections::BTreeMap;
use std::fmt;

use planscope_error::{Result, Span, internal};
use serde::{Deserialize, Serialize};

use super::attribute::Attribute;
use super::expr::Expression;
use crate::catalog::{StorageFormat, TableRef};
use crate::statistics::Stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Cross,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "Inner"),
            Self::Cross => write!(f, "Cross"),
        }
    }
}

/// Kind of a plan node along with its kind-specific fields.
///
/// Parsed, logical and physical trees all share this type. Which variants show
/// up depends on the stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Table reference that hasn't been looked up in the catalog.
    UnresolvedRelation {
        reference: Vec<String>,
        span: Option<Span>,
    },

    /// Scan of a catalog table.
    Relation { table: TableRef },
    Project { projections: Vec<Expression> },
    Filter { condition: Expression },
    Aggregate {
        groups: Vec<Expression>,
        aggregates: Vec<Expression>,
    },
    Join {
        join_type: JoinType,
        condition: Option<Expression>,
    },
    Limit { limit: u64 },
    /// Alias for a relation, `FROM src AS s`.
    Subquery { alias: String },
    InsertIntoTable {
        table: TableRef,
        /// Storage format of the target, known after analysis.
        format: Option<StorageFormat>,
    },
    CreateTableAsSelect {
        table: TableRef,
        format: StorageFormat,
        properties: Vec<(String, String)>,
    },
    /// Single row with no columns, source for queries without FROM.
    GeneratedLeaf,

    HiveTableScan { table: TableRef },
    ProjectExec { projections: Vec<Expression> },
    FilterExec { condition: Expression },
    HashAggregate {
        groups: Vec<Expression>,
        aggregates: Vec<Expression>,
    },
    /// Equi-join with the right side broadcast as the build side.
    BroadcastHashJoin {
        join_type: JoinType,
        left_keys: Vec<Expression>,
        right_keys: Vec<Expression>,
        /// Residual non-equi condition.
        condition: Option<Expression>,
    },
    BroadcastNestedLoopJoin {
        join_type: JoinType,
        condition: Option<Expression>,
    },
    LimitExec { limit: u64 },
    /// Limit at the root of a query, collecting rows to the driver.
    CollectLimit { limit: u64 },
    InsertIntoHiveTable { table: TableRef },
    CreateHiveTableAsSelect { table: TableRef },
    LocalTableScan,
    /// Fused subtree executed as a single generated unit.
    WholeStageCodegen { stage_id: usize },
}

impl NodeKind {
    /// Name used when rendering this node.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UnresolvedRelation { .. } => "UnresolvedRelation",
            Self::Relation { .. } => "Relation",
            Self::Project { .. } | Self::ProjectExec { .. } => "Project",
            Self::Filter { .. } | Self::FilterExec { .. } => "Filter",
            Self::Aggregate { .. } => "Aggregate",
            Self::Join { .. } => "Join",
            Self::Limit { .. } | Self::LimitExec { .. } => "Limit",
            Self::Subquery { .. } => "Subquery",
            Self::InsertIntoTable { .. } => "InsertIntoTable",
            Self::CreateTableAsSelect { .. } => "CreateTableAsSelect",
            Self::GeneratedLeaf => "GeneratedLeaf",
            Self::HiveTableScan { .. } => "HiveTableScan",
            Self::HashAggregate { .. } => "HashAggregate",
            Self::BroadcastHashJoin { .. } => "BroadcastHashJoin",
            Self::BroadcastNestedLoopJoin { .. } => "BroadcastNestedLoopJoin",
            Self::CollectLimit { .. } => "CollectLimit",
            Self::InsertIntoHiveTable { .. } => "InsertIntoHiveTable",
            Self::CreateHiveTableAsSelect { .. } => "CreateHiveTableAsSelect",
            Self::LocalTableScan => "LocalTableScan",
            Self::WholeStageCodegen { .. } => "WholeStageCodegen",
        }
    }

    pub const fn is_physical(&self) -> bool {
        matches!(
            self,
            Self::HiveTableScan { .. }
                | Self::ProjectExec { .. }
                | Self::FilterExec { .. }
                | Self::HashAggregate { .. }
                | Self::BroadcastHashJoin { .. }
                | Self::BroadcastNestedLoopJoin { .. }
                | Self::LimitExec { .. }
                | Self::CollectLimit { .. }
                | Self::InsertIntoHiveTable { .. }
                | Self::CreateHiveTableAsSelect { .. }
                | Self::LocalTableScan
                | Self::WholeStageCodegen { .. }
        )
    }

    /// Expressions held directly by this node.
    pub fn expressions(&self) -> Vec<&Expression> {
        match self {
            Self::Project { projections } | Self::ProjectExec { projections } => {
                projections.iter().collect()
            }
            Self::Filter { condition } | Self::FilterExec { condition } => vec![condition],
            Self::Aggregate { groups, aggregates } | Self::HashAggregate { groups, aggregates } => {
                groups.iter().chain(aggregates.iter()).collect()
            }
            Self::Join { condition, .. } | Self::BroadcastNestedLoopJoin { condition, .. } => {
                condition.iter().collect()
            }
            Self::BroadcastHashJoin {
                left_keys,
                right_keys,
                condition,
                ..
            } => left_keys
                .iter()
                .chain(right_keys.iter())
                .chain(condition.iter())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Apply a fallible rewrite to every expression held by this node.
    pub fn map_expressions<F>(self, f: &mut F) -> Result<NodeKind>
    where
        F: FnMut(Expression) -> Result<Expression>,
    {
        fn map_all<F>(exprs: Vec<Expression>, f: &mut F) -> Result<Vec<Expression>>
        where
            F: FnMut(Expression) -> Result<Expression>,
        {
            exprs.into_iter().map(|e| f(e)).collect()
        }

        let kind = match self {
            Self::Project { projections } => Self::Project {
                projections: map_all(projections, f)?,
            },
            Self::ProjectExec { projections } => Self::ProjectExec {
                projections: map_all(projections, f)?,
            },
            Self::Filter { condition } => Self::Filter {
                condition: f(condition)?,
            },
            Self::FilterExec { condition } => Self::FilterExec {
                condition: f(condition)?,
            },
            Self::Aggregate { groups, aggregates } => Self::Aggregate {
                groups: map_all(groups, f)?,
                aggregates: map_all(aggregates, f)?,
            },
            Self::HashAggregate { groups, aggregates } => Self::HashAggregate {
                groups: map_all(groups, f)?,
                aggregates: map_all(aggregates, f)?,
            },
            Self::Join {
                join_type,
                condition,
            } => Self::Join {
                join_type,
                condition: condition.map(|c| f(c)).transpose()?,
            },
            other => other,
        };
        Ok(kind)
    }
}

/// A node in a plan tree.
///
/// Children are owned exclusively by their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    pub kind: NodeKind,
    pub children: Vec<PlanNode>,
    /// Attributes produced by this node.
    pub output: Vec<Attribute>,
    /// Kind-specific metadata rendered alongside the node.
    pub extra: BTreeMap<String, String>,
    /// Size and row count, only attached when cost display is requested.
    pub stats: Option<Stats>,
}

impl PlanNode {
    pub fn new(kind: NodeKind, children: Vec<PlanNode>, output: Vec<Attribute>) -> Self {
        PlanNode {
            kind,
            children,
            output,
            extra: BTreeMap::new(),
            stats: None,
        }
    }

    /// Create a node without output attributes, used for parsed plans.
    pub fn unresolved(kind: NodeKind, children: Vec<PlanNode>) -> Self {
        Self::new(kind, children, Vec::new())
    }

    /// Node whose output is the same as its only child's.
    pub fn passthrough(kind: NodeKind, child: PlanNode) -> Self {
        let output = child.output.clone();
        Self::new(kind, vec![child], output)
    }

    /// Create a project node, deriving its output from the projections.
    pub fn project(projections: Vec<Expression>, child: PlanNode) -> Result<Self> {
        let output = projections
            .iter()
            .map(|p| p.to_attribute())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(
            NodeKind::Project { projections },
            vec![child],
            output,
        ))
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.extra.insert(key.into(), value.to_string());
        self
    }

    /// Get the only child of this node.
    pub fn single_child(&self) -> Result<&PlanNode> {
        match self.children.as_slice() {
            [child] => Ok(child),
            other => Err(internal!(
                "Expected one child for {}, got {}",
                self.kind.name(),
                other.len()
            )),
        }
    }

    /// Take the only child of this node.
    pub fn into_single_child(mut self) -> Result<PlanNode> {
        if self.children.len() != 1 {
            return Err(internal!(
                "Expected one child for {}, got {}",
                self.kind.name(),
                self.children.len()
            ));
        }
        self.children
            .pop()
            .ok_or_else(|| internal!("Missing child for {}", self.kind.name()))
    }

    /// Whether this node and all of its descendants are resolved.
    pub fn is_resolved(&self) -> bool {
        if matches!(self.kind, NodeKind::UnresolvedRelation { .. }) {
            return false;
        }
        self.kind.expressions().iter().all(|e| e.is_resolved())
            && self.children.iter().all(|c| c.is_resolved())
    }

    /// Rewrite the tree bottom-up.
    pub fn transform_up<F>(self, f: &mut F) -> Result<PlanNode>
    where
        F: FnMut(PlanNode) -> Result<PlanNode>,
    {
        let PlanNode {
            kind,
            children,
            output,
            extra,
            stats,
        } = self;
        let children = children
            .into_iter()
            .map(|c| c.transform_up(f))
            .collect::<Result<Vec<_>>>()?;
        f(PlanNode {
            kind,
            children,
            output,
            extra,
            stats,
        })
    }

    /// Rewrite the tree top-down.
    ///
    /// Children of the node returned by `f` are visited afterwards.
    pub fn transform_down<F>(self, f: &mut F) -> Result<PlanNode>
    where
        F: FnMut(PlanNode) -> Result<PlanNode>,
    {
        let mut node = f(self)?;
        node.children = std::mem::take(&mut node.children)
            .into_iter()
            .map(|c| c.transform_down(f))
            .collect::<Result<Vec<_>>>()?;
        Ok(node)
    }

    /// Visit every node in pre-order, root first, children left to right.
    pub fn for_each_pre_order<'a, F>(&'a self, f: &mut F) -> Result<()>
    where
        F: FnMut(&'a PlanNode) -> Result<()>,
    {
        f(self)?;
        for child in &self.children {
            child.for_each_pre_order(f)?;
        }
        Ok(())
    }

    /// Check if any node in the tree matches the predicate.
    pub fn any(&self, pred: &impl Fn(&PlanNode) -> bool) -> bool {
        pred(self) || self.children.iter().any(|c| c.any(pred))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{AttributeId, DataType};

    fn relation() -> PlanNode {
        PlanNode::new(
            NodeKind::Relation {
                table: TableRef::new("default", "src"),
            },
            Vec::new(),
            vec![
                Attribute::new("key", AttributeId(0), DataType::Int),
                Attribute::new("value", AttributeId(1), DataType::String),
            ],
        )
    }

    #[test]
    fn project_output_from_projections() {
        let rel = relation();
        let key = Expression::Attribute(rel.output[0].clone());
        let node = PlanNode::project(vec![key], rel).unwrap();
        assert_eq!(vec![AttributeId(0)], node.output.iter().map(|a| a.id).collect::<Vec<_>>());
    }

    #[test]
    fn unresolved_propagates() {
        let leaf = PlanNode::unresolved(
            NodeKind::UnresolvedRelation {
                reference: vec!["src".to_string()],
                span: None,
            },
            Vec::new(),
        );
        let limit = PlanNode::unresolved(NodeKind::Limit { limit: 1 }, vec![leaf]);
        assert!(!limit.is_resolved());
        assert!(PlanNode::passthrough(NodeKind::Limit { limit: 1 }, relation()).is_resolved());
    }

    #[test]
    fn pre_order_visit() {
        let plan = PlanNode::passthrough(
            NodeKind::Limit { limit: 1 },
            PlanNode::passthrough(NodeKind::Subquery { alias: "s".to_string() }, relation()),
        );
        let mut names = Vec::new();
        plan.for_each_pre_order(&mut |n| {
            names.push(n.kind.name());
            Ok(())
        })
        .unwrap();
        assert_eq!(vec!["Limit", "Subquery", "Relation"], names);
    }

    #[test]
    fn single_child_errors() {
        relation().single_child().unwrap_err();
    }
}
