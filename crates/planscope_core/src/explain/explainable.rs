use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::plan::{Expression, NodeKind, PlanNode};
use crate::statistics::Stats;

/// An entry in an output for explaining a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainEntry {
    /// Name of the node.
    pub name: String,
    /// Items to display in the explain entry.
    ///
    /// Using a btree to ensure consistent ordering.
    pub items: BTreeMap<String, ExplainValue>,
}

impl ExplainEntry {
    /// Create a new explain entry for a plan node.
    pub fn new(name: impl Into<String>) -> Self {
        ExplainEntry {
            name: name.into(),
            items: BTreeMap::new(),
        }
    }

    /// Put a value in the explain entry.
    pub fn with_value(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        let key = key.into();
        let val = ExplainValue::Value(value.to_string());
        self.items.insert(key, val);
        self
    }

    /// Put a list of values in the explain entry.
    pub fn with_values<S: fmt::Display>(
        mut self,
        key: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        let key = key.into();
        let vals = ExplainValue::Values(values.into_iter().map(|s| s.to_string()).collect());
        self.items.insert(key, vals);
        self
    }

    pub fn with_named_map<S1: fmt::Display, S2: fmt::Display>(
        mut self,
        key: impl Into<String>,
        map_name: impl Into<String>,
        map: impl IntoIterator<Item = (S1, S2)>,
    ) -> Self {
        let key = key.into();
        let vals = ExplainValue::NamedMap(
            map_name.into(),
            map.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self.items.insert(key, vals);
        self
    }

    /// Write the items as ` (k1 = v1, k2 = v2)`, nothing if there are none.
    pub fn fmt_items(&self, f: &mut impl fmt::Write) -> fmt::Result {
        if self.items.is_empty() {
            return Ok(());
        }
        write!(f, " (")?;
        for (idx, (k, v)) in self.items.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k} = {v}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for ExplainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        self.fmt_items(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplainValue {
    Value(String),
    Values(Vec<String>),
    NamedMap(String, Vec<(String, String)>),
}

impl fmt::Display for ExplainValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::Values(v) => write!(f, "[{}]", v.join(", ")),
            Self::NamedMap(name, map) => {
                let s = map
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                // "{k1: v1, k2: v2 ... }"
                write!(f, "{} {{{}}}", name, s)
            }
        }
    }
}

/// Trait for explaining a single node in a plan tree.
pub trait Explainable {
    /// Create an ExplainEntry for this node.
    fn explain_entry(&self) -> ExplainEntry;
}

impl Explainable for PlanNode {
    fn explain_entry(&self) -> ExplainEntry {
        let ent = ExplainEntry::new(self.kind.name());
        let mut ent = match &self.kind {
            NodeKind::UnresolvedRelation { reference, .. } => {
                ent.with_value("table", reference.join("."))
            }
            NodeKind::Relation { table }
            | NodeKind::HiveTableScan { table }
            | NodeKind::InsertIntoHiveTable { table }
            | NodeKind::CreateHiveTableAsSelect { table } => ent.with_value("table", table),
            NodeKind::Project { projections } | NodeKind::ProjectExec { projections } => {
                // Bare column lists are already visible in the output.
                let is_bare = projections
                    .iter()
                    .all(|p| matches!(p, Expression::Attribute(_)));
                if is_bare && self.output.len() == projections.len() {
                    ent
                } else {
                    ent.with_values("projections", projections)
                }
            }
            NodeKind::Filter { condition } | NodeKind::FilterExec { condition } => {
                ent.with_value("condition", condition)
            }
            NodeKind::Aggregate { groups, aggregates }
            | NodeKind::HashAggregate { groups, aggregates } => ent
                .with_values("groups", groups)
                .with_values("aggregates", aggregates),
            NodeKind::Join {
                join_type,
                condition,
            }
            | NodeKind::BroadcastNestedLoopJoin {
                join_type,
                condition,
            } => with_condition(ent.with_value("join_type", join_type), condition),
            NodeKind::BroadcastHashJoin {
                join_type,
                left_keys,
                right_keys,
                condition,
            } => with_condition(
                ent.with_value("join_type", join_type)
                    .with_values("left_keys", left_keys)
                    .with_values("right_keys", right_keys),
                condition,
            ),
            NodeKind::Limit { limit }
            | NodeKind::LimitExec { limit }
            | NodeKind::CollectLimit { limit } => ent.with_value("limit", limit),
            NodeKind::Subquery { alias } => ent.with_value("alias", alias),
            NodeKind::InsertIntoTable { table, format } => {
                let ent = ent.with_value("table", table);
                match format {
                    Some(format) => ent.with_value("format", format),
                    None => ent,
                }
            }
            NodeKind::CreateTableAsSelect {
                table,
                format,
                properties,
            } => {
                let ent = ent.with_value("table", table).with_value("format", format);
                if properties.is_empty() {
                    ent
                } else {
                    ent.with_named_map(
                        "properties",
                        "serde",
                        properties.iter().map(|(k, v)| (k, v)),
                    )
                }
            }
            NodeKind::WholeStageCodegen { stage_id } => ent.with_value("stage_id", stage_id),
            NodeKind::GeneratedLeaf | NodeKind::LocalTableScan => ent,
        };

        for (key, value) in &self.extra {
            ent = ent.with_value(key, value);
        }

        ent
    }
}

fn with_condition(ent: ExplainEntry, condition: &Option<Expression>) -> ExplainEntry {
    match condition {
        Some(condition) => ent.with_value("condition", condition),
        None => ent,
    }
}

/// Renderable form of a plan tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainNode {
    pub entry: ExplainEntry,
    /// Set if the node or one of its expressions hasn't been resolved.
    pub unresolved: bool,
    /// Output attributes as `name#id`.
    pub output: Vec<String>,
    pub stats: Option<Stats>,
    pub children: Vec<ExplainNode>,
}

impl ExplainNode {
    /// Walk a plan tree, optionally keeping stats.
    pub fn walk(plan: &PlanNode, with_stats: bool) -> Self {
        let unresolved = matches!(plan.kind, NodeKind::UnresolvedRelation { .. })
            || plan.kind.expressions().iter().any(|e| !e.is_resolved());

        ExplainNode {
            entry: plan.explain_entry(),
            unresolved,
            output: plan.output.iter().map(|a| a.to_string()).collect(),
            stats: if with_stats { plan.stats } else { None },
            children: plan
                .children
                .iter()
                .map(|c| Self::walk(c, with_stats))
                .collect(),
        }
    }

    /// Text for this node alone, without indentation.
    pub fn line(&self) -> String {
        use fmt::Write as _;

        let mut s = String::new();
        if self.unresolved {
            s.push('\'');
        }
        s.push_str(&self.entry.name);
        if !self.output.is_empty() {
            let _ = write!(s, " [{}]", self.output.join(", "));
        }
        let _ = self.entry.fmt_items(&mut s);
        if let Some(stats) = &self.stats {
            let _ = write!(s, " {stats}");
        }
        s
    }

    /// Append lines for this node and its children, two spaces of
    /// indentation per level.
    pub fn write_lines(&self, depth: usize, out: &mut Vec<String>) {
        out.push(format!("{}{}", "  ".repeat(depth), self.line()));
        for child in &self.children {
            child.write_lines(depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableRef;
    use crate::plan::{Attribute, AttributeId, BinaryOperator, DataType};

    #[test]
    fn explain_entry_display_no_values() {
        let ent = ExplainEntry::new("DummyNode");

        let out = ent.to_string();
        assert_eq!("DummyNode", out);
    }

    #[test]
    fn explain_entry_display_with_values() {
        let ent = ExplainEntry::new("DummyNode")
            .with_value("k1", "v1")
            .with_values("k2", ["vs1", "vs2", "vs3"]);

        let out = ent.to_string();
        assert_eq!("DummyNode (k1 = v1, k2 = [vs1, vs2, vs3])", out);
    }

    #[test]
    fn explain_entry_display_with_map_value() {
        let ent = ExplainEntry::new("DummyNode")
            .with_value("k1", "v1")
            .with_named_map("k2", "my_map", [("m1", "v1"), ("m2", "v2")]);

        let out = ent.to_string();
        assert_eq!("DummyNode (k1 = v1, k2 = my_map {m1: v1, m2: v2})", out);
    }

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
        .with_extra("format", "textfile")
    }

    #[test]
    fn node_lines() {
        let rel = relation();
        let cond = Expression::binary(
            BinaryOperator::Eq,
            Expression::Attribute(rel.output[0].clone()),
            Expression::lit(123),
        );
        let plan = PlanNode::passthrough(NodeKind::Filter { condition: cond }, rel);

        let mut lines = Vec::new();
        ExplainNode::walk(&plan, false).write_lines(0, &mut lines);
        assert_eq!(
            vec![
                "Filter [key#0, value#1] (condition = (key#0 = 123))".to_string(),
                "  Relation [key#0, value#1] (format = textfile, table = default.src)".to_string(),
            ],
            lines
        );
    }

    #[test]
    fn unresolved_marker() {
        let plan = PlanNode::unresolved(
            NodeKind::Project {
                projections: vec![Expression::UnresolvedStar { qualifier: None }],
            },
            vec![PlanNode::unresolved(
                NodeKind::UnresolvedRelation {
                    reference: vec!["src".to_string()],
                    span: None,
                },
                Vec::new(),
            )],
        );

        let mut lines = Vec::new();
        ExplainNode::walk(&plan, false).write_lines(0, &mut lines);
        assert_eq!(
            vec![
                "'Project (projections = [*])".to_string(),
                "  'UnresolvedRelation (table = src)".to_string(),
            ],
            lines
        );
    }

    #[test]
    fn bare_projection_hidden() {
        let rel = relation();
        let key = Expression::Attribute(rel.output[0].clone());
        let plan = PlanNode::project(vec![key], rel).unwrap();
        assert_eq!("Project [key#0]", ExplainNode::walk(&plan, false).line());
    }

    #[test]
    fn stats_only_when_requested() {
        let mut plan = relation();
        plan.stats = Some(Stats::new(32000, Some(1000)));

        let with = ExplainNode::walk(&plan, true).line();
        assert!(with.ends_with(" Statistics(sizeInBytes=32000, rowCount=1000)"), "{with}");
        let without = ExplainNode::walk(&plan, false).line();
        assert!(!without.contains("Statistics"), "{without}");
    }
}
