use hashbrown::HashMap;
use planscope_error::{OptionExt, Result, internal};
use tracing::debug;

use super::CodeFragment;
use crate::physical::codegen_stages::is_fusible;
use crate::pipeline::CodeGenerator;
use crate::plan::{
    AttributeId,
    BinaryOperator,
    Expression,
    NodeKind,
    PlanNode,
    ScalarValue,
    UnaryOperator,
};

/// Generates a row-at-a-time loop for each codegen stage.
///
/// Every fused operator is inlined into a single `process_next` loop over the
/// stage input. Hash aggregates split the loop in two: a consume loop that
/// fills the aggregation state, and a produce loop over the aggregated groups
/// that the operators above the aggregate are inlined into.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopCodeGenerator;

impl CodeGenerator for LoopCodeGenerator {
    fn generate(&self, node: &PlanNode) -> Result<Option<CodeFragment>> {
        let NodeKind::WholeStageCodegen { stage_id } = node.kind else {
            return Ok(None);
        };
        debug!(stage_id, "generating code for stage");
        let source = StageWriter::new(stage_id).write(node.single_child()?)?;
        Ok(Some(CodeFragment::new(stage_id, source)))
    }
}

/// Grouping and aggregate calls visible in an aggregate's produce loop.
#[derive(Debug)]
struct AggregateScope<'a> {
    groups: &'a [Expression],
    calls: Vec<&'a Expression>,
    group_key: String,
    acc: String,
}

impl AggregateScope<'_> {
    fn group_access(&self, idx: usize) -> String {
        if self.groups.len() == 1 {
            self.group_key.clone()
        } else {
            format!("{}.{idx}", self.group_key)
        }
    }
}

#[derive(Debug)]
struct StageWriter {
    stage_id: usize,
    fields: Vec<String>,
    body: Vec<String>,
    indent: usize,
    open_blocks: usize,
    vars: HashMap<AttributeId, String>,
    counter: usize,
}

impl StageWriter {
    /// Indent of statements directly inside `process_next`.
    const BODY_INDENT: usize = 2;

    fn new(stage_id: usize) -> Self {
        StageWriter {
            stage_id,
            fields: Vec::new(),
            body: Vec::new(),
            indent: Self::BODY_INDENT,
            open_blocks: 0,
            vars: HashMap::new(),
            counter: 0,
        }
    }

    fn write(mut self, root: &PlanNode) -> Result<String> {
        let (chain, input) = fused_chain(root)?;

        self.fields.push("input: RowIterator,".to_string());
        self.open("while let Some(row) = self.input.next() {");
        for (ordinal, attr) in input.output.iter().enumerate() {
            let var = self.fresh("input");
            self.line(format!("let {var} = row.get_{}({ordinal});", attr.datatype));
            self.vars.insert(attr.id, var);
        }

        for node in chain.iter().rev() {
            self.write_operator(node)?;
        }

        let outputs = root
            .output
            .iter()
            .map(|attr| self.lookup(attr.id, &attr.to_string()))
            .collect::<Result<Vec<_>>>()?;
        self.line(format!("self.output.push(Row::new(vec![{}]));", outputs.join(", ")));
        self.close_all();

        let names: Vec<&str> = chain.iter().map(|n| n.kind.name()).collect();
        let mut lines = vec![
            format!("// Stage {}: {}", self.stage_id, names.join(" <- ")),
            format!("// Input: {}", input.kind.name()),
            format!("pub struct GeneratedIteratorForCodegenStage{} {{", self.stage_id),
        ];
        lines.extend(self.fields.iter().map(|f| format!("    {f}")));
        lines.push("    output: Vec<Row>,".to_string());
        lines.push("}".to_string());
        lines.push(String::new());
        lines.push(format!("impl GeneratedIteratorForCodegenStage{} {{", self.stage_id));
        lines.push("    pub fn process_next(&mut self) {".to_string());
        lines.append(&mut self.body);
        lines.push("    }".to_string());
        lines.push("}".to_string());

        Ok(lines.join("\n"))
    }

    fn write_operator(&mut self, node: &PlanNode) -> Result<()> {
        match &node.kind {
            NodeKind::FilterExec { condition } => {
                self.line("// Filter");
                let cond = self.expr_code(condition, None)?;
                self.write_predicate(&cond);
            }
            NodeKind::ProjectExec { projections } => {
                self.line("// Project");
                for proj in projections {
                    match proj {
                        Expression::Attribute(attr) => {
                            // Already bound, fail early if it isn't.
                            self.lookup(attr.id, &attr.to_string())?;
                        }
                        Expression::Alias {
                            child,
                            id: Some(id),
                            ..
                        } => {
                            let code = self.expr_code(child, None)?;
                            let var = self.fresh("project");
                            self.line(format!("let {var} = {code};"));
                            self.vars.insert(*id, var);
                        }
                        other => return Err(internal!("Unexpected projection in codegen: {other}")),
                    }
                }
            }
            NodeKind::BroadcastHashJoin {
                left_keys,
                right_keys,
                condition,
                ..
            } => {
                let build = node
                    .children
                    .get(1)
                    .required("hash join build side")?;
                let relation = self.fresh("build");
                let build_keys: Vec<String> = right_keys.iter().map(|k| k.to_string()).collect();
                self.fields.push(format!(
                    "{relation}: BroadcastRelation, // keys: [{}]",
                    build_keys.join(", ")
                ));

                self.line("// BroadcastHashJoin");
                let keys = left_keys
                    .iter()
                    .map(|k| self.expr_code(k, None))
                    .collect::<Result<Vec<_>>>()?;
                let key_var = self.fresh("join_key");
                self.line(format!("let {key_var} = {};", tuple(&keys)));
                self.open(format!("for build_row in self.{relation}.probe(&{key_var}) {{"));
                for (ordinal, attr) in build.output.iter().enumerate() {
                    let var = self.fresh("build_col");
                    self.line(format!("let {var} = build_row.get_{}({ordinal});", attr.datatype));
                    self.vars.insert(attr.id, var);
                }
                if let Some(condition) = condition {
                    let cond = self.expr_code(condition, None)?;
                    self.write_predicate(&cond);
                }
            }
            NodeKind::HashAggregate { groups, aggregates } => {
                let state = self.fresh("agg_state");
                self.fields.push(format!("{state}: HashMap<GroupKey, Accumulators>,"));

                self.line("// HashAggregate");
                let group_codes = groups
                    .iter()
                    .map(|g| self.expr_code(g, None))
                    .collect::<Result<Vec<_>>>()?;
                let group_key = self.fresh("group_key");
                let acc = self.fresh("acc");
                self.line(format!("let {group_key} = {};", tuple(&group_codes)));
                self.line(format!("let {acc} = self.{state}.entry({group_key}).or_default();"));

                let mut calls: Vec<&Expression> = Vec::new();
                for expr in aggregates {
                    collect_aggregate_calls(expr, &mut calls);
                }
                for (idx, call) in calls.iter().enumerate() {
                    if let Expression::Aggregate { func, arg } = call {
                        let arg = self.expr_code(arg, None)?;
                        self.line(format!("{acc}.update_{}({idx}, {arg});", func.name()));
                    }
                }

                // End of the consume loop, everything above reads aggregated
                // groups.
                self.close_all();
                self.open(format!("for ({group_key}, {acc}) in self.{state}.drain() {{"));

                let scope = AggregateScope {
                    groups,
                    calls,
                    group_key,
                    acc,
                };
                let mut vars = HashMap::new();
                for expr in aggregates {
                    let attr = expr.to_attribute()?;
                    let code = self.expr_code(expr, Some(&scope))?;
                    let var = self.fresh("agg_out");
                    self.line(format!("let {var} = {code};"));
                    vars.insert(attr.id, var);
                }
                self.vars = vars;
            }
            other => return Err(internal!("Cannot generate code for {}", other.name())),
        }
        Ok(())
    }

    fn write_predicate(&mut self, cond: &str) {
        self.line(format!("if !{} {{", parenthesize(cond)));
        self.line("    continue;");
        self.line("}");
    }

    fn expr_code(&self, expr: &Expression, agg: Option<&AggregateScope>) -> Result<String> {
        if let Some(scope) = agg {
            if let Some(idx) = scope.groups.iter().position(|g| g == expr) {
                return Ok(scope.group_access(idx));
            }
            if let Some(idx) = scope.calls.iter().position(|c| *c == expr) {
                return Ok(format!("{}.result({idx})", scope.acc));
            }
        }

        Ok(match expr {
            Expression::Attribute(attr) => self.lookup(attr.id, &attr.to_string())?,
            Expression::Literal(value) => literal_code(value),
            Expression::Alias { child, .. } => self.expr_code(child, agg)?,
            Expression::Binary { op, left, right } => {
                let op = match op {
                    BinaryOperator::And => "&&".to_string(),
                    BinaryOperator::Or => "||".to_string(),
                    BinaryOperator::Eq => "==".to_string(),
                    other => other.to_string(),
                };
                format!(
                    "({} {op} {})",
                    self.expr_code(left, agg)?,
                    self.expr_code(right, agg)?
                )
            }
            Expression::Unary { op, expr } => {
                let inner = self.expr_code(expr, agg)?;
                match op {
                    UnaryOperator::Not => format!("!{inner}"),
                    UnaryOperator::Negate => format!("-{inner}"),
                }
            }
            other => return Err(internal!("Cannot generate code for expression {other}")),
        })
    }

    /// Variable holding an attribute in the current scope.
    fn lookup(&self, id: AttributeId, display: &str) -> Result<String> {
        self.vars
            .get(&id)
            .cloned()
            .ok_or_else(|| {
                internal!(
                    "Attribute {display} not found in stage {} input",
                    self.stage_id
                )
            })
    }

    fn fresh(&mut self, prefix: &str) -> String {
        let name = format!("{prefix}_{}", self.counter);
        self.counter += 1;
        name
    }

    fn line(&mut self, line: impl AsRef<str>) {
        self.body
            .push(format!("{}{}", "    ".repeat(self.indent), line.as_ref()));
    }

    fn open(&mut self, line: impl AsRef<str>) {
        self.line(line);
        self.indent += 1;
        self.open_blocks += 1;
    }

    fn close_all(&mut self) {
        while self.open_blocks > 0 {
            self.indent -= 1;
            self.open_blocks -= 1;
            self.line("}");
        }
    }
}

/// Split a stage into its fused operators, top-down, and the node feeding
/// the stage.
fn fused_chain(root: &PlanNode) -> Result<(Vec<&PlanNode>, &PlanNode)> {
    let mut chain = Vec::new();
    let mut current = root;
    while is_fusible(&current.kind) {
        chain.push(current);
        current = current
            .children
            .first()
            .ok_or_else(|| internal!("Fused operator {} has no input", current.kind.name()))?;
    }
    if chain.is_empty() {
        return Err(internal!(
            "Codegen stage rooted at non-fusible operator {}",
            root.kind.name()
        ));
    }
    Ok((chain, current))
}

fn collect_aggregate_calls<'a>(expr: &'a Expression, calls: &mut Vec<&'a Expression>) {
    if let Expression::Aggregate { .. } = expr {
        if !calls.contains(&expr) {
            calls.push(expr);
        }
        return;
    }
    for child in expr.children() {
        collect_aggregate_calls(child, calls);
    }
}

fn literal_code(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Null => "None".to_string(),
        ScalarValue::Boolean(b) => b.to_string(),
        ScalarValue::Int32(v) => v.to_string(),
        ScalarValue::Int64(v) => format!("{v}i64"),
        ScalarValue::Float64(v) => format!("{v:?}"),
        ScalarValue::Utf8(s) => format!("{s:?}"),
    }
}

fn tuple(items: &[String]) -> String {
    match items {
        [single] => single.clone(),
        items => format!("({})", items.join(", ")),
    }
}

fn parenthesize(code: &str) -> String {
    if code.starts_with('(') && code.ends_with(')') {
        code.to_string()
    } else {
        format!("({code})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableRef;
    use crate::plan::{AggregateFunction, Attribute, DataType, JoinType};

    fn scan(table: &str, first_id: u64) -> PlanNode {
        PlanNode::new(
            NodeKind::HiveTableScan {
                table: TableRef::new("default", table),
            },
            Vec::new(),
            vec![
                Attribute::new("key", AttributeId(first_id), DataType::Int),
                Attribute::new("value", AttributeId(first_id + 1), DataType::String),
            ],
        )
    }

    fn stage(id: usize, child: PlanNode) -> PlanNode {
        PlanNode::passthrough(NodeKind::WholeStageCodegen { stage_id: id }, child)
    }

    fn generate(node: &PlanNode) -> String {
        LoopCodeGenerator
            .generate(node)
            .unwrap()
            .expect("fragment for stage")
            .source
    }

    #[test]
    fn non_stage_nodes_have_no_code() {
        assert_eq!(None, LoopCodeGenerator.generate(&scan("src", 0)).unwrap());
    }

    #[test]
    fn filter_over_scan() {
        let input = scan("src", 0);
        let cond = Expression::binary(
            BinaryOperator::Eq,
            Expression::Attribute(input.output[0].clone()),
            Expression::lit(123),
        );
        let filter = PlanNode::passthrough(NodeKind::FilterExec { condition: cond }, input);
        let source = generate(&stage(1, filter));

        let expected = [
            "// Stage 1: Filter",
            "// Input: HiveTableScan",
            "pub struct GeneratedIteratorForCodegenStage1 {",
            "    input: RowIterator,",
            "    output: Vec<Row>,",
            "}",
            "",
            "impl GeneratedIteratorForCodegenStage1 {",
            "    pub fn process_next(&mut self) {",
            "        while let Some(row) = self.input.next() {",
            "            let input_0 = row.get_int(0);",
            "            let input_1 = row.get_string(1);",
            "            // Filter",
            "            if !(input_0 == 123) {",
            "                continue;",
            "            }",
            "            self.output.push(Row::new(vec![input_0, input_1]));",
            "        }",
            "    }",
            "}",
        ]
        .join("\n");
        assert_eq!(expected, source);
    }

    #[test]
    fn aggregate_splits_loop() {
        let input = scan("src", 0);
        let key = Expression::Attribute(input.output[0].clone());
        let count = Expression::Alias {
            child: Box::new(Expression::Aggregate {
                func: AggregateFunction::Count,
                arg: Box::new(Expression::lit(1)),
            }),
            name: "_c1".to_string(),
            id: Some(AttributeId(2)),
        };
        let output = vec![input.output[0].clone(), count.to_attribute().unwrap()];
        let agg = PlanNode::new(
            NodeKind::HashAggregate {
                groups: vec![key.clone()],
                aggregates: vec![key, count],
            },
            vec![input],
            output,
        );
        let source = generate(&stage(1, agg));

        assert!(source.contains("acc_4.update_count(0, 1);"), "{source}");
        assert!(
            source.contains("for (group_key_3, acc_4) in self.agg_state_2.drain() {"),
            "{source}"
        );
        assert!(source.contains("let agg_out_5 = group_key_3;"), "{source}");
        assert!(source.contains("let agg_out_6 = acc_4.result(0);"), "{source}");
        assert!(
            source.contains("self.output.push(Row::new(vec![agg_out_5, agg_out_6]));"),
            "{source}"
        );
    }

    #[test]
    fn hash_join_probes_build_side() {
        let left = scan("a", 0);
        let right = scan("b", 2);
        let output: Vec<_> = left.output.iter().chain(right.output.iter()).cloned().collect();
        let join = PlanNode::new(
            NodeKind::BroadcastHashJoin {
                join_type: JoinType::Inner,
                left_keys: vec![Expression::Attribute(left.output[0].clone())],
                right_keys: vec![Expression::Attribute(right.output[0].clone())],
                condition: None,
            },
            vec![left, right],
            output,
        );
        let source = generate(&stage(1, join));

        assert!(
            source.contains("build_2: BroadcastRelation, // keys: [key#2]"),
            "{source}"
        );
        assert!(
            source.contains("for build_row in self.build_2.probe(&join_key_3) {"),
            "{source}"
        );
        let push = "self.output.push(Row::new(vec![input_0, input_1, build_col_4, build_col_5]));";
        assert!(source.contains(push), "{source}");
    }

    #[test]
    fn missing_attribute_is_internal() {
        let input = scan("src", 0);
        let cond = Expression::binary(
            BinaryOperator::Eq,
            Expression::Attribute(Attribute::new("other", AttributeId(9), DataType::Int)),
            Expression::lit(1),
        );
        let filter = PlanNode::passthrough(NodeKind::FilterExec { condition: cond }, input);
        let err = LoopCodeGenerator.generate(&stage(1, filter)).unwrap_err();
        assert_eq!(planscope_error::ErrorKind::Internal, err.kind());
    }
}
