use insta::{assert_debug_snapshot, assert_snapshot};
use planscope_error::ErrorKind;
use planscope_parser::ast::{ExplainModifier, SelectExpr};
use planscope_parser::parser::{parse, parse_one};
use planscope_parser::statement::Statement;

#[test]
fn parse_set_to_bool() {
    assert_debug_snapshot!(parse("set enable_cbo to true").unwrap(), @r###"
    [
        SetVariable(
            SetVariable {
                reference: ObjectReference(
                    [
                        Ident {
                            value: "enable_cbo",
                            quoted: false,
                            span: Some(
                                Span {
                                    line: 1,
                                    column: 5,
                                },
                            ),
                        },
                    ],
                ),
                value: Literal(
                    Boolean(
                        true,
                    ),
                ),
            },
        ),
    ]
    "###);
}

#[test]
fn parse_explain_modifiers() {
    let modifiers = |sql: &str| match parse_one(sql).unwrap() {
        Statement::Explain(explain) => explain.modifiers,
        other => panic!("not an explain: {other:?}"),
    };

    assert_debug_snapshot!(modifiers("EXPLAIN SELECT 1"), @"[]");
    assert_debug_snapshot!(modifiers("EXPLAIN COST SELECT 1"), @r###"
    [
        Cost,
    ]
    "###);
    assert_eq!(
        vec![ExplainModifier::Extended, ExplainModifier::Codegen],
        modifiers("EXPLAIN EXTENDED CODEGEN SELECT 1")
    );
}

#[test]
fn parse_select_list() {
    let stmt = parse_one("SELECT key, value AS v, count(*) FROM src GROUP BY key, value").unwrap();
    let query = match stmt {
        Statement::Query(query) => query,
        other => panic!("not a query: {other:?}"),
    };
    assert_eq!(3, query.body.projections.len());
    assert!(matches!(query.body.projections[1], SelectExpr::AliasedExpr(_, _)));
    assert_eq!(2, query.body.group_by.len());
}

#[test]
fn parse_error_has_span() {
    let err = parse("SELECT key FROM src WHERE").unwrap_err();
    assert_eq!(ErrorKind::Parse, err.kind());
    assert_snapshot!(err, @"Parse error: Expected prefix expression, found end of statement");
}

#[test]
fn parse_error_unexpected_token() {
    let err = parse("SELECT key FROM src WHERE )").unwrap_err();
    assert_snapshot!(
        err,
        @"Parse error: Unexpected token 'RightParen'. Expected expression. (at line 1, column 27)"
    );
}

#[test]
fn parse_multiple_statements() {
    let stmts = parse(
        "CREATE TABLE src (key INT, value STRING);
         ANALYZE TABLE src COMPUTE STATISTICS;
         REFRESH TABLE src;
         EXPLAIN EXTENDED SELECT * FROM src",
    )
    .unwrap();
    let kinds: Vec<_> = stmts.iter().map(|s| s.kind_name()).collect();
    assert_eq!(
        vec!["CREATE TABLE", "ANALYZE TABLE", "REFRESH TABLE", "EXPLAIN"],
        kinds
    );
}
