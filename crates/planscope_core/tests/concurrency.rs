use std::thread;

use planscope_core::testutil::engine_with_src;

const QUERIES: [&str; 3] = [
    "EXPLAIN EXTENDED SELECT * FROM src WHERE key = 123",
    "EXPLAIN EXTENDED SELECT a.key, b.value FROM src a JOIN src b ON a.key = b.key",
    "EXPLAIN CODEGEN SELECT key, count(*) FROM src GROUP BY key",
];

#[test]
fn concurrent_sessions_match_sequential() {
    let (engine, mut session) = engine_with_src().unwrap();

    let expected: Vec<Vec<String>> = QUERIES
        .iter()
        .map(|q| session.sql(q).unwrap().remove(0).lines)
        .collect();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                let mut session = engine.new_session();
                let mut outputs = Vec::new();
                for _ in 0..10 {
                    for query in QUERIES {
                        outputs.push(session.sql(query).unwrap().remove(0).lines);
                    }
                }
                outputs
            })
        })
        .collect();

    for handle in handles {
        let outputs = handle.join().unwrap();
        for (idx, got) in outputs.iter().enumerate() {
            assert_eq!(&expected[idx % QUERIES.len()], got);
        }
    }
}
