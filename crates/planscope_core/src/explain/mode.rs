use planscope_error::{ExplainError, Result};
use planscope_parser::ast::ExplainModifier;
use serde::{Deserialize, Serialize};

use crate::plan::Stage;

/// Which sections an explain renders, and what they're annotated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderingPolicy {
    pub show_parsed: bool,
    pub show_analyzed: bool,
    pub show_optimized: bool,
    pub show_physical: bool,
    pub show_cost: bool,
    pub show_codegen: bool,
}

impl RenderingPolicy {
    /// Resolve explain modifiers into a policy.
    ///
    /// At most one modifier is accepted. `EXTENDED CODEGEN` is rejected as
    /// mutually exclusive, and every other combination is rejected as
    /// unsupported.
    pub fn resolve(modifiers: &[ExplainModifier]) -> Result<Self> {
        match modifiers {
            [] => Ok(RenderingPolicy {
                show_physical: true,
                ..Default::default()
            }),
            [ExplainModifier::Extended] => Ok(RenderingPolicy {
                show_parsed: true,
                show_analyzed: true,
                show_optimized: true,
                show_physical: true,
                ..Default::default()
            }),
            [ExplainModifier::Cost] => Ok(RenderingPolicy {
                show_optimized: true,
                show_physical: true,
                show_cost: true,
                ..Default::default()
            }),
            [ExplainModifier::Codegen] => Ok(RenderingPolicy {
                show_codegen: true,
                ..Default::default()
            }),
            [ExplainModifier::Extended, ExplainModifier::Codegen]
            | [ExplainModifier::Codegen, ExplainModifier::Extended] => Err(ExplainError::parse(
                "EXPLAIN EXTENDED and EXPLAIN CODEGEN are mutually exclusive",
            )),
            other => {
                let names: Vec<_> = other.iter().map(|m| m.to_string()).collect();
                Err(ExplainError::parse(format!(
                    "Unsupported combination of EXPLAIN modifiers: {}",
                    names.join(" ")
                )))
            }
        }
    }

    /// Whether the section for a stage is rendered as a plan tree.
    pub const fn shows(&self, stage: Stage) -> bool {
        match stage {
            Stage::Parsed => self.show_parsed,
            Stage::Analyzed => self.show_analyzed,
            Stage::Optimized => self.show_optimized,
            Stage::Physical => self.show_physical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ExplainModifier::*;

    #[test]
    fn valid_modifiers() {
        // (modifiers, parsed, analyzed, optimized, physical, cost, codegen)
        let tests: [(&[ExplainModifier], _); 4] = [
            (&[], [false, false, false, true, false, false]),
            (&[Extended], [true, true, true, true, false, false]),
            (&[Cost], [false, false, true, true, true, false]),
            (&[Codegen], [false, false, false, false, false, true]),
        ];

        for (modifiers, expected) in tests {
            let p = RenderingPolicy::resolve(modifiers).unwrap();
            let got = [
                p.show_parsed,
                p.show_analyzed,
                p.show_optimized,
                p.show_physical,
                p.show_cost,
                p.show_codegen,
            ];
            assert_eq!(expected, got, "modifiers: {modifiers:?}");
        }
    }

    #[test]
    fn extended_codegen_exclusive() {
        for modifiers in [[Extended, Codegen], [Codegen, Extended]] {
            let err = RenderingPolicy::resolve(&modifiers).unwrap_err();
            assert_eq!(planscope_error::ErrorKind::Parse, err.kind());
            assert!(err.message().contains("mutually exclusive"), "{err}");
        }
    }

    #[test]
    fn unsupported_combinations() {
        let tests: [&[ExplainModifier]; 5] = [
            &[Cost, Codegen],
            &[Extended, Cost],
            &[Cost, Cost],
            &[Extended, Extended],
            &[Extended, Cost, Codegen],
        ];

        for modifiers in tests {
            let err = RenderingPolicy::resolve(modifiers).unwrap_err();
            assert_eq!(planscope_error::ErrorKind::Parse, err.kind(), "{modifiers:?}");
            assert!(err.message().starts_with("Unsupported combination"), "{err}");
        }
    }
}
