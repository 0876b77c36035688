//! Plan tree shared by every stage of compilation.
pub mod attribute;
pub mod datatype;
pub mod expr;
pub mod node;
pub mod scalar;
pub mod stage;

pub use attribute::{Attribute, AttributeId};
pub use datatype::DataType;
pub use expr::{AggregateFunction, BinaryOperator, Expression, UnaryOperator};
pub use node::{JoinType, NodeKind, PlanNode};
pub use scalar::ScalarValue;
pub use stage::{Stage, StageSnapshot};
