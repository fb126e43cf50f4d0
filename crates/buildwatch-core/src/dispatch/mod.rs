//! Dispatch - filter / mapper / planner
//!
//! notification 1 件に対する純粋な判断ロジック。I/O も状態も持たず、
//! 設定から一度だけ構築して `Arc` で共有します。

pub mod filter;
pub mod mapper;
pub mod planner;
pub mod transform;

pub use self::filter::{FilterCriteria, Rejection, Verdict};
pub use self::mapper::{ParameterMapper, ParameterRule, RuleTable, ValueSource};
pub use self::planner::DispatchPlanner;
pub use self::transform::{Transform, UnknownTransform};
