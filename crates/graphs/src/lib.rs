//! Parquet I/O for proof-state graph data.
//!
//! Renders proof states (selected clauses plus candidate actions) as
//! directed term graphs and reads/writes them as Parquet files for
//! training clause-selection models.

pub mod builder;
pub mod parse;
pub mod reader;
pub mod types;
pub mod writer;

pub use builder::{GraphBuilder, GraphParts, NodeKind};
pub use parse::{parse_clause_body, Literal, ParseError, Term};
pub use reader::GraphReader;
pub use types::{GraphError, GraphRecord, GraphSummary};
pub use writer::{graph_schema, GraphWriter};
