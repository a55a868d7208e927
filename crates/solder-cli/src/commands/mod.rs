pub mod graph_check;
pub mod plan;
pub mod resolve;
