pub mod chart;
pub mod issue;
