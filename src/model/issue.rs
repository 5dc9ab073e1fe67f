use serde::Deserialize;

/// Sprint name used for issues that are not in any sprint.
pub const BACKLOG: &str = "Backlog";

/// Sprint reference carried on an issue's sprint field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SprintRef {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub key: String,
    pub summary: String,
    pub status: Option<String>,
    /// First sprint the issue is assigned to, if any.
    pub sprint: Option<SprintRef>,
}

/// Sprint as listed on an agile board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprint {
    pub id: u64,
    pub name: String,
    pub state: Option<String>,
}

/// Tech-debt issue resolved to the sprint it is counted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TechDebtIssue {
    pub key: String,
    pub sprint: String,
}

/// In-progress issue with no in-progress child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdlePbi {
    pub key: String,
    pub summary: String,
}
