use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    #[default]
    Bar,
}

/// One bar trace: `x` holds the category labels, `y` the matching counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarSeries {
    #[serde(rename = "type", default)]
    pub kind: SeriesKind,
    pub x: Vec<String>,
    pub y: Vec<u64>,
}

/// Chart description in the shape Plotly takes as its `data` argument.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartDocument {
    pub series: Vec<BarSeries>,
}

impl ChartDocument {
    pub fn single_bar(x: Vec<String>, y: Vec<u64>) -> Self {
        Self {
            series: vec![BarSeries {
                kind: SeriesKind::Bar,
                x,
                y,
            }],
        }
    }

    pub fn total(&self) -> u64 {
        self.series.iter().flat_map(|s| s.y.iter()).sum()
    }
}
