//! Serialization of chart documents to the JSON handed to the browser and the
//! broadcast channel.

use thiserror::Error;

use crate::model::chart::ChartDocument;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("failed to serialize chart document: {0}")]
    Serialize(#[source] serde_json::Error),

    #[cfg(test)]
    #[error("failed to parse chart document: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("bar series {index} has {labels} labels but {values} values")]
    Mismatched {
        index: usize,
        labels: usize,
        values: usize,
    },
}

fn check_lengths(doc: &ChartDocument) -> Result<(), ChartError> {
    for (index, series) in doc.series.iter().enumerate() {
        if series.x.len() != series.y.len() {
            return Err(ChartError::Mismatched {
                index,
                labels: series.x.len(),
                values: series.y.len(),
            });
        }
    }
    Ok(())
}

/// Serialize to a Plotly `data` array, e.g. `[{"type":"bar","x":[..],"y":[..]}]`.
pub fn to_json(doc: &ChartDocument) -> Result<String, ChartError> {
    check_lengths(doc)?;
    serde_json::to_string(doc).map_err(ChartError::Serialize)
}

/// Inverse of `to_json`, for checking what was sent.
#[cfg(test)]
pub fn from_json(json: &str) -> Result<ChartDocument, ChartError> {
    let doc: ChartDocument = serde_json::from_str(json).map_err(ChartError::Parse)?;
    check_lengths(&doc)?;
    Ok(doc)
}
