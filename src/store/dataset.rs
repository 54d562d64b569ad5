use std::io;
use std::path::Path;
use thiserror::Error as ThisError;
use tracing::{info, warn};

use crate::listing::Listing;

#[derive(Debug, ThisError)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to parse dataset {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Loads the listings the store serves from a JSON array on disk. A missing file is an empty
/// dataset.
pub async fn load(path: impl AsRef<Path>) -> Result<Vec<Listing>, DatasetError> {
    let path = path.as_ref();
    let path_str = path.display().to_string();

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Dataset {} not found, serving no listings", path_str);
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(DatasetError::Read {
                path: path_str,
                source,
            })
        }
    };

    let listings = parse(&bytes).map_err(|source| DatasetError::Parse {
        path: path_str.clone(),
        source,
    })?;

    info!("Loaded {} listings from {}", listings.len(), path_str);
    Ok(listings)
}

pub fn parse(bytes: &[u8]) -> Result<Vec<Listing>, serde_json::Error> {
    serde_json::from_slice(bytes)
}
