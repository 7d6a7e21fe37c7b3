use std::fs;
use std::path::Path;

use crate::core::error::{SansError, SansResult};
use crate::core::model::ModelParameters;

/// Loads a model description from a JSON file, e.g.
///
/// ```json
/// { "model": "sphere", "radius": 50.0, "sld": 1.0, "sld_solvent": 0.0 }
/// ```
pub fn load_model_parameters(path: &Path) -> SansResult<ModelParameters> {
    let text = fs::read_to_string(path).map_err(|source| SansError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}
