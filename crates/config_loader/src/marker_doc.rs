//! Marker-input document parser
//!
//! ```json
//! { "lsl": { "marker": { "name": "PsychoPyMarkers", "sourceId": "stim-pc-1" } } }
//! ```

use contracts::{ConfigError, MarkerInputSpec};

use crate::document::{member, parse_document, path, scalar_text};

const NAME_LABEL: &str = "name";
const SOURCE_ID_LABEL: &str = "sourceId";

/// Parse and validate a marker-input document
///
/// # Errors
/// - `TagNotFound` for a missing `lsl`, `marker` or `name`
/// - `ValueMismatch` for an empty `name`
/// - `FormatIncorrect` for invalid JSON or array/object values
///
/// Scalar values are taken in text form, so a numeric `name` is accepted and
/// a `null` `sourceId` binds by name only.
pub fn parse_marker_input(text: &str) -> Result<MarkerInputSpec, ConfigError> {
    let doc = parse_document(text)?;
    let marker = path(&doc, &["lsl", "marker"])?;

    let name = scalar_text(member(marker, NAME_LABEL)?, NAME_LABEL)?;
    if name.is_empty() {
        return Err(ConfigError::value_mismatch("marker name must not be empty"));
    }

    let source_id = match marker.get(SOURCE_ID_LABEL) {
        None => None,
        Some(value) => {
            let id = scalar_text(value, SOURCE_ID_LABEL)?;
            // An empty id binds by name only
            (!id.is_empty()).then_some(id)
        }
    };

    Ok(MarkerInputSpec { name, source_id })
}
