//! Parsed JSON body, alive only for one masking pass.

use serde_json::Value;

use crate::masking::fields::mask_top_level_fields;
use crate::masking::path::{mask_paths, PathRule};
use crate::masking::predicate::MaskPredicate;

/// A JSON body being masked.
#[derive(Debug)]
pub struct MaskedDocument {
    root: Value,
}

impl MaskedDocument {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            root: serde_json::from_str(text)?,
        })
    }

    /// Shallow pass over top-level keys.
    pub fn mask_fields(&mut self, predicate: &MaskPredicate) -> usize {
        mask_top_level_fields(&mut self.root, predicate)
    }

    /// Deep pass over `rules`, in order.
    pub fn mask_paths(&mut self, rules: &[PathRule]) -> usize {
        mask_paths(&mut self.root, rules)
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Compact JSON text of the masked document.
    pub fn into_json(self) -> String {
        self.root.to_string()
    }
}

/// Mask a JSON body: top-level fields first, then paths.
///
/// Fails only when `text` is not JSON; the caller keeps the original text.
pub fn mask_json(
    text: &str,
    fields: &MaskPredicate,
    paths: &[PathRule],
) -> Result<String, serde_json::Error> {
    let mut doc = MaskedDocument::parse(text)?;
    doc.mask_fields(fields);
    doc.mask_paths(paths);
    Ok(doc.into_json())
}
