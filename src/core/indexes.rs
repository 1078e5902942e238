use crate::core::store::{DocumentStore, IndexSpec};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub name: String,
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Create every index in `specs` on `target`. A failing index is reported
/// and the rest are still attempted.
pub fn build_indexes(
    store: &dyn DocumentStore,
    target: &str,
    specs: &[IndexSpec],
) -> Vec<IndexReport> {
    specs
        .iter()
        .map(|spec| match store.create_index(target, spec) {
            Ok(()) => IndexReport {
                name: spec.name.clone(),
                created: true,
                error: None,
            },
            Err(e) => IndexReport {
                name: spec.name.clone(),
                created: false,
                error: Some(e.to_string()),
            },
        })
        .collect()
}
