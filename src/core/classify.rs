//! Collection classification: which collections feed the consolidation and
//! in which historical format.

use serde::Serialize;

/// Name prefixes owned by the database itself; never migration sources.
pub const INTERNAL_PREFIXES: &[&str] = &["system.", "sqlite_"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// `<prefix><game>` collections; events nest their payload under a sub-object.
    Prefixed,
    /// Per-game collections from before the prefix existed; already flat.
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCollection {
    pub name: String,
    pub classification: String,
    pub format: SourceFormat,
    pub flatten: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionPlan {
    pub prefixed: Vec<SourceCollection>,
    pub raw: Vec<SourceCollection>,
    pub excluded: Vec<String>,
}

impl CollectionPlan {
    /// Sources in processing order: prefixed first, then raw.
    pub fn sources(&self) -> impl Iterator<Item = &SourceCollection> {
        self.prefixed.iter().chain(self.raw.iter())
    }

    pub fn source_count(&self) -> usize {
        self.prefixed.len() + self.raw.len()
    }
}

/// Partition `names` into prefixed sources, raw sources and excluded names.
///
/// Every name lands in exactly one bucket. Reserved and internal names are
/// checked before the prefix, ignoring ASCII case since collection names
/// resolve case-insensitively in the store. Names that would classify as the empty string
/// (an empty name, or the bare prefix) are excluded. Input order is preserved within each bucket.
pub fn classify_collections(names: &[String], prefix: &str, reserved: &[String]) -> CollectionPlan {
    let mut plan = CollectionPlan::default();
    for name in names {
        let folded = name.to_ascii_lowercase();
        let internal = INTERNAL_PREFIXES.iter().any(|p| folded.starts_with(p));
        if name.is_empty() || internal || reserved.iter().any(|r| r.eq_ignore_ascii_case(name)) {
            plan.excluded.push(name.clone());
            continue;
        }
        match name.strip_prefix(prefix) {
            Some("") => plan.excluded.push(name.clone()),
            Some(game) => plan.prefixed.push(SourceCollection {
                name: name.clone(),
                classification: game.to_string(),
                format: SourceFormat::Prefixed,
                flatten: true,
            }),
            None => plan.raw.push(SourceCollection {
                name: name.clone(),
                classification: name.clone(),
                format: SourceFormat::Raw,
                flatten: false,
            }),
        }
    }
    plan
}
