//! Stage catalogs: the fixed, ordered phase lists a run progresses through.
//!
//! Catalogs are pure data. Validation happens once at construction so that a
//! bad configuration fails at setup, never mid-run.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// One named stage in a catalog. The payload is opaque display data (token
/// lists, tree shapes, check results, output lines); the engine carries it
/// but never interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl Phase {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: None,
        }
    }

    pub fn with_payload(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload: Some(payload),
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("stage catalog must contain at least one phase")]
    Empty,
    #[error("duplicate phase name in stage catalog: {name}")]
    DuplicatePhase { name: String },
}

/// Immutable ordered sequence of phases for one scenario. Index is phase rank.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CatalogSpec", into = "CatalogSpec")]
pub struct StageCatalog {
    phases: Vec<Phase>,
}

/// Raw wire shape for catalog files; converted into a validated `StageCatalog`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogSpec {
    phases: Vec<Phase>,
}

impl TryFrom<CatalogSpec> for StageCatalog {
    type Error = CatalogError;

    fn try_from(spec: CatalogSpec) -> Result<Self, Self::Error> {
        StageCatalog::new(spec.phases)
    }
}

impl From<StageCatalog> for CatalogSpec {
    fn from(catalog: StageCatalog) -> Self {
        CatalogSpec {
            phases: catalog.phases,
        }
    }
}

impl StageCatalog {
    pub fn new(phases: Vec<Phase>) -> Result<Self, CatalogError> {
        if phases.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for phase in &phases {
            if !seen.insert(phase.name.as_str()) {
                return Err(CatalogError::DuplicatePhase {
                    name: phase.name.clone(),
                });
            }
        }
        Ok(Self { phases })
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Always false for a constructed catalog; exists to pair with `len`.
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn phase(&self, index: usize) -> Option<&Phase> {
        self.phases.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_catalog() {
        assert!(matches!(
            StageCatalog::new(Vec::new()),
            Err(CatalogError::Empty)
        ));
    }

    #[test]
    fn rejects_duplicate_phase_names() {
        let err = StageCatalog::new(vec![Phase::named("Lexical"), Phase::named("Lexical")])
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicatePhase { name } if name == "Lexical"));
    }

    #[test]
    fn preserves_phase_order() {
        let catalog =
            StageCatalog::new(vec![Phase::named("Lexical"), Phase::named("Syntax")]).unwrap();
        let names: Vec<_> = catalog.phases().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Lexical", "Syntax"]);
    }

    #[test]
    fn payload_is_carried_untouched() {
        let payload = serde_json::json!({ "tokens": ["let", "a", "be", "10"] });
        let catalog =
            StageCatalog::new(vec![Phase::with_payload("Lexical", payload.clone())]).unwrap();
        assert_eq!(catalog.phase(0).unwrap().payload.as_ref(), Some(&payload));
    }

    #[test]
    fn deserialization_validates() {
        let ok: Result<StageCatalog, _> =
            serde_json::from_str(r#"{ "phases": [ { "name": "Lexical" } ] }"#);
        assert!(ok.is_ok());

        let empty: Result<StageCatalog, _> = serde_json::from_str(r#"{ "phases": [] }"#);
        assert!(empty.is_err());

        let dup: Result<StageCatalog, _> = serde_json::from_str(
            r#"{ "phases": [ { "name": "Lexical" }, { "name": "Lexical" } ] }"#,
        );
        assert!(dup.is_err());
    }
}
