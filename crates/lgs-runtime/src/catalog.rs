//! Compiled-in catalogue of job types.
//!
//! The settings document refers to job types by name. The catalogue turns
//! those names back into implementations. It is populated by an explicit
//! bootstrap call in the composition root; there is no global registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::game_type::{GameType, GenericServer};

/// Job types known to this process, keyed by [`GameType::type_name`].
#[derive(Clone)]
pub struct TypeCatalog {
    types: BTreeMap<&'static str, Arc<dyn GameType>>,
    generic: Arc<dyn GameType>,
}

impl std::fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeCatalog")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeCatalog {
    /// A catalogue holding only the generic fallback type.
    pub fn new() -> Self {
        let generic: Arc<dyn GameType> = Arc::new(GenericServer);
        let mut types = BTreeMap::new();
        types.insert(generic.type_name(), Arc::clone(&generic));
        Self { types, generic }
    }

    /// Add a type. A later type with the same name replaces the earlier one.
    #[must_use]
    pub fn with(mut self, kind: impl GameType) -> Self {
        self.insert(Arc::new(kind));
        self
    }

    pub fn insert(&mut self, kind: Arc<dyn GameType>) {
        self.types.insert(kind.type_name(), kind);
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<dyn GameType>> {
        self.types.get(type_name).cloned()
    }

    /// Type used when no registered identifier matches.
    pub fn generic(&self) -> Arc<dyn GameType> {
        Arc::clone(&self.generic)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn GameType>> {
        self.types.values()
    }

    /// `(default identifier, type)` for every type that declares one.
    pub fn defaults(&self) -> impl Iterator<Item = (&'static str, &Arc<dyn GameType>)> {
        self.types
            .values()
            .filter_map(|kind| kind.default_identifier().map(|id| (id, kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_type::GENERIC_TYPE_NAME;
    use async_trait::async_trait;

    struct Named;

    #[async_trait]
    impl GameType for Named {
        fn type_name(&self) -> &'static str {
            "Named"
        }

        fn default_identifier(&self) -> Option<&'static str> {
            Some("named")
        }

        fn startup_command(&self) -> &'static str {
            "./named"
        }
    }

    #[test]
    fn new_catalog_only_knows_generic() {
        let catalog = TypeCatalog::new();
        assert!(catalog.get(GENERIC_TYPE_NAME).is_some());
        assert_eq!(catalog.iter().count(), 1);
        assert_eq!(catalog.defaults().count(), 0);
    }

    #[test]
    fn defaults_list_declared_identifiers() {
        let catalog = TypeCatalog::new().with(Named);
        let defaults: Vec<(&str, &str)> = catalog
            .defaults()
            .map(|(id, kind)| (id, kind.type_name()))
            .collect();
        assert_eq!(defaults, vec![("named", "Named")]);
        assert!(catalog.get("Missing").is_none());
    }
}
