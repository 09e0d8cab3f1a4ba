//! Hook table: event name → handler URIs.

use std::collections::{BTreeMap, HashMap};

use crate::config::EngineConfig;

/// Handlers to run for each named event, in configured order.
///
/// Built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<String, Vec<String>>,
}

impl HookRegistry {
    pub fn new(hooks: HashMap<String, Vec<String>>) -> Self {
        Self { hooks }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.hooks.clone())
    }

    /// Handler URIs registered for `name`, or `None` for an unknown hook.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.hooks.get(name).map(Vec::as_slice)
    }

    /// Every hook with its handlers, ordered by hook name.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<String>> {
        self.hooks
            .iter()
            .map(|(name, uris)| (name.clone(), uris.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_preserves_order() {
        let config: EngineConfig = toml::from_str(
            r#"
            [hooks]
            on_save = ["search/reindex", "audit/log"]
            "#,
        )
        .unwrap();
        let hooks = HookRegistry::from_config(&config);

        assert_eq!(hooks.get("on_save").unwrap(), ["search/reindex", "audit/log"]);
        assert!(hooks.get("on_delete").is_none());
        assert_eq!(hooks.snapshot().keys().collect::<Vec<_>>(), vec!["on_save"]);
    }
}
