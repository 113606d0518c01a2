use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::{definition::BeanDefinition, errors::BeanError};

/// Holds the bean definitions by name
pub trait BeanDefinitionRegistry: Send + Sync {
    /// Registers a definition, fails if the name is already taken
    fn register_bean_definition(
        &self,
        name: &str,
        definition: BeanDefinition,
    ) -> Result<(), BeanError>;

    /// Removes a definition, fails if there is none under the name
    fn remove_bean_definition(&self, name: &str) -> Result<(), BeanError>;

    fn get_bean_definition(&self, name: &str) -> Result<Arc<BeanDefinition>, BeanError>;

    /// Visits every registered definition once, in no particular order.
    ///
    /// The registry must not be modified from within the visitor.
    fn visit_bean_definitions(&self, visitor: &mut dyn FnMut(&str, &Arc<BeanDefinition>));
}

/// Registry backed by a map behind a read/write lock
#[derive(Default)]
pub struct DefaultBeanDefinitionRegistry {
    definitions: RwLock<HashMap<String, Arc<BeanDefinition>>>,
}

impl DefaultBeanDefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.definitions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.read().is_empty()
    }
}

impl BeanDefinitionRegistry for DefaultBeanDefinitionRegistry {
    fn register_bean_definition(
        &self,
        name: &str,
        definition: BeanDefinition,
    ) -> Result<(), BeanError> {
        let mut definitions = self.definitions.write();
        if definitions.contains_key(name) {
            return Err(BeanError::DuplicateDefinition(name.to_string()));
        }

        tracing::debug!(bean = name, bean_type = %definition.type_info(), "register bean definition");
        definitions.insert(name.to_string(), Arc::new(definition));
        Ok(())
    }

    fn remove_bean_definition(&self, name: &str) -> Result<(), BeanError> {
        match self.definitions.write().remove(name) {
            Some(_) => Ok(()),
            None => Err(BeanError::DefinitionNotFound(name.to_string())),
        }
    }

    fn get_bean_definition(&self, name: &str) -> Result<Arc<BeanDefinition>, BeanError> {
        self.definitions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BeanError::DefinitionNotFound(name.to_string()))
    }

    fn visit_bean_definitions(&self, visitor: &mut dyn FnMut(&str, &Arc<BeanDefinition>)) {
        for (name, definition) in self.definitions.read().iter() {
            visitor(name, definition);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bean::Bean, bean::Component, scope::BeanScope};

    #[derive(Default)]
    struct Cache;
    impl Bean for Cache {}
    impl Component for Cache {}

    fn definition(scope: BeanScope) -> BeanDefinition {
        BeanDefinition::builder::<Cache>().scope(scope).build().unwrap()
    }

    #[test]
    fn duplicate_keeps_first_definition() {
        let registry = DefaultBeanDefinitionRegistry::new();
        registry
            .register_bean_definition("cache", definition(BeanScope::Singleton))
            .unwrap();

        let err = registry
            .register_bean_definition("cache", definition(BeanScope::Prototype))
            .unwrap_err();
        assert!(err.is_duplicate());

        let kept = registry.get_bean_definition("cache").unwrap();
        assert_eq!(kept.scope(), BeanScope::Singleton);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_and_lookup_report_not_found() {
        let registry = DefaultBeanDefinitionRegistry::new();
        assert!(registry.remove_bean_definition("cache").unwrap_err().is_not_found());
        assert!(registry.get_bean_definition("cache").unwrap_err().is_not_found());

        registry
            .register_bean_definition("cache", definition(BeanScope::Singleton))
            .unwrap();
        registry.remove_bean_definition("cache").unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn visits_every_definition_once() {
        let registry = DefaultBeanDefinitionRegistry::new();
        for name in ["a", "b", "c"] {
            registry
                .register_bean_definition(name, definition(BeanScope::Singleton))
                .unwrap();
        }

        let mut seen = Vec::new();
        registry.visit_bean_definitions(&mut |name, _| seen.push(name.to_string()));
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c"]);
    }
}
