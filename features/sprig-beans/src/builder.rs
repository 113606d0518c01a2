use std::{sync::Arc, time::Duration};

use serde_json::Value;
use sprig_props::{MemoryProperties, Properties};

use crate::{
    bean::{Bean, Component},
    definition::BeanDefinition,
    errors::BeanError,
    factory::BeanFactory,
    post_processor::BeanPostProcessor,
    registry::{BeanDefinitionRegistry, DefaultBeanDefinitionRegistry},
};

type Registration = Box<dyn FnOnce(&BeanFactory) -> Result<(), BeanError> + Send>;

/// Assembles a [`BeanFactory`] and pre-instantiates its singletons.
///
/// Registrations are applied in the order they were added:
///
/// ```rust
/// use sprig_beans::{Bean, BeanFactoryBuilder, Component};
///
/// #[derive(Default)]
/// struct Clock;
/// impl Bean for Clock {}
/// impl Component for Clock {}
///
/// let factory = BeanFactoryBuilder::new()
///     .property("app.name", "demo".into())
///     .component::<Clock>()
///     .build()
///     .unwrap();
///
/// assert!(factory.get_bean("Clock").unwrap().is::<Clock>());
/// ```
pub struct BeanFactoryBuilder {
    properties: Option<Arc<dyn Properties>>,
    property_values: Vec<(String, Value)>,
    registry: Option<Arc<dyn BeanDefinitionRegistry>>,
    concurrency: Option<usize>,
    registrations: Vec<Registration>,
}
impl Default for BeanFactoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BeanFactoryBuilder {
    pub fn new() -> Self {
        BeanFactoryBuilder {
            properties: None,
            property_values: Vec::new(),
            registry: None,
            concurrency: None,
            registrations: Vec::new(),
        }
    }
}
impl BeanFactoryBuilder {
    /// Property source of the factory, defaults to an empty [`MemoryProperties`]
    pub fn properties<P: Properties + 'static>(self, properties: P) -> Self {
        self.shared_properties(Arc::new(properties))
    }

    pub fn shared_properties(mut self, properties: Arc<dyn Properties>) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Sets a property before any bean is created
    pub fn property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.property_values.push((key.into(), value));
        self
    }

    pub fn registry(mut self, registry: Arc<dyn BeanDefinitionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Number of threads creating singletons, defaults to the number of cpus
    pub fn concurrency(mut self, threads: usize) -> Self {
        self.concurrency = Some(threads);
        self
    }

    pub fn post_processor<P: BeanPostProcessor + 'static>(self, processor: P) -> Self {
        self.register(move |factory| {
            factory.add_bean_post_processor(Arc::new(processor));
            Ok(())
        })
    }

    pub fn definition(self, name: impl Into<String>, definition: BeanDefinition) -> Self {
        let name = name.into();
        self.register(move |factory| factory.register_bean_definition(&name, definition))
    }

    /// Registers `T` with a default definition under its short type name
    pub fn component<T: Component>(self) -> Self {
        self.register(|factory| factory.register_definition(BeanDefinition::new::<T>()?))
    }

    pub fn singleton<T: Bean>(self, name: impl Into<String>, bean: Arc<T>) -> Self {
        let name = name.into();
        self.register(move |factory| factory.register_singleton(&name, bean))
    }

    fn register(
        mut self,
        registration: impl FnOnce(&BeanFactory) -> Result<(), BeanError> + Send + 'static,
    ) -> Self {
        self.registrations.push(Box::new(registration));
        self
    }

    pub fn build(self) -> Result<BeanFactory, BeanError> {
        let factory = self.assemble()?;
        factory.pre_instantiate_singletons()?;
        Ok(factory)
    }

    pub fn build_timeout(self, timeout: Duration) -> Result<BeanFactory, BeanError> {
        let factory = self.assemble()?;
        factory.pre_instantiate_singletons_timeout(timeout)?;
        Ok(factory)
    }

    /// The factory with everything registered, nothing instantiated yet
    pub fn assemble(self) -> Result<BeanFactory, BeanError> {
        let BeanFactoryBuilder {
            properties,
            property_values,
            registry,
            concurrency,
            registrations,
        } = self;

        let properties = properties.unwrap_or_else(|| Arc::new(MemoryProperties::new()));
        for (key, value) in property_values {
            properties.set(&key, value)?;
        }

        let registry =
            registry.unwrap_or_else(|| Arc::new(DefaultBeanDefinitionRegistry::new()));
        let factory = BeanFactory::from_parts(registry, properties, concurrency);

        tracing::debug!(
            "Assembling bean factory with {} registrations",
            registrations.len()
        );
        for registration in registrations {
            registration(&factory)?;
        }

        Ok(factory)
    }
}
