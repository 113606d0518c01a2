use std::{
    collections::{HashMap, HashSet},
    fmt::Debug,
    sync::{Arc, Weak},
    time::Duration,
};

use parking_lot::Mutex;
use serde_json::Value;
use sprig_props::{GetOptions, MemoryProperties, Properties, PropertiesExt, PropertyType};

use crate::{
    bean::{indirect_to, Bean},
    candidates::{sort_by_priority, Candidates},
    constructor::ConstructorArgumentResolver,
    definition::{BeanDefinition, Casts},
    descriptor::{BeanRef, BeanTarget, FieldDescriptor, Injection, PropertyRef, PropertyTarget},
    errors::BeanError,
    initiator::SingletonInitiator,
    post_processor::{BeanAwareProcessor, BeanPostProcessor, BeanPostProcessorCompositor},
    property_values::PropertyValues,
    registry::{BeanDefinitionRegistry, DefaultBeanDefinitionRegistry},
    scope::{BeanScope, Scope},
    types::{BeanObject, Injectable, TypeInfo, WiredValue},
};

/// Creates, wires and caches beans from the registered definitions.
///
/// The factory is a cheap handle, clones share the same registry and caches.
#[derive(Clone)]
pub struct BeanFactory(pub(crate) Arc<BeanFactoryInner>);

pub(crate) struct BeanFactoryInner {
    registry: Arc<dyn BeanDefinitionRegistry>,
    properties: Arc<dyn Properties>,
    /// Parallelism of the pre-instantiation, `None` uses the number of cpus
    pub(crate) concurrency: Option<usize>,
    /// Held for the whole resolution tree of a `get_bean` call
    state: Mutex<FactoryState>,
}

struct FactoryState {
    singletons: HashMap<String, BeanObject>,
    /// Casts of the cached singletons
    casts: HashMap<String, Arc<Casts>>,
    /// Every bean created, prototypes included
    all_beans: HashMap<String, BeanObject>,
    /// Beans being wired, used to tolerate singleton cycles
    in_creation: HashMap<String, BeanObject>,
    /// Beans whose constructor is running
    constructing: HashSet<String>,
    scopes: HashMap<String, Arc<dyn Scope>>,
    processors: BeanPostProcessorCompositor,
}

impl FactoryState {
    fn new(factory: Weak<BeanFactoryInner>) -> Self {
        FactoryState {
            singletons: HashMap::new(),
            casts: HashMap::new(),
            all_beans: HashMap::new(),
            in_creation: HashMap::new(),
            constructing: HashSet::new(),
            scopes: HashMap::new(),
            processors: BeanPostProcessorCompositor::new([
                Arc::new(BeanAwareProcessor { factory }) as Arc<dyn BeanPostProcessor>
            ]),
        }
    }
}

impl Default for BeanFactory {
    fn default() -> Self {
        Self::new(Arc::new(MemoryProperties::new()))
    }
}

impl Debug for BeanFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_struct("BeanFactory");
        match self.0.state.try_lock() {
            Some(state) => {
                for name in state.singletons.keys() {
                    map.field(name, &"singleton");
                }
            }
            None => {
                map.field("state", &"<locked>");
            }
        }
        map.finish()
    }
}

impl BeanFactory {
    pub fn new(properties: Arc<dyn Properties>) -> Self {
        Self::with_registry(Arc::new(DefaultBeanDefinitionRegistry::new()), properties)
    }

    /// A factory on top of an existing registry
    pub fn with_registry(
        registry: Arc<dyn BeanDefinitionRegistry>,
        properties: Arc<dyn Properties>,
    ) -> Self {
        Self::from_parts(registry, properties, None)
    }

    pub(crate) fn from_parts(
        registry: Arc<dyn BeanDefinitionRegistry>,
        properties: Arc<dyn Properties>,
        concurrency: Option<usize>,
    ) -> Self {
        BeanFactory(Arc::new_cyclic(|factory| BeanFactoryInner {
            registry,
            properties,
            concurrency,
            state: Mutex::new(FactoryState::new(factory.clone())),
        }))
    }

    /// Registers the definition under its own name
    pub fn register_definition(&self, definition: BeanDefinition) -> Result<(), BeanError> {
        let name = definition.name().to_string();
        self.0.registry.register_bean_definition(&name, definition)
    }

    /// Returns the bean registered under `name`, creating it if needed.
    ///
    /// Must not be called from a constructor, post-processor or lifecycle callback on the
    /// same thread: the factory is locked for the whole resolution.
    pub fn get_bean(&self, name: &str) -> Result<BeanObject, BeanError> {
        let mut state = self.0.state.lock();
        self.0
            .get_bean_locked(&mut state, name)
            .map(|(bean, _)| bean)
    }

    /// Returns the bean as one of the types it was declared to implement
    pub fn get_bean_as<E: ?Sized + Injectable>(&self, name: &str) -> Result<Arc<E>, BeanError> {
        let target = TypeInfo::of::<E>();
        let (bean, casts) = {
            let mut state = self.0.state.lock();
            self.0.get_bean_locked(&mut state, name)?
        };

        casts
            .cast(bean, &target)
            .and_then(|value| value.downcast::<Arc<E>>().ok())
            .map(|value| *value)
            .ok_or_else(|| BeanError::Cast {
                bean: name.to_string(),
                target: target.type_name,
            })
    }

    /// Names of every definition assignable to `typ`
    pub fn resolve_bean_names(&self, typ: &TypeInfo) -> Vec<String> {
        let mut names = Vec::new();
        self.0.registry.visit_bean_definitions(&mut |name, definition| {
            if definition.is_assignable_to(typ) {
                names.push(name.to_string());
            }
        });
        names
    }

    /// Registers a custom scope, the built-in scope names are reserved
    pub fn register_scope(&self, name: &str, scope: Arc<dyn Scope>) -> Result<(), BeanError> {
        if BeanScope::is_reserved(name) {
            return Err(BeanError::Invalid(format!(
                "Invalid scope name '{name}', cannot replace existing scopes '{}' and '{}'",
                BeanScope::PROTOTYPE,
                BeanScope::SINGLETON
            )));
        }

        let mut state = self.0.state.lock();
        if let Some(previous) = state.scopes.insert(name.to_string(), scope.clone()) {
            if !Arc::ptr_eq(&previous, &scope) {
                tracing::debug!(scope = name, "scope already registered, replacing it");
            }
        }
        Ok(())
    }

    pub fn get_scope(&self, name: &str) -> Option<Arc<dyn Scope>> {
        self.0.state.lock().scopes.get(name).cloned()
    }

    /// Adds an already created bean to the singleton cache
    pub fn register_singleton<T: Bean>(&self, name: &str, bean: Arc<T>) -> Result<(), BeanError> {
        let mut state = self.0.state.lock();
        if state.singletons.contains_key(name) {
            return Err(BeanError::DuplicateSingleton(name.to_string()));
        }

        state.singletons.insert(name.to_string(), bean);
        state
            .casts
            .insert(name.to_string(), Arc::new(Casts::identity::<T>()));
        Ok(())
    }

    /// Adds a post-processor applied to every bean created from now on
    pub fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        self.0.state.lock().processors.add(processor);
    }

    /// Creates every non-lazy singleton, then notifies the smart singletons
    pub fn pre_instantiate_singletons(&self) -> Result<(), BeanError> {
        SingletonInitiator::new(self.clone()).initiate(None)
    }

    /// Same as [`pre_instantiate_singletons`](Self::pre_instantiate_singletons), failing
    /// with [`BeanError::Timeout`] if creation does not complete in time
    pub fn pre_instantiate_singletons_timeout(&self, timeout: Duration) -> Result<(), BeanError> {
        SingletonInitiator::new(self.clone()).initiate(Some(timeout))
    }

    /// Runs the destruction callback of every created bean
    pub fn destroy(&self) {
        let beans: Vec<(String, BeanObject)> = self
            .0
            .state
            .lock()
            .all_beans
            .iter()
            .map(|(name, bean)| (name.clone(), bean.clone()))
            .collect();

        for (name, bean) in beans {
            let destroyed = indirect_to(&*bean, |b| {
                b.as_destruction_aware()
                    .map(|aware| aware.before_destruction(&name))
            });
            if destroyed.is_some() {
                tracing::debug!(bean = %name, "bean destroyed");
            }
        }
    }

    pub fn properties(&self) -> &Arc<dyn Properties> {
        &self.0.properties
    }

    pub fn get_property<V: PropertyType>(
        &self,
        key: &str,
        default: Option<&str>,
    ) -> Result<V, BeanError> {
        Ok(self.0.properties.get_as::<V>(key, default)?)
    }

    pub fn set_property(&self, key: &str, value: Value) -> Result<(), BeanError> {
        Ok(self.0.properties.set(key, value)?)
    }

    /// Names of the cached singletons
    pub(crate) fn singletons(&self) -> Vec<(String, BeanObject)> {
        self.0
            .state
            .lock()
            .singletons
            .iter()
            .map(|(name, bean)| (name.clone(), bean.clone()))
            .collect()
    }

    pub(crate) fn registry(&self) -> &dyn BeanDefinitionRegistry {
        self.0.registry.as_ref()
    }
}

impl BeanDefinitionRegistry for BeanFactory {
    fn register_bean_definition(
        &self,
        name: &str,
        definition: BeanDefinition,
    ) -> Result<(), BeanError> {
        self.0.registry.register_bean_definition(name, definition)
    }

    fn remove_bean_definition(&self, name: &str) -> Result<(), BeanError> {
        self.0.registry.remove_bean_definition(name)
    }

    fn get_bean_definition(&self, name: &str) -> Result<Arc<BeanDefinition>, BeanError> {
        self.0.registry.get_bean_definition(name)
    }

    fn visit_bean_definitions(&self, visitor: &mut dyn FnMut(&str, &Arc<BeanDefinition>)) {
        self.0.registry.visit_bean_definitions(visitor)
    }
}

impl BeanFactoryInner {
    fn get_bean_locked(
        &self,
        state: &mut FactoryState,
        name: &str,
    ) -> Result<(BeanObject, Arc<Casts>), BeanError> {
        if let Some(bean) = state.singletons.get(name) {
            let casts = state.casts.get(name).cloned().unwrap_or_default();
            return Ok((bean.clone(), casts));
        }

        let definition = self.registry.get_bean_definition(name)?;

        // Requested again while its constructor runs, directly or through a field on the way
        if !state.constructing.insert(name.to_string()) {
            return Err(BeanError::Circular(name.to_string()));
        }
        let constructed = definition.constructor().new_object(
            name,
            &mut FactoryArgumentResolver {
                factory: self,
                state: &mut *state,
            },
        );
        state.constructing.remove(name);
        let raw = constructed?;

        if let Some(in_progress) = state.in_creation.get(name) {
            return match definition.scope() {
                BeanScope::Prototype => Err(BeanError::Circular(name.to_string())),
                BeanScope::Singleton => Ok((in_progress.clone(), definition.casts().clone())),
            };
        }

        state.in_creation.insert(name.to_string(), raw.clone());
        let initialized = self.initialize(state, name, &definition, raw.clone());
        state.in_creation.remove(name);
        initialized?;

        if definition.scope() == BeanScope::Singleton {
            state.singletons.insert(name.to_string(), raw.clone());
            state
                .casts
                .insert(name.to_string(), definition.casts().clone());
        }
        state.all_beans.insert(name.to_string(), raw.clone());

        Ok((raw, definition.casts().clone()))
    }

    /// Wires the fields of the new bean and runs it through the post-processors
    fn initialize(
        &self,
        state: &mut FactoryState,
        name: &str,
        definition: &BeanDefinition,
        raw: BeanObject,
    ) -> Result<(), BeanError> {
        let descriptors = definition.field_descriptors();
        let mut values = self.resolve_values(state, descriptors)?;
        let target: &dyn Bean = &*raw;
        values.set_properties(target.as_any(), descriptors)?;

        let processors = state.processors.clone();
        processors.post_process_bean_definition(name, definition);

        let bean = processors.post_process_before_initialization(raw, name)?;

        match indirect_to(&*bean, |b| {
            b.as_initializing().map(|init| init.after_properties_set())
        }) {
            Some(result) => {
                result.map_err(|error| BeanError::lifecycle(name, "after_properties_set", error))?;
                tracing::debug!(bean = name, "bean implements InitializingBean, executed it");
            }
            None => {
                tracing::debug!(bean = name, "bean doesn't implement InitializingBean, skip it");
            }
        }

        processors.post_process_after_initialization(bean, name)?;
        Ok(())
    }

    fn resolve_values(
        &self,
        state: &mut FactoryState,
        descriptors: &[FieldDescriptor],
    ) -> Result<PropertyValues, BeanError> {
        let mut values = PropertyValues::new();
        for descriptor in descriptors {
            let value = match &descriptor.injection {
                Injection::Property { reference, target } => {
                    Some(self.property_value(reference, target)?)
                }
                Injection::Bean { reference, target } if reference.is_wildcard() => {
                    self.typed_bean_value(state, descriptor, reference, target)?
                }
                Injection::Bean { reference, target } => {
                    self.named_bean_value(state, reference, target)?
                }
            };

            if let Some(value) = value {
                values.add_value(descriptor.index, value);
            }
        }
        Ok(values)
    }

    fn property_value(
        &self,
        reference: &PropertyRef,
        target: &PropertyTarget,
    ) -> Result<WiredValue, BeanError> {
        let options = GetOptions {
            shape: target.shape,
            default: reference.default.clone(),
        };
        let values = self.properties.get(&reference.name, &options)?;
        Ok(target.convert(&reference.name, values)?)
    }

    fn named_bean_value(
        &self,
        state: &mut FactoryState,
        reference: &BeanRef,
        target: &BeanTarget,
    ) -> Result<Option<WiredValue>, BeanError> {
        let (bean, casts) = match self.get_bean_locked(state, &reference.name) {
            Ok(found) => found,
            Err(err) if reference.optional && err.is_not_found() => {
                tracing::debug!(bean = %reference.name, "optional bean not found, skip it");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let value = cast_bean(&reference.name, bean, &casts, target)?;
        collect(&reference.name, target, vec![value]).map(Some)
    }

    fn typed_bean_value(
        &self,
        state: &mut FactoryState,
        descriptor: &FieldDescriptor,
        reference: &BeanRef,
        target: &BeanTarget,
    ) -> Result<Option<WiredValue>, BeanError> {
        let candidates = Candidates::find(self.registry.as_ref(), &target.element);

        if target.multiple {
            let mut beans = Vec::with_capacity(candidates.all.len());
            for name in &candidates.all {
                let (bean, casts) = self.get_bean_locked(state, name)?;
                let value = cast_bean(name, bean.clone(), &casts, target)?;
                beans.push((bean, value));
            }

            sort_by_priority(&mut beans);
            let values = beans.into_iter().map(|(_, value)| value).collect();
            return collect(&descriptor.name, target, values).map(Some);
        }

        let Some(name) =
            candidates.select_single(&descriptor.name, &descriptor.typ, reference.optional)?
        else {
            tracing::debug!(field = %descriptor.name, "no candidate for optional field, skip it");
            return Ok(None);
        };

        let (bean, casts) = self.get_bean_locked(state, name)?;
        let value = cast_bean(name, bean, &casts, target)?;
        collect(name, target, vec![value]).map(Some)
    }
}

fn cast_bean(
    name: &str,
    bean: BeanObject,
    casts: &Casts,
    target: &BeanTarget,
) -> Result<WiredValue, BeanError> {
    casts
        .cast(bean, &target.element)
        .ok_or_else(|| BeanError::Cast {
            bean: name.to_string(),
            target: target.element.type_name,
        })
}

fn collect(
    name: &str,
    target: &BeanTarget,
    values: Vec<WiredValue>,
) -> Result<WiredValue, BeanError> {
    target.collect(values).ok_or_else(|| BeanError::Cast {
        bean: name.to_string(),
        target: target.element.type_name,
    })
}

/// Resolves constructor arguments with the lock of the running `get_bean` call
struct FactoryArgumentResolver<'a> {
    factory: &'a BeanFactoryInner,
    state: &'a mut FactoryState,
}

impl ConstructorArgumentResolver for FactoryArgumentResolver<'_> {
    fn resolve(&mut self, descriptors: &[FieldDescriptor]) -> Result<PropertyValues, BeanError> {
        self.factory.resolve_values(self.state, descriptors)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        bean::Component,
        constructor::{ConstructorArgument, ConstructorMethod},
        descriptor::Field,
        inject::Inject,
        scope::ObjectFactory,
    };

    #[derive(Default)]
    struct Left {
        right: Inject<Arc<Right>>,
    }
    impl Bean for Left {}
    impl Component for Left {
        fn constructors() -> Vec<ConstructorMethod<Self>> {
            vec![ConstructorMethod::new("new_left", |right: Arc<Right>| Left {
                right: Inject::with(right),
            })]
        }
    }

    #[derive(Default)]
    struct Right {
        left: Inject<Arc<Left>>,
    }
    impl Bean for Right {}
    impl Component for Right {
        fn constructors() -> Vec<ConstructorMethod<Self>> {
            vec![ConstructorMethod::new("new_right", |left: Arc<Left>| Right {
                left: Inject::with(left),
            })]
        }
    }

    #[test]
    fn constructor_cycle_is_circular() {
        let factory = BeanFactory::default();
        factory
            .register_definition(
                BeanDefinition::builder::<Left>()
                    .constructor_arguments(vec![ConstructorArgument::bean::<Right>("autowire:Right")])
                    .build()
                    .unwrap(),
            )
            .unwrap();
        factory
            .register_definition(
                BeanDefinition::builder::<Right>()
                    .constructor_arguments(vec![ConstructorArgument::bean::<Left>("autowire:Left")])
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let err = factory.get_bean("Left").err().unwrap();
        assert!(matches!(err, BeanError::Circular(name) if name == "Left"));
        assert!(factory.singletons().is_empty());
    }

    static CREATED: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default)]
    struct Counted;
    impl Bean for Counted {}
    impl Component for Counted {
        fn constructors() -> Vec<ConstructorMethod<Self>> {
            vec![ConstructorMethod::new("new_counted", || {
                CREATED.fetch_add(1, Ordering::SeqCst);
                Counted
            })]
        }
    }

    #[test]
    fn singleton_is_cached_with_its_casts() {
        let factory = BeanFactory::default();
        factory
            .register_definition(BeanDefinition::new::<Counted>().unwrap())
            .unwrap();

        let first = factory.get_bean_as::<Counted>("Counted").unwrap();
        let second = factory.get_bean_as::<Counted>("Counted").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);

        let err = factory.get_bean_as::<String>("Counted").err().unwrap();
        assert!(matches!(err, BeanError::Cast { .. }));
    }

    struct Noop;
    impl Scope for Noop {
        fn get(&self, _name: &str, factory: &dyn ObjectFactory) -> Result<BeanObject, BeanError> {
            factory.get_object()
        }

        fn remove(&self, _name: &str) -> Result<(), BeanError> {
            Ok(())
        }
    }

    #[test]
    fn reserved_scope_names_are_rejected() {
        let factory = BeanFactory::default();
        let err = factory.register_scope("singleton", Arc::new(Noop)).unwrap_err();
        assert!(matches!(err, BeanError::Invalid(_)));

        factory.register_scope("request", Arc::new(Noop)).unwrap();
        factory.register_scope("request", Arc::new(Noop)).unwrap();
        let scope = factory.get_scope("request").unwrap();
        let bean = scope
            .get("counted", &|| Ok::<BeanObject, BeanError>(Arc::new(Counted)))
            .unwrap();
        assert!(bean.is::<Counted>());
        assert!(factory.get_scope("session").is_none());
    }

    #[derive(Default)]
    struct Settings {
        port: Inject<u16>,
    }
    impl Bean for Settings {}
    impl Component for Settings {
        fn fields() -> Vec<Field<Self>> {
            vec![Field::property("port", "value:${server.port}", |s| &s.port)]
        }
    }

    #[test]
    fn missing_property_without_default_fails() {
        let factory = BeanFactory::default();
        factory
            .register_definition(BeanDefinition::new::<Settings>().unwrap())
            .unwrap();

        let err = factory.get_bean("Settings").err().unwrap();
        assert!(err.is_not_found());

        factory
            .set_property("server", serde_json::json!({ "port": 8080 }))
            .unwrap();
        let settings = factory.get_bean_as::<Settings>("Settings").unwrap();
        assert_eq!(*settings.port, 8080);
        assert_eq!(factory.get_property::<u16>("server.port", None).unwrap(), 8080);
    }
}
