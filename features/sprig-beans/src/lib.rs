//! Sprig Beans is a bean factory: it creates objects from registered definitions, wires
//! their fields with properties and other beans, and caches them by scope.
//!
//! Sprig Beans is split into three major parts:
//! 1. Definitions: what a bean is, how it is constructed and which fields are wired
//! 2. Factory: resolution of beans by name or type, lifecycle callbacks and post-processors
//! 3. Initiation: eager creation of the singletons on a thread pool
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use sprig_beans::{Bean, BeanDefinition, BeanFactoryBuilder, Component, Field, Inject};
//!
//! trait Storage: Send + Sync {
//!     fn location(&self) -> String;
//! }
//!
//! #[derive(Default)]
//! struct DiskStorage {
//!     path: Inject<String>,
//! }
//! impl Storage for DiskStorage {
//!     fn location(&self) -> String {
//!         self.path.to_string()
//!     }
//! }
//! impl Bean for DiskStorage {}
//! impl Component for DiskStorage {
//!     fn fields() -> Vec<Field<Self>> {
//!         vec![Field::property("path", "value:${storage.path:=/tmp}", |s| &s.path)]
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Uploader {
//!     storage: Inject<Arc<dyn Storage>>,
//! }
//! impl Bean for Uploader {}
//! impl Component for Uploader {
//!     fn fields() -> Vec<Field<Self>> {
//!         vec![Field::bean("storage", "autowire:?", |u| &u.storage)]
//!     }
//! }
//!
//! let factory = BeanFactoryBuilder::new()
//!     .definition(
//!         "storage",
//!         BeanDefinition::builder::<DiskStorage>()
//!             .implements::<dyn Storage>(|disk| disk as Arc<dyn Storage>)
//!             .build()
//!             .unwrap(),
//!     )
//!     .component::<Uploader>()
//!     .build()
//!     .unwrap();
//!
//! let uploader = factory.get_bean_as::<Uploader>("Uploader").unwrap();
//! assert_eq!(uploader.storage.location(), "/tmp");
//! ```
//!
//! Sprig Beans consists of the following components:
//!
//! 1. Bean - the managed object trait, its capabilities and the [`Inject`] field cell
//! 2. Definition - field declarations, constructor methods, scopes and casts
//! 3. Registry - the definitions by name
//! 4. Factory - creation, wiring and caching of beans
//! 5. Post-processors - hooks applied to every new bean
//! 6. Builder - for assembling a factory
//! 7. Errors - for bean errors

pub mod bean;
pub mod builder;
pub mod candidates;
pub mod capabilities;
pub mod constructor;
pub mod definition;
pub mod descriptor;
pub mod errors;
pub mod factory;
mod initiator;
pub mod inject;
pub mod post_processor;
pub mod property_values;
pub mod registry;
pub mod scope;
pub mod types;

pub use bean::{downcast_bean, indirect_to, AsAny, Bean, Component};
pub use builder::BeanFactoryBuilder;
pub use candidates::{sort_by_priority, Candidates};
pub use capabilities::{
    BeanFactoryAware, BeanNameAware, BeanPriority, DestructionAware, InitializingBean,
    PriorityOrder, SmartInitializingSingleton,
};
pub use constructor::{
    method_arity_filter, method_name_filter, Constructor, ConstructorArgument,
    ConstructorArgumentResolver, ConstructorBuilder, ConstructorMethod, DefaultConstructor,
    DefaultConstructorBuilder, FnMethodFilter, MethodConstructor, MethodFilter, MethodInfo,
};
pub use definition::{BeanDefinition, BeanDefinitionBuilder, Casts};
pub use descriptor::{
    parse_annotation, Annotation, BeanRef, BeanTarget, Field, FieldDescriptor, Injection,
    PropertyRef, PropertyTarget,
};
pub use errors::{BeanError, ErrorKind};
pub use factory::BeanFactory;
pub use inject::Inject;
pub use post_processor::{
    BeanDefinitionPostProcessor, BeanPostProcessor, BeanPostProcessorCompositor,
    FnBeanPostProcessor,
};
pub use property_values::PropertyValues;
pub use registry::{BeanDefinitionRegistry, DefaultBeanDefinitionRegistry};
pub use scope::{BeanScope, ObjectFactory, Scope};
pub use types::{BeanObject, DynError, Injectable, TypeInfo, WiredValue};

pub use sprig_props;
