//! Lifecycle callbacks a bean can opt into through the accessors on [`Bean`](crate::Bean)

use crate::{factory::BeanFactory, types::DynError};

/// Called once all fields are wired and the before-init post-processors ran
pub trait InitializingBean {
    fn after_properties_set(&self) -> Result<(), DynError>;
}

/// Called on every cached singleton once pre-instantiation completed
pub trait SmartInitializingSingleton {
    fn after_singletons_instantiated(&self) -> Result<(), DynError>;
}

/// Called by [`BeanFactory::destroy`]
pub trait DestructionAware {
    fn before_destruction(&self, name: &str);
}

/// Receives the name the bean is registered under
pub trait BeanNameAware {
    fn set_bean_name(&self, name: &str);
}

/// Receives a handle of the factory creating the bean.
///
/// The handle keeps the factory alive, a bean storing it forms a reference cycle with
/// the singleton cache.
pub trait BeanFactoryAware {
    fn set_bean_factory(&self, factory: BeanFactory);
}

/// Priority of a bean, the higher the priority the smaller its index in an injected list
pub type BeanPriority = i32;

pub trait PriorityOrder {
    fn priority(&self) -> BeanPriority;
}
