use std::{any::Any, sync::Arc};

use crate::{
    capabilities::{
        BeanFactoryAware, BeanNameAware, DestructionAware, InitializingBean, PriorityOrder,
        SmartInitializingSingleton,
    },
    constructor::ConstructorMethod,
    descriptor::Field,
    types::BeanObject,
};

/// Upcast helper, implemented for every sized `Send + Sync` type
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &(dyn Any + Send + Sync);
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}
impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// An object managed by the bean factory.
///
/// The capability accessors tell the factory which lifecycle callbacks a bean takes part
/// in. They all default to `None`, a bean opts in by returning itself:
///
/// ```rust
/// use sprig_beans::{Bean, InitializingBean, DynError};
///
/// #[derive(Default)]
/// struct Pool;
///
/// impl InitializingBean for Pool {
///     fn after_properties_set(&self) -> Result<(), DynError> {
///         Ok(())
///     }
/// }
///
/// impl Bean for Pool {
///     fn as_initializing(&self) -> Option<&dyn InitializingBean> {
///         Some(self)
///     }
/// }
/// ```
pub trait Bean: AsAny {
    /// The wrapped bean, if this bean is a proxy
    fn original(&self) -> Option<BeanObject> {
        None
    }

    fn as_initializing(&self) -> Option<&dyn InitializingBean> {
        None
    }

    fn as_smart_singleton(&self) -> Option<&dyn SmartInitializingSingleton> {
        None
    }

    fn as_destruction_aware(&self) -> Option<&dyn DestructionAware> {
        None
    }

    fn as_name_aware(&self) -> Option<&dyn BeanNameAware> {
        None
    }

    fn as_factory_aware(&self) -> Option<&dyn BeanFactoryAware> {
        None
    }

    fn as_priority_order(&self) -> Option<&dyn PriorityOrder> {
        None
    }
}

impl dyn Bean {
    pub fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Downcasts a bean to its concrete type
pub fn downcast_bean<T: Any + Send + Sync>(bean: BeanObject) -> Option<Arc<T>> {
    bean.into_any().downcast::<T>().ok()
}

/// A bean type the factory can build on its own.
///
/// `Default` is the zero-value allocator used when no constructor method applies.
pub trait Component: Bean + Default + Sized {
    /// Wired fields, in declaration order
    fn fields() -> Vec<Field<Self>> {
        Vec::new()
    }

    /// Constructor methods the factory may pick from.
    ///
    /// The default builder only considers methods named `new_<type>` (any case, underscores
    /// ignored) whose arity matches the declared constructor arguments.
    fn constructors() -> Vec<ConstructorMethod<Self>> {
        Vec::new()
    }
}

/// Looks for a capability on the bean, then on the beans it wraps.
///
/// `visit` is called with the bean and every [`Bean::original`] behind it until it
/// returns `Some`.
pub fn indirect_to<R>(bean: &dyn Bean, mut visit: impl FnMut(&dyn Bean) -> Option<R>) -> Option<R> {
    if let Some(found) = visit(bean) {
        return Some(found);
    }

    let mut next = bean.original();
    while let Some(current) = next {
        if let Some(found) = visit(&*current) {
            return Some(found);
        }
        next = current.original();
    }
    None
}
