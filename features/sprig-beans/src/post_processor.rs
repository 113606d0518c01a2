use std::sync::{Arc, Weak};

use crate::{
    bean::indirect_to,
    definition::BeanDefinition,
    errors::BeanError,
    factory::{BeanFactory, BeanFactoryInner},
    types::BeanObject,
};

/// Hook that allows for custom modification of new bean instances, for example wrapping
/// beans with proxies.
///
/// Returning [`BeanError::Continue`] skips the processor for this bean.
pub trait BeanPostProcessor: Send + Sync {
    /// Applied once the bean is wired, before its init callback
    fn post_process_before_initialization(
        &self,
        bean: BeanObject,
        _name: &str,
    ) -> Result<BeanObject, BeanError> {
        Ok(bean)
    }

    /// Applied after the init callback
    fn post_process_after_initialization(
        &self,
        bean: BeanObject,
        _name: &str,
    ) -> Result<BeanObject, BeanError> {
        Ok(bean)
    }

    fn as_definition_post_processor(&self) -> Option<&dyn BeanDefinitionPostProcessor> {
        None
    }
}

/// Observes the definition of every bean right after it was wired
pub trait BeanDefinitionPostProcessor: Send + Sync {
    fn post_process_bean_definition(&self, name: &str, definition: &BeanDefinition);
}

type ProcessFn = Box<dyn Fn(BeanObject, &str) -> Result<BeanObject, BeanError> + Send + Sync>;

/// Closure backed [`BeanPostProcessor`], mostly for tests and small hooks
#[derive(Default)]
pub struct FnBeanPostProcessor {
    before: Option<ProcessFn>,
    after: Option<ProcessFn>,
}

impl FnBeanPostProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before(
        mut self,
        f: impl Fn(BeanObject, &str) -> Result<BeanObject, BeanError> + Send + Sync + 'static,
    ) -> Self {
        self.before = Some(Box::new(f));
        self
    }

    pub fn after(
        mut self,
        f: impl Fn(BeanObject, &str) -> Result<BeanObject, BeanError> + Send + Sync + 'static,
    ) -> Self {
        self.after = Some(Box::new(f));
        self
    }
}

impl BeanPostProcessor for FnBeanPostProcessor {
    fn post_process_before_initialization(
        &self,
        bean: BeanObject,
        name: &str,
    ) -> Result<BeanObject, BeanError> {
        match &self.before {
            Some(f) => f(bean, name),
            None => Ok(bean),
        }
    }

    fn post_process_after_initialization(
        &self,
        bean: BeanObject,
        name: &str,
    ) -> Result<BeanObject, BeanError> {
        match &self.after {
            Some(f) => f(bean, name),
            None => Ok(bean),
        }
    }
}

/// Runs post-processors in registration order
#[derive(Clone, Default)]
pub struct BeanPostProcessorCompositor {
    processors: Vec<Arc<dyn BeanPostProcessor>>,
}

fn same_processor(a: &Arc<dyn BeanPostProcessor>, b: &Arc<dyn BeanPostProcessor>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl BeanPostProcessorCompositor {
    pub fn new(processors: impl IntoIterator<Item = Arc<dyn BeanPostProcessor>>) -> Self {
        let mut compositor = Self::default();
        for processor in processors {
            compositor.add(processor);
        }
        compositor
    }

    /// Appends the processor, a processor added again moves to the end
    pub fn add(&mut self, processor: Arc<dyn BeanPostProcessor>) {
        self.processors
            .retain(|existing| !same_processor(existing, &processor));
        self.processors.push(processor);
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    pub fn post_process_before_initialization(
        &self,
        mut bean: BeanObject,
        name: &str,
    ) -> Result<BeanObject, BeanError> {
        for processor in &self.processors {
            bean = skip_on_continue(
                bean.clone(),
                processor.post_process_before_initialization(bean, name),
            )?;
        }
        Ok(bean)
    }

    pub fn post_process_after_initialization(
        &self,
        mut bean: BeanObject,
        name: &str,
    ) -> Result<BeanObject, BeanError> {
        for processor in &self.processors {
            bean = skip_on_continue(
                bean.clone(),
                processor.post_process_after_initialization(bean, name),
            )?;
        }
        Ok(bean)
    }

    pub fn post_process_bean_definition(&self, name: &str, definition: &BeanDefinition) {
        for processor in &self.processors {
            if let Some(processor) = processor.as_definition_post_processor() {
                processor.post_process_bean_definition(name, definition);
            }
        }
    }
}

fn skip_on_continue(
    unchanged: BeanObject,
    result: Result<BeanObject, BeanError>,
) -> Result<BeanObject, BeanError> {
    match result {
        Err(err) if err.is_continue() => {
            tracing::debug!(reason = %err, "post-processor does not apply, skip it");
            Ok(unchanged)
        }
        other => other,
    }
}

/// Hands name and factory to aware beans, always runs before any custom processor
pub(crate) struct BeanAwareProcessor {
    pub(crate) factory: Weak<BeanFactoryInner>,
}

impl BeanPostProcessor for BeanAwareProcessor {
    fn post_process_before_initialization(
        &self,
        bean: BeanObject,
        name: &str,
    ) -> Result<BeanObject, BeanError> {
        indirect_to(&*bean, |b| b.as_name_aware().map(|aware| aware.set_bean_name(name)));

        if let Some(factory) = self.factory.upgrade() {
            let factory = BeanFactory(factory);
            indirect_to(&*bean, |b| {
                b.as_factory_aware()
                    .map(|aware| aware.set_bean_factory(factory.clone()))
            });
        }

        Ok(bean)
    }
}
