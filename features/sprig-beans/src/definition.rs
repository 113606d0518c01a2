use std::{
    any::TypeId,
    collections::HashMap,
    fmt::Debug,
    marker::PhantomData,
    sync::Arc,
};

use crate::{
    bean::{downcast_bean, Component},
    constructor::{Constructor, ConstructorArgument, ConstructorBuilder, DefaultConstructorBuilder},
    descriptor::FieldDescriptor,
    errors::BeanError,
    scope::BeanScope,
    types::{BeanObject, Injectable, TypeInfo, WiredValue},
};

type CastFn = Arc<dyn Fn(BeanObject) -> Option<WiredValue> + Send + Sync>;

/// The types a bean can be handed out as.
///
/// Each entry turns a bean into an `Arc<E>` for one target type `E`.
#[derive(Clone, Default)]
pub struct Casts {
    entries: HashMap<TypeId, (TypeInfo, CastFn)>,
}

impl Casts {
    /// A bean of type `T` is always assignable to `T`
    pub fn identity<T: Injectable>() -> Self {
        let mut casts = Casts::default();
        casts.insert::<T, T>(|bean| bean);
        casts
    }

    pub(crate) fn insert<T: Injectable, E: ?Sized + Injectable>(&mut self, cast: fn(Arc<T>) -> Arc<E>) {
        let cast: CastFn = Arc::new(move |bean| {
            downcast_bean::<T>(bean).map(|bean| Box::new(cast(bean)) as WiredValue)
        });
        self.entries
            .insert(TypeId::of::<E>(), (TypeInfo::of::<E>(), cast));
    }

    pub fn supports(&self, target: &TypeInfo) -> bool {
        self.entries.contains_key(&target.type_id)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeInfo> {
        self.entries.values().map(|(info, _)| info)
    }

    /// Turns the bean into a boxed `Arc<E>` for the target type `E`
    pub(crate) fn cast(&self, bean: BeanObject, target: &TypeInfo) -> Option<WiredValue> {
        let (_, cast) = self.entries.get(&target.type_id)?;
        cast(bean)
    }
}

impl Debug for Casts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.types()).finish()
    }
}

/// Static description of how a bean is built, wired and scoped
pub struct BeanDefinition {
    name: String,
    type_info: TypeInfo,
    scope: BeanScope,
    lazy: bool,
    primary: bool,
    field_descriptors: Vec<FieldDescriptor>,
    constructor: Arc<dyn Constructor>,
    casts: Arc<Casts>,
}

impl BeanDefinition {
    /// Definition with all defaults
    pub fn new<T: Component>() -> Result<Self, BeanError> {
        Self::builder::<T>().build()
    }

    pub fn builder<T: Component>() -> BeanDefinitionBuilder<T> {
        BeanDefinitionBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    pub fn scope(&self) -> BeanScope {
        self.scope
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn field_descriptors(&self) -> &[FieldDescriptor] {
        &self.field_descriptors
    }

    pub fn constructor(&self) -> &dyn Constructor {
        self.constructor.as_ref()
    }

    pub fn casts(&self) -> &Arc<Casts> {
        &self.casts
    }

    /// The bean can be injected where `target` is expected
    pub fn is_assignable_to(&self, target: &TypeInfo) -> bool {
        self.casts.supports(target)
    }
}

impl Debug for BeanDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("name", &self.name)
            .field("type", &self.type_info)
            .field("scope", &self.scope)
            .field("lazy", &self.lazy)
            .field("primary", &self.primary)
            .field("fields", &self.field_descriptors)
            .field("constructor", &self.constructor.method_name())
            .field("casts", &self.casts)
            .finish()
    }
}

enum ScopeSetting {
    Scope(BeanScope),
    Name(String),
}

/// Builder of a [`BeanDefinition`].
///
/// Everything is validated in [`build`](Self::build): malformed annotations, unknown scopes
/// and ambiguous constructors never reach the registry.
pub struct BeanDefinitionBuilder<T> {
    name: Option<String>,
    scope: ScopeSetting,
    lazy: bool,
    primary: bool,
    arguments: Vec<ConstructorArgument>,
    casts: Casts,
    _bean: PhantomData<fn() -> T>,
}

impl<T: Component> BeanDefinitionBuilder<T> {
    pub fn new() -> Self {
        BeanDefinitionBuilder {
            name: None,
            scope: ScopeSetting::Scope(BeanScope::default()),
            lazy: false,
            primary: false,
            arguments: Vec::new(),
            casts: Casts::identity::<T>(),
            _bean: PhantomData,
        }
    }

    /// Defaults to the type name without its module path
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn scope(mut self, scope: BeanScope) -> Self {
        self.scope = ScopeSetting::Scope(scope);
        self
    }

    /// Scope given by name, checked on build
    pub fn scope_name(mut self, scope: impl Into<String>) -> Self {
        self.scope = ScopeSetting::Name(scope.into());
        self
    }

    /// Exclude the bean from eager pre-instantiation
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Prefer this bean when several candidates match a typed lookup
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn constructor_arguments(mut self, arguments: Vec<ConstructorArgument>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Makes the bean injectable as `Arc<E>`, usually a trait object:
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use sprig_beans::{Bean, BeanDefinition, Component};
    ///
    /// trait Store: Send + Sync {}
    ///
    /// #[derive(Default)]
    /// struct MemoryStore;
    /// impl Store for MemoryStore {}
    /// impl Bean for MemoryStore {}
    /// impl Component for MemoryStore {}
    ///
    /// let definition = BeanDefinition::builder::<MemoryStore>()
    ///     .implements::<dyn Store>(|store| store as Arc<dyn Store>)
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn implements<E: ?Sized + Injectable>(mut self, cast: fn(Arc<T>) -> Arc<E>) -> Self {
        self.casts.insert::<T, E>(cast);
        self
    }

    pub fn build(self) -> Result<BeanDefinition, BeanError> {
        self.build_with(&DefaultConstructorBuilder::default())
    }

    /// Builds with a custom constructor selection
    pub fn build_with<B: ConstructorBuilder>(self, builder: &B) -> Result<BeanDefinition, BeanError> {
        let type_info = TypeInfo::of::<T>();
        let scope = match self.scope {
            ScopeSetting::Scope(scope) => scope,
            ScopeSetting::Name(name) => name.parse()?,
        };

        let mut field_descriptors = Vec::new();
        for (index, field) in T::fields().into_iter().enumerate() {
            if let Some(descriptor) = field.compile(index)? {
                field_descriptors.push(descriptor);
            }
        }

        let constructor = builder.build::<T>(self.arguments)?;

        Ok(BeanDefinition {
            name: self
                .name
                .unwrap_or_else(|| type_info.short_name().to_string()),
            type_info,
            scope,
            lazy: self.lazy,
            primary: self.primary,
            field_descriptors,
            constructor,
            casts: Arc::new(self.casts),
        })
    }
}

impl<T: Component> Default for BeanDefinitionBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bean::Bean,
        descriptor::{Field, Injection},
        inject::Inject,
    };

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    #[derive(Default)]
    struct English {
        name: Inject<String>,
        skipped: Inject<String>,
        peer: Inject<Arc<dyn Greeter>>,
    }
    impl Greeter for English {
        fn greet(&self) -> String {
            format!("hello {}", *self.name)
        }
    }
    impl Bean for English {}
    impl Component for English {
        fn fields() -> Vec<Field<Self>> {
            vec![
                Field::property("name", "value:${greeter.name:=world}", |e| &e.name),
                Field::property("skipped", "", |e| &e.skipped),
                Field::bean("peer", "autowire:?,optional", |e| &e.peer),
            ]
        }
    }

    #[derive(Default)]
    struct Broken {
        name: Inject<String>,
    }
    impl Bean for Broken {}
    impl Component for Broken {
        fn fields() -> Vec<Field<Self>> {
            vec![Field::property("name", "value:name", |b| &b.name)]
        }
    }

    #[test]
    fn defaults() {
        let definition = BeanDefinition::new::<English>().unwrap();
        assert_eq!(definition.name(), "English");
        assert_eq!(definition.scope(), BeanScope::Singleton);
        assert!(!definition.is_lazy());
        assert!(!definition.is_primary());
        assert_eq!(definition.constructor().method_name(), None);
    }

    #[test]
    fn compiles_annotated_fields_in_declaration_order() {
        let definition = BeanDefinition::new::<English>().unwrap();
        let fields = definition.field_descriptors();
        assert_eq!(fields.len(), 2);

        assert_eq!(fields[0].index, 0);
        assert!(matches!(
            &fields[0].injection,
            Injection::Property { reference, .. } if reference.default.as_deref() == Some("world")
        ));

        assert_eq!(fields[1].index, 2);
        assert_eq!(fields[1].typ, TypeInfo::of::<Arc<dyn Greeter>>());
        assert!(matches!(
            &fields[1].injection,
            Injection::Bean { reference, target } if reference.optional && !target.multiple
        ));
    }

    #[test]
    fn options_are_applied() {
        let definition = BeanDefinition::builder::<English>()
            .name("english")
            .scope_name("prototype")
            .lazy()
            .primary()
            .build()
            .unwrap();

        assert_eq!(definition.name(), "english");
        assert_eq!(definition.scope(), BeanScope::Prototype);
        assert!(definition.is_lazy());
        assert!(definition.is_primary());
    }

    #[test]
    fn invalid_scope_and_annotation_fail_build() {
        let err = BeanDefinition::builder::<English>()
            .scope_name("session")
            .build()
            .unwrap_err();
        assert!(matches!(err, BeanError::Invalid(_)));

        let err = BeanDefinition::new::<Broken>().unwrap_err();
        assert!(matches!(err, BeanError::Invalid(_)));
    }

    #[test]
    fn casts_to_declared_types() {
        let definition = BeanDefinition::builder::<English>()
            .implements::<dyn Greeter>(|english| english as Arc<dyn Greeter>)
            .build()
            .unwrap();

        assert!(definition.is_assignable_to(&TypeInfo::of::<English>()));
        assert!(definition.is_assignable_to(&TypeInfo::of::<dyn Greeter>()));
        assert!(!definition.is_assignable_to(&TypeInfo::of::<String>()));

        let english = English::default();
        english.name.set("bob".to_string()).unwrap();
        let bean: BeanObject = Arc::new(english);

        let greeter = definition
            .casts()
            .cast(bean.clone(), &TypeInfo::of::<dyn Greeter>())
            .unwrap()
            .downcast::<Arc<dyn Greeter>>()
            .unwrap();
        assert_eq!(greeter.greet(), "hello bob");

        assert!(Casts::identity::<String>()
            .cast(bean, &TypeInfo::of::<String>())
            .is_none());
    }
}
