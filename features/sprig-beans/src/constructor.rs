use std::{any::type_name, marker::PhantomData, sync::Arc};

use sprig_props::PropertyType;

use crate::{
    bean::Component,
    descriptor::{BeanTarget, FieldDescriptor, Injection, PropertyTarget, Slot},
    errors::BeanError,
    property_values::PropertyValues,
    types::{BeanObject, DynError, Injectable, TypeInfo, WiredValue},
};

type Literal = Arc<dyn Fn() -> WiredValue + Send + Sync>;

/// Wraps a possibly missing resolved value into the `Option` the method expects
type Lift = fn(Option<WiredValue>) -> WiredValue;

fn lift<V: Injectable>(value: Option<WiredValue>) -> WiredValue {
    Box::new(value.and_then(|value| value.downcast::<V>().ok()).map(|value| *value))
}

#[derive(Clone)]
enum ArgumentKind {
    Wired {
        slot: Slot,
        annotation: String,
        lift: Option<Lift>,
    },
    Value(Literal),
}

/// An input of a constructor method.
///
/// Wired arguments use the field annotation grammar and are resolved like fields,
/// literal values are passed through.
#[derive(Clone)]
pub struct ConstructorArgument {
    typ: TypeInfo,
    kind: ArgumentKind,
}

impl ConstructorArgument {
    pub fn property<V: PropertyType>(annotation: impl Into<String>) -> Self {
        Self::wired::<V>(Slot::Property(PropertyTarget::of::<V>()), annotation)
    }

    pub fn bean<E: ?Sized + Injectable>(annotation: impl Into<String>) -> Self {
        Self::wired::<Arc<E>>(Slot::Bean(BeanTarget::single::<E>()), annotation)
    }

    pub fn beans<E: ?Sized + Injectable>(annotation: impl Into<String>) -> Self {
        Self::wired::<Vec<Arc<E>>>(Slot::Bean(BeanTarget::multiple::<E>()), annotation)
    }

    /// An `Option<Arc<E>>` parameter, `None` when an `,optional` reference finds nothing
    pub fn optional_bean<E: ?Sized + Injectable>(annotation: impl Into<String>) -> Self {
        Self::lifted::<Arc<E>>(Slot::Bean(BeanTarget::single::<E>()), annotation)
    }

    /// An `Option<Vec<Arc<E>>>` parameter, `None` when an `,optional` reference finds nothing
    pub fn optional_beans<E: ?Sized + Injectable>(annotation: impl Into<String>) -> Self {
        Self::lifted::<Vec<Arc<E>>>(Slot::Bean(BeanTarget::multiple::<E>()), annotation)
    }

    /// A literal, every construction receives its own clone
    pub fn value<V: Clone + Injectable>(value: V) -> Self {
        ConstructorArgument {
            typ: TypeInfo::of::<V>(),
            kind: ArgumentKind::Value(Arc::new(move || Box::new(value.clone()) as WiredValue)),
        }
    }

    fn wired<V: Injectable>(slot: Slot, annotation: impl Into<String>) -> Self {
        ConstructorArgument {
            typ: TypeInfo::of::<V>(),
            kind: ArgumentKind::Wired {
                slot,
                annotation: annotation.into(),
                lift: None,
            },
        }
    }

    fn lifted<V: Injectable>(slot: Slot, annotation: impl Into<String>) -> Self {
        ConstructorArgument {
            typ: TypeInfo::of::<Option<V>>(),
            kind: ArgumentKind::Wired {
                slot,
                annotation: annotation.into(),
                lift: Some(lift::<V> as Lift),
            },
        }
    }

    /// Type of the value handed to the constructor method
    pub fn type_info(&self) -> TypeInfo {
        self.typ
    }
}

/// A function usable as infallible constructor method
pub trait ConstructorFunction<T, Args>: Send + Sync + 'static {
    fn parameters() -> Vec<TypeInfo>;
    fn call(&self, args: &mut PropertyValues) -> Result<T, DynError>;
}

/// A function usable as fallible constructor method
pub trait FallibleConstructorFunction<T, Args>: Send + Sync + 'static {
    fn parameters() -> Vec<TypeInfo>;
    fn call(&self, args: &mut PropertyValues) -> Result<T, DynError>;
}

fn take_argument<A: 'static>(args: &mut PropertyValues, index: usize) -> Result<A, DynError> {
    let Some(value) = args.take(index) else {
        return Err(format!("constructor argument {index} is missing").into());
    };

    value.downcast::<A>().map(|value| *value).map_err(|_| -> DynError {
        format!(
            "constructor argument {index} is not a '{}'",
            type_name::<A>()
        )
        .into()
    })
}

macro_rules! constructor_functions {
    ($(($($arg:ident $index:tt),*)),* $(,)?) => {$(
        impl<T, F, $($arg,)*> ConstructorFunction<T, ($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> T + Send + Sync + 'static,
            $($arg: 'static,)*
        {
            fn parameters() -> Vec<TypeInfo> {
                vec![$(TypeInfo::of::<$arg>()),*]
            }

            #[allow(unused_variables)]
            fn call(&self, args: &mut PropertyValues) -> Result<T, DynError> {
                Ok((self)($(take_argument::<$arg>(args, $index)?),*))
            }
        }

        impl<T, E, F, $($arg,)*> FallibleConstructorFunction<T, ($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> Result<T, E> + Send + Sync + 'static,
            E: Into<DynError>,
            $($arg: 'static,)*
        {
            fn parameters() -> Vec<TypeInfo> {
                vec![$(TypeInfo::of::<$arg>()),*]
            }

            #[allow(unused_variables)]
            fn call(&self, args: &mut PropertyValues) -> Result<T, DynError> {
                (self)($(take_argument::<$arg>(args, $index)?),*).map_err(Into::into)
            }
        }
    )*};
}

constructor_functions! {
    (),
    (A0 0),
    (A0 0, A1 1),
    (A0 0, A1 1, A2 2),
    (A0 0, A1 1, A2 2, A3 3),
    (A0 0, A1 1, A2 2, A3 3, A4 4),
    (A0 0, A1 1, A2 2, A3 3, A4 4, A5 5),
}

type MethodFn<T> = Arc<dyn Fn(&mut PropertyValues) -> Result<T, DynError> + Send + Sync>;

/// A named function building `T`, offered through [`Component::constructors`]
pub struct ConstructorMethod<T> {
    name: String,
    parameters: Vec<TypeInfo>,
    call: MethodFn<T>,
}

impl<T: 'static> ConstructorMethod<T> {
    pub fn new<Args, F: ConstructorFunction<T, Args>>(name: impl Into<String>, function: F) -> Self {
        ConstructorMethod {
            name: name.into(),
            parameters: F::parameters(),
            call: Arc::new(move |args| {
                <F as ConstructorFunction<T, Args>>::call(&function, args)
            }),
        }
    }

    /// A constructor method returning `Result<T, E>`
    pub fn fallible<Args, F: FallibleConstructorFunction<T, Args>>(
        name: impl Into<String>,
        function: F,
    ) -> Self {
        ConstructorMethod {
            name: name.into(),
            parameters: F::parameters(),
            call: Arc::new(move |args| {
                <F as FallibleConstructorFunction<T, Args>>::call(&function, args)
            }),
        }
    }
}

impl<T> ConstructorMethod<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn info(&self) -> MethodInfo<'_> {
        MethodInfo {
            name: &self.name,
            parameters: &self.parameters,
        }
    }
}

impl<T> Clone for ConstructorMethod<T> {
    fn clone(&self) -> Self {
        ConstructorMethod {
            name: self.name.clone(),
            parameters: self.parameters.clone(),
            call: self.call.clone(),
        }
    }
}

/// Signature of a constructor method as seen by the filters
#[derive(Debug, Clone, Copy)]
pub struct MethodInfo<'a> {
    pub name: &'a str,
    pub parameters: &'a [TypeInfo],
}

/// Resolves the wired constructor arguments of a bean
pub trait ConstructorArgumentResolver {
    fn resolve(&mut self, descriptors: &[FieldDescriptor]) -> Result<PropertyValues, BeanError>;
}

/// Strategy creating raw bean instances
pub trait Constructor: Send + Sync {
    fn new_object(
        &self,
        name: &str,
        resolver: &mut dyn ConstructorArgumentResolver,
    ) -> Result<BeanObject, BeanError>;

    /// Name of the constructor method, `None` for the zero-value allocator
    fn method_name(&self) -> Option<&str>;
}

/// Allocates `T::default()`
pub struct DefaultConstructor<T>(PhantomData<fn() -> T>);

impl<T: Component> Constructor for DefaultConstructor<T> {
    fn new_object(
        &self,
        _name: &str,
        _resolver: &mut dyn ConstructorArgumentResolver,
    ) -> Result<BeanObject, BeanError> {
        Ok(Arc::new(T::default()))
    }

    fn method_name(&self) -> Option<&str> {
        None
    }
}

/// Calls a constructor method with resolved arguments
pub struct MethodConstructor<T> {
    method: ConstructorMethod<T>,
    descriptors: Vec<FieldDescriptor>,
    literals: Vec<(usize, Literal)>,
    lifts: Vec<(usize, Lift)>,
}

impl<T: Component> MethodConstructor<T> {
    pub fn new(
        method: ConstructorMethod<T>,
        args: Vec<ConstructorArgument>,
    ) -> Result<Self, BeanError> {
        let mut descriptors = Vec::new();
        let mut literals = Vec::new();
        let mut lifts = Vec::new();

        for (index, (arg, parameter)) in args.into_iter().zip(&method.parameters).enumerate() {
            if arg.typ != *parameter {
                return Err(BeanError::Invalid(format!(
                    "constructor argument {index} of '{}' is a '{}', '{}' expects '{}'",
                    type_name::<T>(),
                    arg.typ,
                    method.name,
                    parameter
                )));
            }

            let name = format!("F{index}");
            match arg.kind {
                ArgumentKind::Value(literal) => literals.push((index, literal)),
                ArgumentKind::Wired {
                    slot,
                    annotation,
                    lift,
                } => {
                    let Some(injection) = slot.compile(&name, &annotation)? else {
                        return Err(BeanError::Invalid(format!(
                            "constructor argument {index} of '{}' requires an annotation",
                            type_name::<T>()
                        )));
                    };
                    let optional = matches!(
                        &injection,
                        Injection::Bean { reference, .. } if reference.optional
                    );
                    match lift {
                        Some(lift) => lifts.push((index, lift)),
                        None if optional => {
                            return Err(BeanError::Invalid(format!(
                                "constructor argument {index} of '{}' is optional, its parameter must be an Option",
                                type_name::<T>()
                            )))
                        }
                        None => {}
                    }
                    descriptors.push(FieldDescriptor::slot(index, name, arg.typ, injection));
                }
            }
        }

        Ok(MethodConstructor {
            method,
            descriptors,
            literals,
            lifts,
        })
    }
}

impl<T: Component> Constructor for MethodConstructor<T> {
    fn new_object(
        &self,
        name: &str,
        resolver: &mut dyn ConstructorArgumentResolver,
    ) -> Result<BeanObject, BeanError> {
        let mut values = resolver.resolve(&self.descriptors)?;
        for (index, literal) in &self.literals {
            values.add_value(*index, literal());
        }
        for (index, lift) in &self.lifts {
            let value = values.take(*index);
            values.add_value(*index, lift(value));
        }

        let instance = (self.method.call)(&mut values)
            .map_err(|error| BeanError::construction(name, error))?;
        Ok(Arc::new(instance))
    }

    fn method_name(&self) -> Option<&str> {
        Some(self.method.name())
    }
}

/// Decides whether a method may construct the owner type
pub trait MethodFilter: Send + Sync {
    fn filter(&self, owner: &TypeInfo, method: &MethodInfo<'_>, args: &[ConstructorArgument])
        -> bool;
}

/// Function backed [`MethodFilter`]
pub struct FnMethodFilter(pub fn(&TypeInfo, &MethodInfo<'_>, &[ConstructorArgument]) -> bool);

impl MethodFilter for FnMethodFilter {
    fn filter(
        &self,
        owner: &TypeInfo,
        method: &MethodInfo<'_>,
        args: &[ConstructorArgument],
    ) -> bool {
        (self.0)(owner, method, args)
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Accepts `new_<type>`, ignoring case and underscores
pub fn method_name_filter(
    owner: &TypeInfo,
    method: &MethodInfo<'_>,
    _args: &[ConstructorArgument],
) -> bool {
    normalize(method.name) == normalize(&format!("new{}", owner.short_name()))
}

/// Accepts methods taking exactly the declared arguments
pub fn method_arity_filter(
    _owner: &TypeInfo,
    method: &MethodInfo<'_>,
    args: &[ConstructorArgument],
) -> bool {
    method.parameters.len() == args.len()
}

/// Chooses the construction strategy of a bean type
pub trait ConstructorBuilder {
    fn build<T: Component>(
        &self,
        args: Vec<ConstructorArgument>,
    ) -> Result<Arc<dyn Constructor>, BeanError>;
}

/// Picks the single constructor method passing every filter.
///
/// No match falls back to `T::default()`, several matches are ambiguous.
pub struct DefaultConstructorBuilder {
    filters: Vec<Box<dyn MethodFilter>>,
}

impl Default for DefaultConstructorBuilder {
    fn default() -> Self {
        DefaultConstructorBuilder {
            filters: vec![
                Box::new(FnMethodFilter(method_name_filter)),
                Box::new(FnMethodFilter(method_arity_filter)),
            ],
        }
    }
}

impl DefaultConstructorBuilder {
    pub fn new(filters: Vec<Box<dyn MethodFilter>>) -> Self {
        DefaultConstructorBuilder { filters }
    }

    pub fn with_filter(mut self, filter: impl MethodFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl ConstructorBuilder for DefaultConstructorBuilder {
    fn build<T: Component>(
        &self,
        args: Vec<ConstructorArgument>,
    ) -> Result<Arc<dyn Constructor>, BeanError> {
        let owner = TypeInfo::of::<T>();
        let mut methods: Vec<ConstructorMethod<T>> = T::constructors()
            .into_iter()
            .filter(|method| {
                let info = method.info();
                self.filters
                    .iter()
                    .all(|filter| filter.filter(&owner, &info, &args))
            })
            .collect();

        match methods.len() {
            0 => Ok(Arc::new(DefaultConstructor::<T>(PhantomData))),
            1 => {
                let method = methods.remove(0);
                tracing::debug!(
                    bean_type = owner.type_name,
                    method = method.name(),
                    "use constructor method"
                );
                Ok(Arc::new(MethodConstructor::new(method, args)?))
            }
            count => Err(BeanError::AmbiguousConstructor { count, typ: owner }),
        }
    }
}
