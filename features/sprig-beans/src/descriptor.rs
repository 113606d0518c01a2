use std::{
    any::{type_name, Any},
    fmt::Debug,
    marker::PhantomData,
    sync::Arc,
};

use sprig_props::{PropertyType, PropsError, Shape};

use crate::{
    errors::BeanError,
    inject::Inject,
    types::{Injectable, TypeInfo, WiredValue},
};

const VALUE_PREFIX: &str = "value:";
const AUTOWIRE_PREFIX: &str = "autowire:";
const OPTIONAL_QUALIFIER: &str = "optional";
const WILDCARD: &str = "?";

/// `value:${name}` or `value:${name:=default}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRef {
    pub name: String,
    pub default: Option<String>,
}

/// `autowire:name`, `autowire:?` and their `,optional` forms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeanRef {
    pub name: String,
    pub optional: bool,
}
impl BeanRef {
    /// The bean is resolved by type
    pub fn is_wildcard(&self) -> bool {
        self.name == WILDCARD
    }
}

/// A parsed injection annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Property(PropertyRef),
    Bean(BeanRef),
}

/// Parses an injection annotation, an empty annotation means the field is not wired
pub fn parse_annotation(annotation: &str) -> Result<Option<Annotation>, BeanError> {
    if annotation.is_empty() {
        return Ok(None);
    }

    if let Some(content) = annotation.strip_prefix(VALUE_PREFIX) {
        return parse_property(content).map(|p| Some(Annotation::Property(p)));
    }
    if let Some(content) = annotation.strip_prefix(AUTOWIRE_PREFIX) {
        return parse_bean(content).map(|b| Some(Annotation::Bean(b)));
    }

    Err(BeanError::Invalid(format!(
        "Invalid tag '{annotation}', it must start with '{VALUE_PREFIX}' or '{AUTOWIRE_PREFIX}'"
    )))
}

fn parse_property(content: &str) -> Result<PropertyRef, BeanError> {
    let Some(expression) = content
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    else {
        return Err(BeanError::Invalid(format!(
            "Invalid value '{content}', it must format as ${{x.y}}"
        )));
    };

    if expression.is_empty() {
        return Err(BeanError::Invalid(
            "Required value content, it can't be empty".to_string(),
        ));
    }

    Ok(match expression.split_once(":=") {
        Some((name, default)) => PropertyRef {
            name: name.to_string(),
            default: Some(default.to_string()),
        },
        None => PropertyRef {
            name: expression.to_string(),
            default: None,
        },
    })
}

fn parse_bean(content: &str) -> Result<BeanRef, BeanError> {
    if content.is_empty() {
        return Err(BeanError::Invalid(
            "Required autowire content, it can't be empty".to_string(),
        ));
    }

    match content.split_once(',') {
        None => Ok(BeanRef {
            name: content.to_string(),
            optional: false,
        }),
        Some((name, OPTIONAL_QUALIFIER)) => Ok(BeanRef {
            name: name.to_string(),
            optional: true,
        }),
        Some((_, qualifier)) => Err(BeanError::Invalid(format!(
            "Invalid autowire '{qualifier}', it must be '{OPTIONAL_QUALIFIER}'"
        ))),
    }
}

/// How raw property values become the declared field type
#[derive(Clone, Copy)]
pub struct PropertyTarget {
    pub shape: Shape,
    convert: fn(&str, Vec<String>) -> Result<WiredValue, PropsError>,
}
impl PropertyTarget {
    pub(crate) fn of<V: PropertyType>() -> Self {
        fn convert<V: PropertyType>(key: &str, values: Vec<String>) -> Result<WiredValue, PropsError> {
            V::from_values(key, values).map(|v| Box::new(v) as WiredValue)
        }

        PropertyTarget {
            shape: V::SHAPE,
            convert: convert::<V>,
        }
    }

    pub(crate) fn convert(&self, key: &str, values: Vec<String>) -> Result<WiredValue, PropsError> {
        (self.convert)(key, values)
    }
}
impl Debug for PropertyTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyTarget")
            .field("shape", &self.shape)
            .finish()
    }
}

/// Which beans a bean reference accepts and how they are collected
#[derive(Clone, Copy)]
pub struct BeanTarget {
    /// `E` of `Arc<E>` or `Vec<Arc<E>>`
    pub element: TypeInfo,
    /// The field takes every candidate
    pub multiple: bool,
    collect: fn(Vec<WiredValue>) -> Option<WiredValue>,
}
impl BeanTarget {
    pub(crate) fn single<E: ?Sized + Injectable>() -> Self {
        BeanTarget {
            element: TypeInfo::of::<E>(),
            multiple: false,
            collect: collect_single::<E>,
        }
    }

    pub(crate) fn multiple<E: ?Sized + Injectable>() -> Self {
        BeanTarget {
            element: TypeInfo::of::<E>(),
            multiple: true,
            collect: collect_all::<E>,
        }
    }

    /// Turns casted beans into the field value
    pub(crate) fn collect(&self, beans: Vec<WiredValue>) -> Option<WiredValue> {
        (self.collect)(beans)
    }
}
impl Debug for BeanTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanTarget")
            .field("element", &self.element)
            .field("multiple", &self.multiple)
            .finish()
    }
}

fn collect_single<E: ?Sized + Injectable>(mut beans: Vec<WiredValue>) -> Option<WiredValue> {
    if beans.len() != 1 {
        return None;
    }
    let bean = beans.pop()?;
    bean.is::<Arc<E>>().then_some(bean)
}

fn collect_all<E: ?Sized + Injectable>(beans: Vec<WiredValue>) -> Option<WiredValue> {
    let beans = beans
        .into_iter()
        .map(|bean| bean.downcast::<Arc<E>>().ok().map(|bean| *bean))
        .collect::<Option<Vec<Arc<E>>>>()?;
    Some(Box::new(beans))
}

/// What a descriptor injects
#[derive(Debug, Clone)]
pub enum Injection {
    Property {
        reference: PropertyRef,
        target: PropertyTarget,
    },
    Bean {
        reference: BeanRef,
        target: BeanTarget,
    },
}

/// The declared kind of a field or constructor argument
#[derive(Debug, Clone, Copy)]
pub(crate) enum Slot {
    Property(PropertyTarget),
    Bean(BeanTarget),
}
impl Slot {
    /// Combines the declared kind with the parsed annotation
    pub(crate) fn compile(
        self,
        name: &str,
        annotation: &str,
    ) -> Result<Option<Injection>, BeanError> {
        let Some(annotation) = parse_annotation(annotation)? else {
            return Ok(None);
        };

        match (self, annotation) {
            (Slot::Property(target), Annotation::Property(reference)) => {
                Ok(Some(Injection::Property { reference, target }))
            }
            (Slot::Bean(target), Annotation::Bean(reference)) => {
                Ok(Some(Injection::Bean { reference, target }))
            }
            (Slot::Property(_), Annotation::Bean(_)) => Err(BeanError::Invalid(format!(
                "field '{name}' is a property field, it must be annotated with '{VALUE_PREFIX}'"
            ))),
            (Slot::Bean(_), Annotation::Property(_)) => Err(BeanError::Invalid(format!(
                "field '{name}' is a bean field, it must be annotated with '{AUTOWIRE_PREFIX}'"
            ))),
        }
    }
}

pub(crate) type Setter =
    Arc<dyn Fn(&(dyn Any + Send + Sync), WiredValue) -> Result<(), BeanError> + Send + Sync>;

/// A compiled, wired field of a bean definition
#[derive(Clone)]
pub struct FieldDescriptor {
    /// Declaration position
    pub index: usize,
    pub name: String,
    /// Declared type of the field value
    pub typ: TypeInfo,
    pub injection: Injection,
    setter: Option<Setter>,
}
impl FieldDescriptor {
    /// A descriptor without a field behind it, its value is taken from the collected values
    pub(crate) fn slot(index: usize, name: String, typ: TypeInfo, injection: Injection) -> Self {
        FieldDescriptor {
            index,
            name,
            typ,
            injection,
            setter: None,
        }
    }

    /// Writes a resolved value into the field of `target`
    pub(crate) fn set(
        &self,
        target: &(dyn Any + Send + Sync),
        value: WiredValue,
    ) -> Result<(), BeanError> {
        match &self.setter {
            Some(setter) => setter(target, value),
            None => Err(BeanError::Invalid(format!(
                "'{}' is not backed by a field",
                self.name
            ))),
        }
    }
}
impl Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("typ", &self.typ)
            .field("injection", &self.injection)
            .finish()
    }
}

/// Declaration of a wired field of `T`.
///
/// The accessor gives the factory access to the [`Inject`] cell of the field:
///
/// ```rust
/// use std::sync::Arc;
/// use sprig_beans::{Bean, Component, Field, Inject};
///
/// #[derive(Default)]
/// struct Database;
/// impl Bean for Database {}
/// impl Component for Database {}
///
/// #[derive(Default)]
/// struct Repository {
///     table: Inject<String>,
///     database: Inject<Arc<Database>>,
/// }
/// impl Bean for Repository {}
/// impl Component for Repository {
///     fn fields() -> Vec<Field<Self>> {
///         vec![
///             Field::property("table", "value:${repository.table:=users}", |r| &r.table),
///             Field::bean("database", "autowire:?", |r| &r.database),
///         ]
///     }
/// }
/// ```
pub struct Field<T> {
    name: String,
    annotation: String,
    typ: TypeInfo,
    slot: Slot,
    setter: Setter,
    _owner: PhantomData<fn(&T)>,
}

impl<T: Any + Send + Sync> Field<T> {
    /// A field read from the properties
    pub fn property<V: PropertyType>(
        name: impl Into<String>,
        annotation: impl Into<String>,
        field: fn(&T) -> &Inject<V>,
    ) -> Self {
        Self::new(name, annotation, Slot::Property(PropertyTarget::of::<V>()), field)
    }

    /// A field holding a single bean
    pub fn bean<E: ?Sized + Injectable>(
        name: impl Into<String>,
        annotation: impl Into<String>,
        field: fn(&T) -> &Inject<Arc<E>>,
    ) -> Self {
        Self::new(name, annotation, Slot::Bean(BeanTarget::single::<E>()), field)
    }

    /// A field holding every matching bean
    pub fn beans<E: ?Sized + Injectable>(
        name: impl Into<String>,
        annotation: impl Into<String>,
        field: fn(&T) -> &Inject<Vec<Arc<E>>>,
    ) -> Self {
        Self::new(name, annotation, Slot::Bean(BeanTarget::multiple::<E>()), field)
    }

    fn new<V: Injectable>(
        name: impl Into<String>,
        annotation: impl Into<String>,
        slot: Slot,
        field: fn(&T) -> &Inject<V>,
    ) -> Self {
        let name = name.into();
        Field {
            setter: setter::<T, V>(name.clone(), field),
            name,
            annotation: annotation.into(),
            typ: TypeInfo::of::<V>(),
            slot,
            _owner: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn compile(self, index: usize) -> Result<Option<FieldDescriptor>, BeanError> {
        let Some(injection) = self.slot.compile(&self.name, &self.annotation)? else {
            return Ok(None);
        };

        Ok(Some(FieldDescriptor {
            index,
            name: self.name,
            typ: self.typ,
            injection,
            setter: Some(self.setter),
        }))
    }
}

fn setter<T: Any, V: Injectable>(name: String, field: fn(&T) -> &Inject<V>) -> Setter {
    Arc::new(move |target, value| {
        let target = target.downcast_ref::<T>().ok_or_else(|| {
            BeanError::Invalid(format!(
                "cannot wire field '{name}', target is not a '{}'",
                type_name::<T>()
            ))
        })?;
        let value = value.downcast::<V>().map_err(|_| {
            BeanError::Invalid(format!(
                "cannot wire field '{name}', value is not a '{}'",
                type_name::<V>()
            ))
        })?;

        field(target)
            .set(*value)
            .map_err(|_| BeanError::AlreadyWired(name.clone()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property(name: &str, default: Option<&str>) -> Option<Annotation> {
        Some(Annotation::Property(PropertyRef {
            name: name.to_string(),
            default: default.map(str::to_string),
        }))
    }

    fn bean(name: &str, optional: bool) -> Option<Annotation> {
        Some(Annotation::Bean(BeanRef {
            name: name.to_string(),
            optional,
        }))
    }

    #[test]
    fn parses_the_annotation_grammar() {
        assert_eq!(parse_annotation("").unwrap(), None);
        assert_eq!(parse_annotation("value:${a.b}").unwrap(), property("a.b", None));
        assert_eq!(
            parse_annotation("value:${a.b:=x:=y}").unwrap(),
            property("a.b", Some("x:=y"))
        );
        assert_eq!(parse_annotation("value:${a:=}").unwrap(), property("a", Some("")));
        assert_eq!(parse_annotation("autowire:db").unwrap(), bean("db", false));
        assert_eq!(parse_annotation("autowire:db,optional").unwrap(), bean("db", true));
        assert_eq!(parse_annotation("autowire:?").unwrap(), bean("?", false));
        assert_eq!(parse_annotation("autowire:?,optional").unwrap(), bean("?", true));
    }

    #[test]
    fn rejects_malformed_annotations() {
        for annotation in [
            "inject:db",
            "value:a.b",
            "value:${a.b",
            "value:${}",
            "autowire:",
            "autowire:db,required",
            "autowire:db,optional,lazy",
        ] {
            let err = parse_annotation(annotation).unwrap_err();
            assert!(matches!(err, BeanError::Invalid(_)), "{annotation}: {err}");
        }
    }

    #[derive(Default)]
    struct Target {
        port: Inject<u16>,
        peer: Inject<Arc<String>>,
    }

    #[test]
    fn compiled_field_writes_through_setter() {
        let descriptor = Field::<Target>::property("port", "value:${port}", |t| &t.port)
            .compile(0)
            .unwrap()
            .unwrap();
        assert_eq!(descriptor.typ, TypeInfo::of::<u16>());

        let target = Target::default();
        descriptor.set(&target, Box::new(8080_u16)).unwrap();
        assert_eq!(*target.port, 8080);

        let again = descriptor.set(&target, Box::new(1_u16)).unwrap_err();
        assert!(matches!(again, BeanError::AlreadyWired(name) if name == "port"));

        let wrong = descriptor.set(&target, Box::new("8080")).unwrap_err();
        assert!(matches!(wrong, BeanError::Invalid(_)));
    }

    #[test]
    fn empty_annotation_produces_no_descriptor() {
        let field = Field::<Target>::bean("peer", "", |t| &t.peer);
        assert!(field.compile(1).unwrap().is_none());
    }

    #[test]
    fn annotation_kind_must_match_field_kind() {
        let err = Field::<Target>::bean("peer", "value:${peer}", |t| &t.peer)
            .compile(1)
            .unwrap_err();
        assert!(matches!(err, BeanError::Invalid(_)));

        let err = Field::<Target>::property("port", "autowire:?", |t| &t.port)
            .compile(0)
            .unwrap_err();
        assert!(matches!(err, BeanError::Invalid(_)));
    }

    #[test]
    fn bean_targets_collect_typed_values() {
        let single = BeanTarget::single::<String>();
        let value = single
            .collect(vec![Box::new(Arc::new("a".to_string()))])
            .unwrap();
        assert_eq!(**value.downcast::<Arc<String>>().unwrap(), "a");

        let all = BeanTarget::multiple::<String>();
        let value = all
            .collect(vec![
                Box::new(Arc::new("a".to_string())),
                Box::new(Arc::new("b".to_string())),
            ])
            .unwrap();
        let values = value.downcast::<Vec<Arc<String>>>().unwrap();
        assert_eq!(values.len(), 2);

        assert!(all.collect(vec![Box::new(1_u8)]).is_none());
    }
}
