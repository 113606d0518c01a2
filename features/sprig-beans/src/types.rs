use std::{
    any::{Any, TypeId},
    sync::Arc,
};

use crate::bean::Bean;

/// All errors must be clone
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Beans are shared between threads during pre-instantiation
/// So anything injectable needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: ?Sized + Send + Sync + 'static> Injectable for T {}

/// A bean instance as handed out by the factory
pub type BeanObject = Arc<dyn Bean>;

/// A resolved value on its way into a field or constructor slot
pub type WiredValue = Box<dyn Any + Send + Sync>;

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }

    /// Type name without module path and generic arguments.
    ///
    /// `app::server::HttpServer<app::Tls>` becomes `HttpServer`.
    pub fn short_name(&self) -> &'static str {
        let name = self.type_name;
        let name = match name.find('<') {
            Some(generics) => &name[..generics],
            None => name,
        };
        let name = name.strip_prefix("dyn ").unwrap_or(name);
        let name = name.split(" + ").next().unwrap_or(name);
        match name.rfind("::") {
            Some(path) => &name[path + 2..],
            None => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod nested {
        pub struct Server<T>(pub T);
        pub trait Handler {}
    }

    #[test]
    fn short_name_strips_path_and_generics() {
        assert_eq!(TypeInfo::of::<nested::Server<String>>().short_name(), "Server");
        assert_eq!(TypeInfo::of::<u32>().short_name(), "u32");
        assert_eq!(TypeInfo::of::<dyn nested::Handler>().short_name(), "Handler");
        assert_eq!(
            TypeInfo::of::<dyn nested::Handler + Send + Sync>().short_name(),
            "Handler"
        );
    }

    #[test]
    fn type_info_compares_by_type() {
        assert_eq!(TypeInfo::of::<String>(), TypeInfo::of::<String>());
        assert_ne!(TypeInfo::of::<String>(), TypeInfo::of::<&'static str>());
        assert_eq!(TypeInfo::of::<u8>().to_string(), "u8");
    }
}
