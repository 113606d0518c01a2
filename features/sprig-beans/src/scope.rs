use std::{fmt::Display, str::FromStr};

use crate::{errors::BeanError, types::BeanObject};

/// Lifetime policy of a bean definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BeanScope {
    /// One cached instance per factory
    #[default]
    Singleton,
    /// A fresh instance per request
    Prototype,
}

impl BeanScope {
    pub const SINGLETON: &'static str = "singleton";
    pub const PROTOTYPE: &'static str = "prototype";

    pub fn as_str(&self) -> &'static str {
        match self {
            BeanScope::Singleton => Self::SINGLETON,
            BeanScope::Prototype => Self::PROTOTYPE,
        }
    }

    /// The scope name is taken by a built-in scope
    pub fn is_reserved(name: &str) -> bool {
        name == Self::SINGLETON || name == Self::PROTOTYPE
    }
}

impl Display for BeanScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BeanScope {
    type Err = BeanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Self::SINGLETON => Ok(BeanScope::Singleton),
            Self::PROTOTYPE => Ok(BeanScope::Prototype),
            other => Err(BeanError::Invalid(format!(
                "Unsupported scope '{other}', it must be ['{}', '{}']",
                Self::SINGLETON,
                Self::PROTOTYPE
            ))),
        }
    }
}

/// Creates an object on demand, handed to [`Scope::get`]
pub trait ObjectFactory {
    fn get_object(&self) -> Result<BeanObject, BeanError>;
}

impl<F: Fn() -> Result<BeanObject, BeanError>> ObjectFactory for F {
    fn get_object(&self) -> Result<BeanObject, BeanError> {
        self()
    }
}

/// Strategy holding bean instances outside the built-in scopes
pub trait Scope: Send + Sync {
    /// Returns the object stored under `name`, creating it through `factory` if absent
    fn get(&self, name: &str, factory: &dyn ObjectFactory) -> Result<BeanObject, BeanError>;

    /// Removes the object stored under `name`
    fn remove(&self, name: &str) -> Result<(), BeanError>;
}
