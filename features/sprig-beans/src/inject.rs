use std::{any::type_name, fmt::Debug, ops::Deref, sync::OnceLock};

/// A field written by the bean factory.
///
/// The factory writes each declared field once, through a shared reference, so a
/// singleton can already be handed to other beans while its own fields are still being
/// wired.
///
/// ### Panics
///
/// Dereferencing panics if the field was not wired. This happens if:
/// - It is accessed from a constructor or before its bean was wired
/// - The field is optional and nothing matched
///
/// Use [`Inject::get`] where the field may be unset.
pub struct Inject<V>(OnceLock<V>);

impl<V> Inject<V> {
    pub const fn new() -> Self {
        Inject(OnceLock::new())
    }

    /// A field which is already set, for constructor methods
    pub fn with(value: V) -> Self {
        Inject(OnceLock::from(value))
    }

    pub fn get(&self) -> Option<&V> {
        self.0.get()
    }

    pub fn is_set(&self) -> bool {
        self.0.get().is_some()
    }

    /// Writes the value, handing it back if the field is already set
    pub fn set(&self, value: V) -> Result<(), V> {
        self.0.set(value)
    }
}

impl<V> Default for Inject<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Deref for Inject<V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        match self.0.get() {
            Some(value) => value,
            None => panic!("Inject<{}> accessed before it was wired", type_name::<V>()),
        }
    }
}

impl<V: Debug> Debug for Inject<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.get() {
            Some(value) => f.debug_tuple("Inject").field(value).finish(),
            None => f.write_str("Inject(<unset>)"),
        }
    }
}
