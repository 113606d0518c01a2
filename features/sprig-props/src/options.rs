/// How the stored value of a key is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    /// A single value stored under `key`
    #[default]
    Scalar,
    /// A list, stored either under `key` or as `key[0]`, `key[1]`, ...
    Sequence,
}

/// Options for [`Properties::get`](crate::Properties::get)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Shape of the requested value
    pub shape: Shape,
    /// Literal used when the key is not set.
    ///
    /// For sequences the literal is split on `,`, an empty literal is an empty list.
    pub default: Option<String>,
}

impl GetOptions {
    pub fn scalar() -> Self {
        Self::default()
    }

    pub fn sequence() -> Self {
        Self {
            shape: Shape::Sequence,
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn maybe_default(mut self, default: Option<&str>) -> Self {
        self.default = default.map(str::to_string);
        self
    }
}
