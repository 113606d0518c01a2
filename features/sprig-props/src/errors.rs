/// Errors when reading or writing properties
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PropsError {
    /// The key is not set and no default was given
    #[error("property with key='{0}' not found")]
    NotFound(String),

    /// The key is set, but the stored value cannot be read as the requested type
    #[error("cannot convert property '{key}' value '{value}' to '{target}'")]
    Conversion {
        key: String,
        value: String,
        target: &'static str,
    },

    /// An indexed key (`key[i]`) carries an index which is not a number
    #[error("invalid index '{index}' for property slice '{key}'")]
    InvalidIndex { key: String, index: String },
}

impl PropsError {
    /// Returns true if the error means the property is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, PropsError::NotFound(_))
    }
}
