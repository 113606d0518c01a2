use std::any::type_name;

use crate::{errors::PropsError, options::Shape};

/// A type a property can be read as.
///
/// Properties are stored as strings, this trait turns the raw values of a key into
/// the requested type. Scalars expect exactly one raw value, `Vec<_>` of a scalar
/// reads a sequence.
pub trait PropertyType: Sized + Send + Sync + 'static {
    /// Shape requested from the property source
    const SHAPE: Shape;

    fn from_values(key: &str, values: Vec<String>) -> Result<Self, PropsError>;
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn conversion_error<T>(key: &str, value: &str) -> PropsError {
    PropsError::Conversion {
        key: key.to_string(),
        value: value.to_string(),
        target: type_name::<T>(),
    }
}

fn single_value<T>(key: &str, mut values: Vec<String>) -> Result<String, PropsError> {
    if values.len() != 1 {
        return Err(conversion_error::<T>(key, &values.join(",")));
    }
    Ok(values.remove(0))
}

macro_rules! property_type {
    ($($ty:ty => $parse:expr),* $(,)?) => {
        $(
            impl PropertyType for $ty {
                const SHAPE: Shape = Shape::Scalar;

                fn from_values(key: &str, values: Vec<String>) -> Result<Self, PropsError> {
                    let raw = single_value::<$ty>(key, values)?;
                    let parse: fn(&str) -> Option<$ty> = $parse;
                    parse(&raw).ok_or_else(|| conversion_error::<$ty>(key, &raw))
                }
            }

            impl PropertyType for Vec<$ty> {
                const SHAPE: Shape = Shape::Sequence;

                fn from_values(key: &str, values: Vec<String>) -> Result<Self, PropsError> {
                    let parse: fn(&str) -> Option<$ty> = $parse;
                    values
                        .iter()
                        .map(|raw| parse(raw).ok_or_else(|| conversion_error::<$ty>(key, raw)))
                        .collect()
                }
            }
        )*
    };
}

property_type! {
    String => |raw| Some(raw.to_string()),
    bool => parse_bool,
    char => |raw| raw.parse().ok(),
    i8 => |raw| raw.trim().parse().ok(),
    i16 => |raw| raw.trim().parse().ok(),
    i32 => |raw| raw.trim().parse().ok(),
    i64 => |raw| raw.trim().parse().ok(),
    isize => |raw| raw.trim().parse().ok(),
    u8 => |raw| raw.trim().parse().ok(),
    u16 => |raw| raw.trim().parse().ok(),
    u32 => |raw| raw.trim().parse().ok(),
    u64 => |raw| raw.trim().parse().ok(),
    usize => |raw| raw.trim().parse().ok(),
    f32 => |raw| raw.trim().parse().ok(),
    f64 => |raw| raw.trim().parse().ok(),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn scalars_parse_single_value() {
        assert_eq!(u16::from_values("port", values(&["8080"])).unwrap(), 8080);
        assert_eq!(String::from_values("name", values(&[" a b "])).unwrap(), " a b ");
        assert!(bool::from_values("flag", values(&["Yes"])).unwrap());
        assert!(!bool::from_values("flag", values(&["0"])).unwrap());
    }

    #[test]
    fn scalar_rejects_garbage_and_lists() {
        let err = u8::from_values("level", values(&["300"])).unwrap_err();
        assert!(matches!(err, PropsError::Conversion { target: "u8", .. }));

        assert!(i32::from_values("n", values(&["1", "2"])).is_err());
    }

    #[test]
    fn sequences_parse_each_element() {
        let hosts = Vec::<String>::from_values("hosts", values(&["a", "b"])).unwrap();
        assert_eq!(hosts, vec!["a", "b"]);

        let ports = Vec::<u32>::from_values("ports", values(&[])).unwrap();
        assert!(ports.is_empty());

        assert!(Vec::<u32>::from_values("ports", values(&["1", "x"])).is_err());
    }
}
