//! Sprig Props is the key/value property source read by the bean factory when it wires
//! `value:${...}` fields.
//!
//! Sprig Props is split into two major parts:
//! 1. Properties: the source, a string store with typed reads and structured writes
//! 2. PropertyType: the conversion of stored strings into field types
//!
//! # Examples
//!
//! ```rust
//! use serde_json::json;
//! use sprig_props::{MemoryProperties, Properties, PropertiesExt};
//!
//! let props = MemoryProperties::new();
//! props
//!     .set("server", json!({ "host": "localhost", "ports": [8080, 8081] }))
//!     .unwrap();
//!
//! let host: String = props.get_as("server.host", None).unwrap();
//! let ports: Vec<u16> = props.get_as("server.ports", None).unwrap();
//! let name: String = props.get_as("server.name", Some("My Awesome App")).unwrap();
//!
//! assert_eq!(host, "localhost");
//! assert_eq!(ports, vec![8080, 8081]);
//! assert_eq!(name, "My Awesome App");
//! ```
//!
//! Sprig Props consists of the following components:
//!
//! 1. Properties - the property source trait and its in-memory implementation
//! 2. Options - the shape and default of a read
//! 3. Convert - for reading stored strings as typed values
//! 4. Errors - for property errors

pub mod convert;
pub mod errors;
pub mod options;
pub mod properties;

pub use convert::PropertyType;
pub use errors::PropsError;
pub use options::{GetOptions, Shape};
pub use properties::{MemoryProperties, Properties, PropertiesExt};
