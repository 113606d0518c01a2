use std::{any::Any, collections::HashMap};

use crate::{descriptor::FieldDescriptor, errors::BeanError, types::WiredValue};

/// Resolved values, keyed by the index of the field or constructor argument they belong to
#[derive(Default)]
pub struct PropertyValues {
    values: HashMap<usize, WiredValue>,
}

impl PropertyValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_value(&mut self, index: usize, value: WiredValue) {
        self.values.insert(index, value);
    }

    pub fn contains(&self, index: usize) -> bool {
        self.values.contains_key(&index)
    }

    pub fn take(&mut self, index: usize) -> Option<WiredValue> {
        self.values.remove(&index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Writes the collected values into the fields of `target`.
    ///
    /// Fields without a value are left untouched.
    pub fn set_properties(
        &mut self,
        target: &(dyn Any + Send + Sync),
        descriptors: &[FieldDescriptor],
    ) -> Result<(), BeanError> {
        for descriptor in descriptors {
            let Some(value) = self.values.remove(&descriptor.index) else {
                tracing::debug!(
                    field_index = descriptor.index,
                    field_name = %descriptor.name,
                    "the value of field not found, skip it"
                );
                continue;
            };

            descriptor.set(target, value)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{descriptor::Field, inject::Inject};

    #[derive(Default)]
    struct Target {
        name: Inject<String>,
        peer: Inject<Arc<String>>,
    }

    fn descriptors() -> Vec<FieldDescriptor> {
        vec![
            Field::<Target>::property("name", "value:${name}", |t| &t.name),
            Field::<Target>::bean("peer", "autowire:peer,optional", |t| &t.peer),
        ]
        .into_iter()
        .enumerate()
        .filter_map(|(index, field)| field.compile(index).unwrap())
        .collect()
    }

    #[test]
    fn missing_values_are_skipped() {
        let target = Target::default();
        let mut values = PropertyValues::new();
        values.add_value(0, Box::new("svc".to_string()));

        values.set_properties(&target, &descriptors()).unwrap();

        assert_eq!(*target.name, "svc");
        assert!(!target.peer.is_set());
        assert!(values.is_empty());
    }

    #[test]
    fn take_hands_out_each_value_once() {
        let mut values = PropertyValues::new();
        values.add_value(3, Box::new(1_u8));
        assert!(values.contains(3));
        assert_eq!(values.len(), 1);

        let value = values.take(3).unwrap();
        assert_eq!(*value.downcast::<u8>().unwrap(), 1);
        assert!(values.take(3).is_none());
    }
}
