use std::cmp::Ordering;

use crate::{
    bean::indirect_to,
    errors::BeanError,
    registry::BeanDefinitionRegistry,
    types::{BeanObject, TypeInfo},
};

/// Definitions assignable to a requested type
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Candidates {
    /// Names of the candidates flagged primary
    pub primary: Vec<String>,
    /// Names of all candidates, primary ones included
    pub all: Vec<String>,
}

impl Candidates {
    /// Collects the candidates for `element`, never cached as the registry may change
    pub fn find(registry: &dyn BeanDefinitionRegistry, element: &TypeInfo) -> Self {
        let mut candidates = Candidates::default();
        registry.visit_bean_definitions(&mut |name, definition| {
            if !definition.is_assignable_to(element) {
                return;
            }
            if definition.is_primary() {
                candidates.primary.push(name.to_string());
            }
            candidates.all.push(name.to_string());
        });
        candidates
    }

    /// Picks the bean for a field taking a single bean.
    ///
    /// Returns `None` if nothing matched and the field is optional.
    pub fn select_single(
        &self,
        field: &str,
        typ: &TypeInfo,
        optional: bool,
    ) -> Result<Option<&str>, BeanError> {
        match self.primary.len() {
            1 => return Ok(Some(self.primary[0].as_str())),
            0 => {}
            count => {
                return Err(BeanError::AmbiguousPrimary {
                    count,
                    field: field.to_string(),
                    typ: *typ,
                })
            }
        }

        match self.all.len() {
            0 if optional => Ok(None),
            0 => Err(BeanError::NoCandidate {
                field: field.to_string(),
                typ: *typ,
            }),
            1 => Ok(Some(self.all[0].as_str())),
            count => Err(BeanError::AmbiguousCandidates {
                count,
                field: field.to_string(),
                typ: *typ,
            }),
        }
    }
}

fn priority(bean: &BeanObject) -> Option<i32> {
    indirect_to(&**bean, |b| b.as_priority_order().map(|p| p.priority()))
}

/// Stable sort: beans with a priority first, higher priority first
pub fn sort_by_priority<V>(beans: &mut [(BeanObject, V)]) {
    beans.sort_by(|(a, _), (b, _)| match (priority(a), priority(b)) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        bean::{Bean, Component},
        capabilities::PriorityOrder,
        definition::BeanDefinition,
        registry::DefaultBeanDefinitionRegistry,
    };

    trait Codec: Send + Sync {}

    #[derive(Default)]
    struct Json;
    impl Codec for Json {}
    impl Bean for Json {}
    impl Component for Json {}

    #[derive(Default)]
    struct Yaml;
    impl Codec for Yaml {}
    impl Bean for Yaml {}
    impl Component for Yaml {}

    fn codec() -> TypeInfo {
        TypeInfo::of::<dyn Codec>()
    }

    fn candidates(primary: &[&str], all: &[&str]) -> Candidates {
        Candidates {
            primary: primary.iter().map(|s| s.to_string()).collect(),
            all: all.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn finds_assignable_definitions() {
        let registry = DefaultBeanDefinitionRegistry::new();
        let json = BeanDefinition::builder::<Json>()
            .primary()
            .implements::<dyn Codec>(|c| c as Arc<dyn Codec>)
            .build()
            .unwrap();
        let yaml = BeanDefinition::builder::<Yaml>()
            .implements::<dyn Codec>(|c| c as Arc<dyn Codec>)
            .build()
            .unwrap();
        registry.register_bean_definition("json", json).unwrap();
        registry.register_bean_definition("yaml", yaml).unwrap();

        let mut found = Candidates::find(&registry, &codec());
        found.all.sort();
        assert_eq!(found, candidates(&["json"], &["json", "yaml"]));

        let found = Candidates::find(&registry, &TypeInfo::of::<Yaml>());
        assert_eq!(found, candidates(&[], &["yaml"]));
    }

    #[test]
    fn single_primary_wins() {
        let found = candidates(&["json"], &["json", "yaml", "toml"]);
        assert_eq!(found.select_single("codec", &codec(), false).unwrap(), Some("json"));
    }

    #[test]
    fn ambiguity_is_reported_with_counts() {
        let err = candidates(&["json", "yaml"], &["json", "yaml"])
            .select_single("codec", &codec(), false)
            .unwrap_err();
        assert!(err.to_string().starts_with("2 primary candidates found for field 'codec'"));

        let err = candidates(&[], &["json", "yaml"])
            .select_single("codec", &codec(), true)
            .unwrap_err();
        assert!(err.to_string().starts_with("2 candidates found for field 'codec'"));
    }

    #[test]
    fn empty_candidates_depend_on_optional() {
        let none = Candidates::default();
        assert_eq!(none.select_single("codec", &codec(), true).unwrap(), None);

        let err = none.select_single("codec", &codec(), false).unwrap_err();
        assert!(err.is_not_found());

        let one = candidates(&[], &["yaml"]);
        assert_eq!(one.select_single("codec", &codec(), false).unwrap(), Some("yaml"));
    }

    struct Ranked(i32);
    impl PriorityOrder for Ranked {
        fn priority(&self) -> i32 {
            self.0
        }
    }
    impl Bean for Ranked {
        fn as_priority_order(&self) -> Option<&dyn PriorityOrder> {
            Some(self)
        }
    }

    #[test]
    fn priority_sort_is_stable() {
        let mut beans: Vec<(BeanObject, &str)> = vec![
            (Arc::new(Json) as BeanObject, "plain-1"),
            (Arc::new(Ranked(1)) as BeanObject, "low"),
            (Arc::new(Yaml) as BeanObject, "plain-2"),
            (Arc::new(Ranked(10)) as BeanObject, "high"),
            (Arc::new(Ranked(1)) as BeanObject, "low-2"),
        ];
        sort_by_priority(&mut beans);

        let order: Vec<_> = beans.iter().map(|(_, label)| *label).collect();
        assert_eq!(order, vec!["high", "low", "low-2", "plain-1", "plain-2"]);
    }
}
