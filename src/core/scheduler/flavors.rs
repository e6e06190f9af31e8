//! Resolution of a pod's acceptable hardware flavors and evaluation of nodes against them.
//!
//! The flavors come from the model the pod serves, in the model's declared preference order.
//! A node is a candidate when it carries every label of at least one flavor, and it is scored
//! by the position of the first flavor it satisfies: earlier flavors are cheaper or less
//! scarce, so they get larger weights.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::config::ResourceFungibilityArgs;
use crate::core::common::{labels_match, Labels};
use crate::core::model::OpenModel;
use crate::core::model_store::{ModelStore, StoreError};
use crate::core::scheduler::plugin::MAX_NODE_SCORE;

/// Fibonacci weights, one per flavor position. Models carry at most 8 flavors.
pub const SCORE_WEIGHTS: [u32; 8] = [34, 21, 13, 8, 5, 3, 2, 1];
pub const TOTAL_WEIGHT: u32 = 34 + 21 + 13 + 8 + 5 + 3 + 2 + 1;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFlavor {
    pub name: String,
    // Empty means every node satisfies the flavor.
    pub required_labels: Labels,
}

/// Flavors a pod accepts, most preferred first.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFlavors {
    pub flavors: Vec<ResolvedFlavor>,
    /// Set when some flavor accepts any node, so filtering by hardware is pointless.
    pub bypass_hardware_match: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The pod doesn't take part in flavor aware scheduling.
    Skip { reason: Option<String> },
    Resolved(ResolvedFlavors),
}

impl ResolvedFlavors {
    pub fn new(flavors: Vec<ResolvedFlavor>) -> Self {
        let bypass_hardware_match =
            flavors.is_empty() || flavors.iter().any(|f| f.required_labels.is_empty());
        Self {
            flavors,
            bypass_hardware_match,
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.flavors.iter().map(|f| f.name.as_str()).collect()
    }
}

/// Resolves the flavors for a pod described by its labels and annotations.
///
/// Only a failed model lookup is an error. A pod without the model label, a model without
/// flavors or an annotation naming a flavor the model doesn't declare all resolve to
/// `Resolution::Skip`.
pub fn resolve(
    store: &dyn ModelStore,
    args: &ResourceFungibilityArgs,
    labels: &Labels,
    annotations: &HashMap<String, String>,
) -> Result<Resolution, StoreError> {
    let model_name = match labels.get(&args.model_name_label_key) {
        Some(name) if !name.is_empty() => name,
        _ => return Ok(Resolution::Skip { reason: None }),
    };

    let model = store.get_model(model_name)?;

    let Some(declared) = declared_flavors(&model) else {
        debug!("model {:?} declares no flavors", model_name);
        return Ok(Resolution::Skip { reason: None });
    };

    let flavors = match annotations.get(&args.flavors_annotation_key) {
        Some(value) => match narrow_flavors(declared, value, model_name) {
            Ok(flavors) => flavors,
            Err(reason) => {
                return Ok(Resolution::Skip {
                    reason: Some(reason),
                })
            }
        },
        None => declared,
    };

    Ok(Resolution::Resolved(ResolvedFlavors::new(flavors)))
}

// Flavors in declared order, or None if the model has nothing to match on.
fn declared_flavors(model: &OpenModel) -> Option<Vec<ResolvedFlavor>> {
    let config = model.spec.inference_config.as_ref()?;
    if config.flavors.is_empty() {
        return None;
    }
    Some(
        config
            .flavors
            .iter()
            .map(|flavor| ResolvedFlavor {
                name: flavor.name.clone(),
                required_labels: flavor.node_selector.clone().unwrap_or_default(),
            })
            .collect(),
    )
}

// Keeps only the flavors named in the comma separated `requested` list, in the model's order.
// Blank entries are ignored; an all-blank list leaves the declared flavors untouched.
fn narrow_flavors(
    declared: Vec<ResolvedFlavor>,
    requested: &str,
    model_name: &str,
) -> Result<Vec<ResolvedFlavor>, String> {
    let requested: Vec<&str> = requested
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();
    if requested.is_empty() {
        return Ok(declared);
    }

    if let Some(missing) = requested
        .iter()
        .find(|name| !declared.iter().any(|f| f.name == **name))
    {
        return Err(format!(
            "flavor {:?} not found in model {:?}",
            missing, model_name
        ));
    }

    let requested: HashSet<&str> = requested.into_iter().collect();
    Ok(declared
        .into_iter()
        .filter(|f| requested.contains(f.name.as_str()))
        .collect())
}

/// A node is eligible if it satisfies at least one flavor, or if matching is bypassed.
pub fn is_eligible(flavors: &ResolvedFlavors, node_labels: &Labels) -> bool {
    flavors.bypass_hardware_match || first_matching_ordinal(flavors, node_labels).is_some()
}

/// Position of the first flavor whose labels are all present on the node.
pub fn first_matching_ordinal(flavors: &ResolvedFlavors, node_labels: &Labels) -> Option<usize> {
    flavors
        .flavors
        .iter()
        .position(|flavor| labels_match(&flavor.required_labels, node_labels))
}

/// Normalized score for the flavor at `ordinal`, None past the weight table.
pub fn ordinal_score(ordinal: usize) -> Option<i64> {
    let weight = SCORE_WEIGHTS.get(ordinal)?;
    Some((f64::from(*weight) / f64::from(TOTAL_WEIGHT) * MAX_NODE_SCORE as f64).round() as i64)
}

/// Score of the first flavor the node satisfies. None if it satisfies none.
pub fn score(flavors: &ResolvedFlavors, node_labels: &Labels) -> Option<i64> {
    first_matching_ordinal(flavors, node_labels).and_then(ordinal_score)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::model::{Flavor, OpenModel};
    use crate::core::model_store::InMemoryModelStore;

    const GPU: &str = "karpenter.k8s.aws/instance-gpu-name";

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn flavor(name: &str, selector: &[(&str, &str)]) -> ResolvedFlavor {
        ResolvedFlavor {
            name: name.to_string(),
            required_labels: labels(selector),
        }
    }

    fn t4_a100_model() -> OpenModel {
        OpenModel::new("test-model").with_flavors(vec![
            Flavor::new("t4", &[(GPU, "t4")]),
            Flavor::new("a100", &[(GPU, "a100")]),
        ])
    }

    fn resolve_pod(
        store: &InMemoryModelStore,
        pod_labels: &[(&str, &str)],
        pod_annotations: &[(&str, &str)],
    ) -> Result<Resolution, StoreError> {
        resolve(
            store,
            &ResourceFungibilityArgs::default(),
            &labels(pod_labels),
            &labels(pod_annotations),
        )
    }

    #[test]
    fn test_score_table() {
        let scores: Vec<i64> = (0..8).map(|i| ordinal_score(i).unwrap()).collect();
        assert_eq!(scores, vec![39, 24, 15, 9, 6, 3, 2, 1]);
        assert_eq!(TOTAL_WEIGHT, 87);
        assert_eq!(ordinal_score(8), None);
    }

    #[test]
    fn test_no_model_label_skips_without_fetch() {
        let store = InMemoryModelStore::new(vec![t4_a100_model()]);
        assert_eq!(
            resolve_pod(&store, &[], &[]).unwrap(),
            Resolution::Skip { reason: None }
        );
        assert_eq!(
            resolve_pod(&store, &[("llmaz.io/model-name", "")], &[]).unwrap(),
            Resolution::Skip { reason: None }
        );
        assert_eq!(store.fetch_count(), 0);
    }

    #[test]
    fn test_missing_model_is_an_error() {
        let store = InMemoryModelStore::default();
        assert_eq!(
            resolve_pod(&store, &[("llmaz.io/model-name", "test-model")], &[]).unwrap_err(),
            StoreError::NotFound {
                name: "test-model".to_string()
            }
        );
    }

    #[test]
    fn test_model_without_flavors_skips() {
        let store = InMemoryModelStore::new(vec![
            OpenModel::new("no-config"),
            OpenModel::new("no-flavors").with_flavors(vec![]),
        ]);
        for model in ["no-config", "no-flavors"] {
            assert_eq!(
                resolve_pod(&store, &[("llmaz.io/model-name", model)], &[]).unwrap(),
                Resolution::Skip { reason: None }
            );
        }
    }

    #[test]
    fn test_resolve_keeps_declared_order() {
        let store = InMemoryModelStore::new(vec![t4_a100_model()]);
        let resolution =
            resolve_pod(&store, &[("llmaz.io/model-name", "test-model")], &[]).unwrap();
        assert_eq!(
            resolution,
            Resolution::Resolved(ResolvedFlavors {
                flavors: vec![flavor("t4", &[(GPU, "t4")]), flavor("a100", &[(GPU, "a100")])],
                bypass_hardware_match: false,
            })
        );
    }

    #[test]
    fn test_empty_selector_sets_bypass_and_keeps_full_list() {
        let model = OpenModel::new("test-model").with_flavors(vec![
            Flavor::new("t4", &[(GPU, "t4")]),
            Flavor {
                name: "none".to_string(),
                node_selector: None,
            },
            Flavor::new("empty", &[]),
        ]);
        let store = InMemoryModelStore::new(vec![model]);

        let Resolution::Resolved(flavors) =
            resolve_pod(&store, &[("llmaz.io/model-name", "test-model")], &[]).unwrap()
        else {
            panic!("expected resolved flavors");
        };
        assert!(flavors.bypass_hardware_match);
        assert_eq!(flavors.names(), vec!["t4", "none", "empty"]);
    }

    #[test]
    fn test_annotation_narrows_in_model_order() {
        let model = OpenModel::new("test-model").with_flavors(vec![
            Flavor::new("t4", &[(GPU, "t4")]),
            Flavor::new("l4", &[(GPU, "l4")]),
            Flavor::new("a100", &[(GPU, "a100")]),
        ]);
        let store = InMemoryModelStore::new(vec![model]);

        let Resolution::Resolved(flavors) = resolve_pod(
            &store,
            &[("llmaz.io/model-name", "test-model")],
            &[("llmaz.io/inference-service-flavors", "a100, t4,")],
        )
        .unwrap() else {
            panic!("expected resolved flavors");
        };
        assert_eq!(flavors.names(), vec!["t4", "a100"]);
        assert!(!flavors.bypass_hardware_match);
    }

    #[test]
    fn test_annotation_with_unknown_flavor_skips_with_reason() {
        let store = InMemoryModelStore::new(vec![t4_a100_model()]);
        assert_eq!(
            resolve_pod(
                &store,
                &[("llmaz.io/model-name", "test-model")],
                &[("llmaz.io/inference-service-flavors", "t4,a10")],
            )
            .unwrap(),
            Resolution::Skip {
                reason: Some("flavor \"a10\" not found in model \"test-model\"".to_string())
            }
        );
    }

    #[test]
    fn test_blank_annotation_is_ignored() {
        let store = InMemoryModelStore::new(vec![t4_a100_model()]);
        let Resolution::Resolved(flavors) = resolve_pod(
            &store,
            &[("llmaz.io/model-name", "test-model")],
            &[("llmaz.io/inference-service-flavors", " , ")],
        )
        .unwrap() else {
            panic!("expected resolved flavors");
        };
        assert_eq!(flavors.names(), vec!["t4", "a100"]);
    }

    #[test]
    fn test_eligibility_is_or_across_flavors() {
        let flavors = ResolvedFlavors::new(vec![
            flavor("t4", &[(GPU, "t4")]),
            flavor("a100", &[(GPU, "a100"), ("zone", "a")]),
        ]);
        assert!(is_eligible(&flavors, &labels(&[(GPU, "t4")])));
        assert!(is_eligible(&flavors, &labels(&[(GPU, "a100"), ("zone", "a")])));
        assert!(!is_eligible(&flavors, &labels(&[(GPU, "a100")])));
        assert!(!is_eligible(&flavors, &Labels::new()));
    }

    #[test]
    fn test_bypass_makes_every_node_eligible() {
        let flavors = ResolvedFlavors::new(vec![flavor("t4", &[(GPU, "t4")]), flavor("any", &[])]);
        assert!(flavors.bypass_hardware_match);
        assert!(is_eligible(&flavors, &Labels::new()));
        assert!(is_eligible(&flavors, &labels(&[(GPU, "h100")])));
    }

    #[test]
    fn test_score_uses_first_match() {
        let flavors = ResolvedFlavors::new(vec![
            flavor("a100", &[(GPU, "a100")]),
            flavor("zone", &[("zone", "a")]),
        ]);
        let node = labels(&[(GPU, "a100"), ("zone", "a")]);
        assert_eq!(score(&flavors, &node), Some(39));
        assert_eq!(score(&flavors, &labels(&[("zone", "a")])), Some(24));
        assert_eq!(score(&flavors, &labels(&[(GPU, "t4")])), None);
    }

    #[test]
    fn test_score_with_empty_selector_after_specific_flavor() {
        let flavors = ResolvedFlavors::new(vec![flavor("t4", &[(GPU, "t4")]), flavor("any", &[])]);
        assert_eq!(score(&flavors, &labels(&[(GPU, "t4")])), Some(39));
        assert_eq!(score(&flavors, &labels(&[(GPU, "a100")])), Some(24));
    }

    #[test]
    fn test_cloned_flavors_are_independent() {
        let store = InMemoryModelStore::new(vec![t4_a100_model()]);
        let pod = [("llmaz.io/model-name", "test-model")];
        let first = resolve_pod(&store, &pod, &[]).unwrap();
        let second = resolve_pod(&store, &pod, &[]).unwrap();
        assert_eq!(first, second);

        let Resolution::Resolved(original) = first else {
            panic!("expected resolved flavors");
        };
        let mut cloned = original.clone();
        cloned.flavors[0]
            .required_labels
            .insert(GPU.to_string(), "h100".to_string());
        cloned.flavors.pop();

        assert_eq!(original.names(), vec!["t4", "a100"]);
        assert_eq!(original.flavors[0].required_labels, labels(&[(GPU, "t4")]));
    }
}
