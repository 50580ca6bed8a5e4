//! Random test data generators using the fake crate
//!
//! Provides realistic random data including:
//! - Worktype, workbin and status names
//! - Random but always resolvable status graphs
//! - Property-based testing strategies

use fake::faker::lorem::en::{Sentence, Word};
use fake::Fake;
use proptest::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use taskmgmt_core::{models::StatusCategory, resources::StatusConfig};

const CATEGORIES: [StatusCategory; 4] = [
    StatusCategory::Open,
    StatusCategory::InProgress,
    StatusCategory::Waiting,
    StatusCategory::Closed,
];

/// Generate a realistic worktype name (e.g. "Claims 123")
pub fn generate_worktype_name() -> String {
    let prefixes = ["Claims", "Returns", "Onboarding", "Escalations", "Billing", "Approvals"];
    let prefix = prefixes[rand::thread_rng().gen_range(0..prefixes.len())];
    let number: u32 = (1..9999).fake();
    format!("{prefix} {number}")
}

pub fn generate_workbin_name() -> String {
    let word: String = Word().fake();
    format!("{word} workbin")
}

pub fn generate_description() -> String {
    Sentence(3..8).fake()
}

pub fn generate_status_category() -> StatusCategory {
    CATEGORIES[rand::thread_rng().gen_range(0..CATEGORIES.len())]
}

/// Configurable generator for status graphs
pub struct StatusGraphGenerator {
    pub size: usize,
    /// Upper bound on destinations per status
    pub max_destinations: usize,
    /// Chance that a status gets a default destination
    pub default_probability: f64,
}

impl Default for StatusGraphGenerator {
    fn default() -> Self {
        Self {
            size: 6,
            max_destinations: 3,
            default_probability: 0.7,
        }
    }
}

impl StatusGraphGenerator {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    /// Statuses with unique names whose references all resolve within the set
    pub fn generate(&self) -> Vec<StatusConfig> {
        let mut rng = rand::thread_rng();
        let names: Vec<String> = (1..=self.size).map(|i| format!("Status {i}")).collect();

        names
            .iter()
            .map(|name| {
                let mut status = StatusConfig::new(name.clone(), generate_status_category());
                let count = rng.gen_range(0..=self.max_destinations.min(names.len()));
                status.destination_status_names = names
                    .choose_multiple(&mut rng, count)
                    .cloned()
                    .collect();
                if !status.destination_status_names.is_empty() && rng.gen_bool(self.default_probability) {
                    status.default_destination_status_name =
                        status.destination_status_names.choose(&mut rng).cloned();
                }
                status
            })
            .collect()
    }
}

/// Strategy for any status category
pub fn status_category_strategy() -> impl Strategy<Value = StatusCategory> {
    prop_oneof![
        Just(StatusCategory::Open),
        Just(StatusCategory::InProgress),
        Just(StatusCategory::Waiting),
        Just(StatusCategory::Closed),
    ]
}

/// Strategy for `HH:MM:SS` transition times
pub fn transition_time_strategy() -> impl Strategy<Value = String> {
    (0u32..24, 0u32..60, 0u32..60).prop_map(|(h, m, s)| format!("{h:02}:{m:02}:{s:02}"))
}

/// Strategy for resolvable status graphs of 1 to `max_size` statuses.
///
/// Each status draws its destinations and default from the whole set, so
/// cycles and self references are common.
pub fn status_graph_strategy(max_size: usize) -> impl Strategy<Value = Vec<StatusConfig>> {
    (1..=max_size.max(1)).prop_flat_map(|size| {
        let status = (
            status_category_strategy(),
            proptest::collection::btree_set(0..size, 0..=size.min(3)),
            proptest::option::of(0..size),
        );
        proptest::collection::vec(status, size).prop_map(move |specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (category, destinations, default))| {
                    let mut status = StatusConfig::new(format!("Status {i}"), category);
                    status.destination_status_names =
                        destinations.into_iter().map(|d| format!("Status {d}")).collect();
                    status.default_destination_status_name = default.map(|d| format!("Status {d}"));
                    if let Some(default) = &status.default_destination_status_name {
                        if !status.destination_status_names.contains(default) {
                            status.destination_status_names.push(default.clone());
                        }
                    }
                    status
                })
                .collect()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use taskmgmt_core::validation::ConfigValidator;

    #[test]
    fn test_generated_graph_resolves() {
        let statuses = StatusGraphGenerator::new(8).generate();
        let names: HashSet<&str> = statuses.iter().map(|s| s.name.as_str()).collect();

        assert_eq!(statuses.len(), 8);
        ConfigValidator::validate_unique_status_names(&statuses).unwrap();
        for status in &statuses {
            assert!(status.referenced_names().all(|name| names.contains(name)));
        }
    }

    #[test]
    fn test_generated_names() {
        assert!(!generate_worktype_name().is_empty());
        assert!(generate_workbin_name().ends_with(" workbin"));
    }

    proptest! {
        #[test]
        fn prop_transition_times_validate(time in transition_time_strategy()) {
            prop_assert!(ConfigValidator::validate_transition_time(&time).is_ok());
        }

        #[test]
        fn prop_graph_strategy_resolves(statuses in status_graph_strategy(6)) {
            let names: HashSet<&str> = statuses.iter().map(|s| s.name.as_str()).collect();
            for status in &statuses {
                prop_assert!(status.referenced_names().all(|name| names.contains(name)));
            }
        }
    }
}
