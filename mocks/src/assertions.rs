//! Custom assertion helpers for testing
//!
//! Provides specialized assertions for:
//! - Status graphs as the server holds them, checked by name
//! - Read-back state compared with desired configuration
//! - Diagnostics content

use std::collections::BTreeSet;

use taskmgmt_core::{
    diagnostics::{Diagnostics, Severity},
    models::WorkitemStatus,
    resources::{StatusConfig, WorktypeConfig},
    status_graph::{ReconcileReport, StatusPhase},
};

fn name_of<'a>(statuses: &'a [WorkitemStatus], id: &str) -> &'a str {
    statuses
        .iter()
        .find(|s| s.id == id)
        .map(|s| s.name.as_str())
        .unwrap_or_else(|| panic!("status id {id} does not belong to this worktype"))
}

/// Assert a status links to the given destinations and default, by name
pub fn assert_status_links(
    statuses: &[WorkitemStatus],
    name: &str,
    destinations: &[&str],
    default: Option<&str>,
) {
    let status = statuses
        .iter()
        .find(|s| s.name == name)
        .unwrap_or_else(|| panic!("status '{name}' not found among {:?}", names(statuses)));

    let actual: BTreeSet<&str> = status
        .destination_ids()
        .into_iter()
        .map(|id| name_of(statuses, id))
        .collect();
    let expected: BTreeSet<&str> = destinations.iter().copied().collect();
    assert_eq!(actual, expected, "destinations of status '{name}' don't match");

    let actual_default = status.default_destination_id().map(|id| name_of(statuses, id));
    assert_eq!(actual_default, default, "default destination of status '{name}' doesn't match");
}

/// Assert the server-side graph matches every reference in `desired`
pub fn assert_graph_matches(statuses: &[WorkitemStatus], desired: &[StatusConfig]) {
    for config in desired {
        let destinations: Vec<&str> = config.destination_status_names.iter().map(String::as_str).collect();
        assert_status_links(statuses, &config.name, &destinations, config.default_destination());
    }
}

/// Assert every desired status reached the linked phase
pub fn assert_all_linked(report: &ReconcileReport) {
    let pending: Vec<&String> = report
        .phases
        .iter()
        .filter(|(_, phase)| **phase != StatusPhase::Linked)
        .map(|(name, _)| name)
        .collect();
    assert!(pending.is_empty(), "statuses not linked: {pending:?}");
}

/// Assert read-back configuration equals the desired one, ignoring the
/// order of statuses and destinations
pub fn assert_config_equivalent(actual: &WorktypeConfig, expected: &WorktypeConfig) {
    let normalize = |config: &WorktypeConfig| {
        let mut config = config.clone();
        config.statuses.sort_by(|a, b| a.name.cmp(&b.name));
        for status in &mut config.statuses {
            status.destination_status_names.sort();
        }
        config
    };
    assert_eq!(normalize(actual), normalize(expected), "worktype configurations differ");
}

/// Assert some diagnostic of the given severity mentions `text`
pub fn assert_diagnostic_contains(diagnostics: &Diagnostics, severity: Severity, text: &str) {
    assert!(
        diagnostics
            .iter()
            .any(|d| d.severity == severity && (d.summary.contains(text) || d.detail.contains(text))),
        "no {severity:?} diagnostic mentions '{text}': {diagnostics}"
    );
}

/// Assert statuses appear in the given order
pub fn assert_status_names(statuses: &[WorkitemStatus], expected: &[&str]) {
    assert_eq!(names(statuses), expected, "status names don't match");
}

fn names(statuses: &[WorkitemStatus]) -> Vec<&str> {
    statuses.iter().map(|s| s.name.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WorkitemStatusBuilder;

    #[test]
    fn test_status_links_by_name() {
        let statuses = vec![
            WorkitemStatusBuilder::new("st-1", "Approved").to("st-2").defaulting_to("st-2").build(),
            WorkitemStatusBuilder::new("st-2", "Rejected").to("st-1").build(),
        ];

        assert_status_links(&statuses, "Approved", &["Rejected"], Some("Rejected"));
        assert_status_links(&statuses, "Rejected", &["Approved"], None);
        assert_status_names(&statuses, &["Approved", "Rejected"]);
    }

    #[test]
    #[should_panic(expected = "destinations of status 'Rejected'")]
    fn test_status_links_mismatch_panics() {
        let statuses = vec![
            WorkitemStatusBuilder::new("st-1", "Approved").build(),
            WorkitemStatusBuilder::new("st-2", "Rejected").to("st-1").build(),
        ];
        assert_status_links(&statuses, "Rejected", &[], None);
    }
}
