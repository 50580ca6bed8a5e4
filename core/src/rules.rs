//! Worktype flow rules.
//!
//! The three rule kinds share one lifecycle (create, list, get, patch,
//! delete under `/worktypes/{id}/flows/{kind}/rules`) and differ only in
//! their trigger condition. [`FlowRuleKind`] captures that difference so the
//! proxy, the CRUD functions and the fake API are written once.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskMgmtError};
use crate::models::{EntityRef, Named};

/// Marker trait tying a rule kind to its wire shapes.
pub trait FlowRuleKind: Debug + Clone + PartialEq + Send + Sync + 'static {
    type Rule: Named + Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync;
    type Create: Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync;
    type Update: Clone + Debug + PartialEq + Default + Serialize + DeserializeOwned + Send + Sync;

    /// Path segment under `/worktypes/{id}/flows/`
    const PATH_SEGMENT: &'static str;
    /// Resource type name used in diagnostics and export
    const RESOURCE_TYPE: &'static str;
    /// Human-readable name used in log lines
    const DISPLAY: &'static str;

    fn create_name(create: &Self::Create) -> &str;

    /// Full replacement patch built from a desired rule
    fn update_from(create: &Self::Create) -> Self::Update;

    /// Desired shape of a rule the API returned
    fn create_from(rule: &Self::Rule) -> Self::Create;

    /// Worktype the rule belongs to, as embedded by the API
    fn worktype_of(rule: &Self::Rule) -> Option<&str>;

    fn validate(create: &Self::Create) -> Result<()> {
        if Self::create_name(create).trim().is_empty() {
            return Err(TaskMgmtError::empty_field("name"));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Date based
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DateBasedCondition {
    pub attribute: String,
    pub relative_minutes_to_invocation: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DateBasedRule {
    pub id: String,
    pub name: String,
    pub condition: DateBasedCondition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktype: Option<EntityRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DateBasedRuleCreate {
    pub name: String,
    pub condition: DateBasedCondition,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DateBasedRuleUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<DateBasedCondition>,
}

/// Rules that fire relative to a date attribute of the workitem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBased {}

impl FlowRuleKind for DateBased {
    type Rule = DateBasedRule;
    type Create = DateBasedRuleCreate;
    type Update = DateBasedRuleUpdate;

    const PATH_SEGMENT: &'static str = "datebased";
    const RESOURCE_TYPE: &'static str = "genesyscloud_task_management_worktype_flow_datebased_rule";
    const DISPLAY: &'static str = "date based rule";

    fn create_name(create: &Self::Create) -> &str {
        &create.name
    }

    fn update_from(create: &Self::Create) -> Self::Update {
        DateBasedRuleUpdate {
            name: Some(create.name.clone()),
            condition: Some(create.condition.clone()),
        }
    }

    fn create_from(rule: &Self::Rule) -> Self::Create {
        DateBasedRuleCreate {
            name: rule.name.clone(),
            condition: rule.condition.clone(),
        }
    }

    fn worktype_of(rule: &Self::Rule) -> Option<&str> {
        rule.worktype.as_ref().map(|w| w.id.as_str())
    }

    fn validate(create: &Self::Create) -> Result<()> {
        if create.name.trim().is_empty() {
            return Err(TaskMgmtError::empty_field("name"));
        }
        if create.condition.attribute.trim().is_empty() {
            return Err(TaskMgmtError::empty_field("condition.attribute"));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// On attribute change
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttributeChangeCondition {
    pub attribute: String,
    pub new_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OnAttributeChangeRule {
    pub id: String,
    pub name: String,
    pub condition: AttributeChangeCondition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktype: Option<EntityRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OnAttributeChangeRuleCreate {
    pub name: String,
    pub condition: AttributeChangeCondition,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OnAttributeChangeRuleUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<AttributeChangeCondition>,
}

/// Rules that fire when a workitem attribute changes value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnAttributeChange {}

impl FlowRuleKind for OnAttributeChange {
    type Rule = OnAttributeChangeRule;
    type Create = OnAttributeChangeRuleCreate;
    type Update = OnAttributeChangeRuleUpdate;

    const PATH_SEGMENT: &'static str = "onattributechange";
    const RESOURCE_TYPE: &'static str = "genesyscloud_task_management_worktype_flow_onattributechange_rule";
    const DISPLAY: &'static str = "on attribute change rule";

    fn create_name(create: &Self::Create) -> &str {
        &create.name
    }

    fn update_from(create: &Self::Create) -> Self::Update {
        OnAttributeChangeRuleUpdate {
            name: Some(create.name.clone()),
            condition: Some(create.condition.clone()),
        }
    }

    fn create_from(rule: &Self::Rule) -> Self::Create {
        OnAttributeChangeRuleCreate {
            name: rule.name.clone(),
            condition: rule.condition.clone(),
        }
    }

    fn worktype_of(rule: &Self::Rule) -> Option<&str> {
        rule.worktype.as_ref().map(|w| w.id.as_str())
    }

    fn validate(create: &Self::Create) -> Result<()> {
        if create.name.trim().is_empty() {
            return Err(TaskMgmtError::empty_field("name"));
        }
        if create.condition.attribute.trim().is_empty() {
            return Err(TaskMgmtError::empty_field("condition.attribute"));
        }
        if create.condition.new_value.is_empty() {
            return Err(TaskMgmtError::empty_field("condition.new_value"));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// On create
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OnCreateRule {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktype: Option<EntityRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OnCreateRuleCreate {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OnCreateRuleUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Rules that fire once when a workitem of the worktype is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnCreate {}

impl FlowRuleKind for OnCreate {
    type Rule = OnCreateRule;
    type Create = OnCreateRuleCreate;
    type Update = OnCreateRuleUpdate;

    const PATH_SEGMENT: &'static str = "oncreate";
    const RESOURCE_TYPE: &'static str = "genesyscloud_task_management_worktype_flow_oncreate_rule";
    const DISPLAY: &'static str = "on create rule";

    fn create_name(create: &Self::Create) -> &str {
        &create.name
    }

    fn update_from(create: &Self::Create) -> Self::Update {
        OnCreateRuleUpdate {
            name: Some(create.name.clone()),
        }
    }

    fn create_from(rule: &Self::Rule) -> Self::Create {
        OnCreateRuleCreate {
            name: rule.name.clone(),
        }
    }

    fn worktype_of(rule: &Self::Rule) -> Option<&str> {
        rule.worktype.as_ref().map(|w| w.id.as_str())
    }
}

macro_rules! impl_named {
    ($($ty:ty),*) => {
        $(impl Named for $ty {
            fn id(&self) -> &str {
                &self.id
            }
            fn name(&self) -> &str {
                &self.name
            }
        })*
    };
}

impl_named!(DateBasedRule, OnAttributeChangeRule, OnCreateRule);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_date_based_rule_wire_shape() {
        let rule: DateBasedRule = serde_json::from_value(json!({
            "id": "r-1",
            "name": "Remind before due",
            "condition": {"attribute": "dateDue", "relativeMinutesToInvocation": -30},
            "worktype": {"id": "wt-1"},
            "selfUri": "/api/v2/taskmanagement/worktypes/wt-1/flows/datebased/rules/r-1"
        }))
        .unwrap();

        assert_eq!(DateBased::worktype_of(&rule), Some("wt-1"));
        let create = DateBased::create_from(&rule);
        assert_eq!(
            serde_json::to_value(&create).unwrap(),
            json!({
                "name": "Remind before due",
                "condition": {"attribute": "dateDue", "relativeMinutesToInvocation": -30}
            })
        );
    }

    #[test]
    fn test_attribute_change_omits_missing_old_value() {
        let create = OnAttributeChangeRuleCreate {
            name: "Escalate".to_string(),
            condition: AttributeChangeCondition {
                attribute: "statusId".to_string(),
                new_value: "st-2".to_string(),
                old_value: None,
            },
        };
        let update = OnAttributeChange::update_from(&create);
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({
                "name": "Escalate",
                "condition": {"attribute": "statusId", "newValue": "st-2"}
            })
        );
    }

    #[test]
    fn test_rule_validation() {
        let create = OnCreateRuleCreate {
            name: "  ".to_string(),
        };
        assert!(OnCreate::validate(&create).unwrap_err().is_validation());

        let create = DateBasedRuleCreate {
            name: "Due soon".to_string(),
            condition: DateBasedCondition {
                attribute: String::new(),
                relative_minutes_to_invocation: 10,
            },
        };
        assert!(DateBased::validate(&create).is_err());

        let create = OnAttributeChangeRuleCreate {
            name: "Changed".to_string(),
            condition: AttributeChangeCondition {
                attribute: "statusId".to_string(),
                new_value: "st-1".to_string(),
                old_value: Some("st-0".to_string()),
            },
        };
        assert!(OnAttributeChange::validate(&create).is_ok());
    }

    #[test]
    fn test_path_segments_are_distinct() {
        let segments = [
            DateBased::PATH_SEGMENT,
            OnAttributeChange::PATH_SEGMENT,
            OnCreate::PATH_SEGMENT,
        ];
        assert_eq!(segments, ["datebased", "onattributechange", "oncreate"]);
    }
}
