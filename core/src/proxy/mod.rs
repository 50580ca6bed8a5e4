//! Proxies over the capability traits.
//!
//! A proxy owns its API handle explicitly; there is no process-wide
//! instance. Build one [`TaskManagementProxies`] per client and pass it (or
//! the single proxy a resource needs) to the resource functions.

pub mod flow_rule;
pub mod workbin;
pub mod worktype;

use std::sync::Arc;

use crate::api::TaskManagementApi;

pub use flow_rule::{DateBasedRuleProxy, FlowRuleProxy, OnAttributeChangeRuleProxy, OnCreateRuleProxy};
pub use workbin::WorkbinProxy;
pub use worktype::WorktypeProxy;

/// Every proxy, sharing one API implementation
#[derive(Clone)]
pub struct TaskManagementProxies {
    pub workbins: WorkbinProxy,
    pub worktypes: WorktypeProxy,
    pub date_based_rules: DateBasedRuleProxy,
    pub attribute_change_rules: OnAttributeChangeRuleProxy,
    pub on_create_rules: OnCreateRuleProxy,
}

impl TaskManagementProxies {
    pub fn new<A>(api: Arc<A>) -> Self
    where
        A: TaskManagementApi + 'static,
    {
        Self {
            workbins: WorkbinProxy::new(api.clone()),
            worktypes: WorktypeProxy::new(api.clone(), api.clone()),
            date_based_rules: DateBasedRuleProxy::new(api.clone()),
            attribute_change_rules: OnAttributeChangeRuleProxy::new(api.clone()),
            on_create_rules: OnCreateRuleProxy::new(api),
        }
    }
}
