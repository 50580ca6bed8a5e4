use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    api::FlowRuleApi,
    cache::ResourceCache,
    composite_id,
    error::Result,
    models::Named,
    paging::{collect_all, find_id_by_name, MAX_PAGE_SIZE},
    rules::{DateBased, FlowRuleKind, OnAttributeChange, OnCreate},
};

/// Flow rule access for one rule kind, cached by composite id
pub struct FlowRuleProxy<K: FlowRuleKind> {
    api: Arc<dyn FlowRuleApi<K>>,
    cache: ResourceCache<K::Rule>,
}

pub type DateBasedRuleProxy = FlowRuleProxy<DateBased>;
pub type OnAttributeChangeRuleProxy = FlowRuleProxy<OnAttributeChange>;
pub type OnCreateRuleProxy = FlowRuleProxy<OnCreate>;

impl<K: FlowRuleKind> Clone for FlowRuleProxy<K> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            cache: self.cache.clone(),
        }
    }
}

impl<K: FlowRuleKind> FlowRuleProxy<K> {
    pub fn new(api: Arc<dyn FlowRuleApi<K>>) -> Self {
        Self {
            api,
            cache: ResourceCache::new(),
        }
    }

    pub async fn create(&self, worktype_id: &str, rule: K::Create) -> Result<K::Rule> {
        let created = self.api.create_rule(worktype_id, rule).await?;
        info!(worktype_id, rule_id = created.id(), kind = K::DISPLAY, "Created flow rule");
        self.cache
            .insert(composite_id::compose(worktype_id, created.id()), created.clone());
        Ok(created)
    }

    pub async fn get_by_id(&self, worktype_id: &str, rule_id: &str) -> Result<K::Rule> {
        let key = composite_id::compose(worktype_id, rule_id);
        if let Some(cached) = self.cache.get(&key) {
            debug!(rule = %key, kind = K::DISPLAY, "Flow rule served from cache");
            return Ok(cached);
        }
        let rule = self.api.get_rule(worktype_id, rule_id).await?;
        self.cache.insert(key, rule.clone());
        Ok(rule)
    }

    /// Read straight from the API without touching the cache
    pub async fn fetch(&self, worktype_id: &str, rule_id: &str) -> Result<K::Rule> {
        self.api.get_rule(worktype_id, rule_id).await
    }

    /// Rule id (not composite) of the rule with this name
    pub async fn get_id_by_name(&self, worktype_id: &str, name: &str) -> Result<String> {
        let api = &self.api;
        find_id_by_name(K::DISPLAY, name, |after| async move {
            api.list_rules(worktype_id, after, MAX_PAGE_SIZE).await
        })
        .await
    }

    pub async fn get_all(&self, worktype_id: &str) -> Result<Vec<K::Rule>> {
        let api = &self.api;
        collect_all(|after| async move { api.list_rules(worktype_id, after, MAX_PAGE_SIZE).await }).await
    }

    pub async fn update(&self, worktype_id: &str, rule_id: &str, update: K::Update) -> Result<K::Rule> {
        let key = composite_id::compose(worktype_id, rule_id);
        self.cache.remove(&key);
        let updated = self.api.update_rule(worktype_id, rule_id, update).await?;
        info!(worktype_id, rule_id, kind = K::DISPLAY, "Updated flow rule");
        self.cache.insert(key, updated.clone());
        Ok(updated)
    }

    pub async fn delete(&self, worktype_id: &str, rule_id: &str) -> Result<()> {
        self.cache.remove(&composite_id::compose(worktype_id, rule_id));
        self.api.delete_rule(worktype_id, rule_id).await?;
        info!(worktype_id, rule_id, kind = K::DISPLAY, "Deleted flow rule");
        Ok(())
    }

    pub fn cache(&self) -> &ResourceCache<K::Rule> {
        &self.cache
    }
}
