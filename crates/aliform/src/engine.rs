//! Plan and apply declarations against a provider
//!
//! Blocks are handled one at a time in declaration order. A `${...}`
//! reference is looked up in state when its block is reached, so a block
//! can only refer to blocks declared before it.

use aliform_cloud::{
    Action, ActionType, ApplyResult, CloudError, CloudProvider, DataSource, GlobalState, Plan,
    Resource, ResourceData, ResourceState, StateManager, diff,
};
use aliform_core::{Infra, Unresolved};
use anyhow::{Context, bail};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

const DATA_PREFIX: &str = "data.";

#[derive(Debug, Clone, Copy)]
enum Step {
    Delete,
    /// First half of a replace
    Teardown,
    Forward,
}

fn is_data(address: &str) -> bool {
    address.starts_with(DATA_PREFIX)
}

pub struct Engine<'a> {
    provider: &'a dyn CloudProvider,
    infra: &'a Infra,
}

impl<'a> Engine<'a> {
    pub fn new(provider: &'a dyn CloudProvider, infra: &'a Infra) -> Self {
        Self { provider, infra }
    }

    fn resource_for(&self, type_name: &str) -> anyhow::Result<Arc<dyn Resource>> {
        self.provider
            .resource(type_name)
            .ok_or_else(|| CloudError::UnsupportedResource(type_name.to_string()).into())
    }

    fn data_source_for(&self, type_name: &str) -> anyhow::Result<Arc<dyn DataSource>> {
        self.provider
            .data_source(type_name)
            .ok_or_else(|| {
                CloudError::UnsupportedResource(format!("data source {}", type_name)).into()
            })
    }

    /// Every problem with the declarations, without calling the cloud
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for block in &self.infra.resources {
            let address = block.address();
            if block.provider_name() != self.provider.name() {
                errors.push(format!("{}: no provider named {:?}", address, block.provider_name()));
                continue;
            }
            match self.provider.resource(&block.resource_type) {
                Some(resource) => errors.extend(
                    resource
                        .schema()
                        .validate(&block.config)
                        .into_iter()
                        .map(|e| format!("{}: {}", address, e)),
                ),
                None => errors.push(format!(
                    "{}: unsupported resource type {:?}",
                    address, block.resource_type
                )),
            }
            errors.extend(self.check_references(&address, &block.config));
        }

        for block in &self.infra.data {
            let address = block.address();
            match self.provider.data_source(&block.data_type) {
                Some(data_source) => errors.extend(
                    data_source
                        .schema()
                        .validate(&block.config)
                        .into_iter()
                        .map(|e| format!("{}: {}", address, e)),
                ),
                None => errors.push(format!(
                    "{}: unsupported data source {:?}",
                    address, block.data_type
                )),
            }
            errors.extend(self.check_references(&address, &block.config));
        }

        errors
    }

    fn check_references(&self, address: &str, config: &Map<String, Value>) -> Vec<String> {
        let referenced = match aliform_core::references(config) {
            Ok(referenced) => referenced,
            Err(e) => return vec![format!("{}: {}", address, e)],
        };
        let position = |a: &str| self.infra.order.iter().position(|o| o == a);

        referenced
            .into_iter()
            .filter_map(|target| match (position(&target), position(address)) {
                (None, _) => Some(format!("{}: refers to undeclared {}", address, target)),
                (Some(t), Some(a)) if t >= a => Some(format!(
                    "{}: refers to {}, which must be declared before it",
                    address, target
                )),
                _ => None,
            })
            .collect()
    }

    /// Re-read every managed resource; returns the addresses that disappeared
    pub async fn refresh(&self, state: &mut GlobalState) -> anyhow::Result<Vec<String>> {
        let addresses: Vec<String> = state
            .resources
            .keys()
            .filter(|a| !is_data(a))
            .cloned()
            .collect();

        let mut dropped = Vec::new();
        for address in addresses {
            let Some(prior) = state.get_resource(&address).cloned() else {
                continue;
            };
            let resource = self.resource_for(&prior.resource_type)?;
            let mut d = ResourceData::from_state(&prior.id, prior.attributes.clone());
            resource
                .read(&mut d)
                .await
                .with_context(|| format!("refreshing {}", address))?;

            if d.is_gone() {
                tracing::info!(%address, id = %prior.id, "Resource no longer exists");
                state.remove_resource(&address);
                dropped.push(address);
            } else {
                let mut next = prior;
                next.refresh(d.id(), d.state_attributes());
                state.set_resource(address, next);
            }
        }
        Ok(dropped)
    }

    /// Actions that bring the cloud in line with the declarations
    ///
    /// A reference to a block planned for create or replace is unknown until
    /// apply, so anything depending on it is diffed against a placeholder.
    /// One planned for update is seen with its new values.
    pub fn plan(&self, state: &GlobalState) -> anyhow::Result<Plan> {
        // None: known only after apply
        let mut planned: HashMap<&str, Option<Map<String, Value>>> = HashMap::new();
        let mut actions = Vec::new();

        for address in &self.infra.order {
            let lookup = |target: &str, attribute: &str| match planned.get(target) {
                Some(None) => None,
                Some(Some(desired)) if attribute != "id" && desired.contains_key(attribute) => {
                    desired.get(attribute).cloned()
                }
                _ => state.lookup(target, attribute),
            };

            if let Some(block) = self.infra.resource(address) {
                let resource = self.resource_for(&block.resource_type)?;
                let desired =
                    aliform_core::resolve(&block.config, lookup, Unresolved::Placeholder)?;
                let prior = state.get_resource(address);
                let (action_type, changes) =
                    diff(&resource.schema(), &desired, prior.map(|p| &p.attributes));

                let mut action = Action::new(address, &block.resource_type, action_type)
                    .with_changes(changes);
                if let Some(prior) = prior {
                    action = action.with_resource_id(&prior.id);
                }
                actions.push(action);

                match action_type {
                    ActionType::Create | ActionType::Replace => {
                        planned.insert(address, None);
                    }
                    ActionType::Update => {
                        planned.insert(address, Some(desired));
                    }
                    _ => {}
                }
            } else if let Some(block) = self.infra.data_source(address) {
                actions.push(Action::new(address, &block.data_type, ActionType::Read));

                let waits_on_apply = aliform_core::references(&block.config)?
                    .iter()
                    .any(|target| matches!(planned.get(target.as_str()), Some(None)));
                if waits_on_apply {
                    planned.insert(address, None);
                }
            }
        }

        for (address, prior) in state.resources.iter().rev() {
            if is_data(address) || self.infra.is_declared(address) {
                continue;
            }
            actions.push(
                Action::new(address, &prior.resource_type, ActionType::Delete)
                    .with_resource_id(&prior.id),
            );
        }

        Ok(Plan::new(actions))
    }

    /// Delete actions for `target`, or for everything in reverse declaration order
    pub fn destroy_plan(&self, state: &GlobalState, target: Option<&str>) -> anyhow::Result<Plan> {
        let addresses: Vec<String> = match target {
            Some(address) if is_data(address) => {
                bail!("{} is a data source; there is nothing to destroy", address)
            }
            Some(address) => {
                if state.get_resource(address).is_none() {
                    bail!("{} is not in state", address);
                }
                vec![address.to_string()]
            }
            None => {
                let mut ordered: Vec<String> = self
                    .infra
                    .order
                    .iter()
                    .rev()
                    .filter(|a| !is_data(a) && state.get_resource(a).is_some())
                    .cloned()
                    .collect();
                for address in state.resources.keys().rev() {
                    if !is_data(address) && !ordered.contains(address) {
                        ordered.push(address.clone());
                    }
                }
                ordered
            }
        };

        let actions = addresses
            .iter()
            .filter_map(|address| {
                state.get_resource(address).map(|prior| {
                    Action::new(address, &prior.resource_type, ActionType::Delete)
                        .with_resource_id(&prior.id)
                })
            })
            .collect();
        Ok(Plan::new(actions))
    }

    /// Execute `plan`, saving state after every step
    ///
    /// Deletes run first: undeclared resources, then the old objects of
    /// replaced resources in reverse declaration order, so a dependent is
    /// gone before what it depends on. Creates, updates and reads follow in
    /// declaration order. Stops at the first failure: later blocks may
    /// depend on the failed one.
    pub async fn apply(
        &self,
        plan: &Plan,
        state: &mut GlobalState,
        manager: &StateManager,
    ) -> ApplyResult {
        let started = Instant::now();
        let mut result = ApplyResult::new();

        let deletes = plan
            .actions
            .iter()
            .filter(|a| a.action_type == ActionType::Delete)
            .map(|a| (Step::Delete, a));
        let teardowns = plan
            .actions
            .iter()
            .rev()
            .filter(|a| a.action_type == ActionType::Replace)
            .map(|a| (Step::Teardown, a));
        let forward = plan
            .actions
            .iter()
            .filter(|a| !matches!(a.action_type, ActionType::Delete | ActionType::NoOp))
            .map(|a| (Step::Forward, a));

        for (step, action) in deletes.chain(teardowns).chain(forward) {
            let outcome = match (step, action.action_type) {
                (Step::Teardown, _) => self.delete(action, state).await.map(|_| None),
                (_, ActionType::Delete) => self.delete(action, state).await.map(Some),
                (_, ActionType::Read) => {
                    self.read_data_into(&action.address, state).await.map(Some)
                }
                (_, ActionType::Create | ActionType::Replace) => {
                    self.create(&action.address, state).await.map(Some)
                }
                (_, ActionType::Update) => self.update(&action.address, state).await.map(Some),
                (_, ActionType::NoOp) => continue,
            };

            let saved = manager.save(state).await;
            match (outcome, saved) {
                (Ok(None), Ok(())) => {
                    tracing::info!(address = %action.address, "Destroyed for replacement");
                }
                (Ok(Some(message)), Ok(())) => {
                    tracing::info!(address = %action.address, "{}", message);
                    result.add_success(action.address.clone(), message);
                }
                (Err(e), _) => {
                    result.add_failure(action.address.clone(), format!("{:#}", e));
                    break;
                }
                (Ok(_), Err(e)) => {
                    result.add_failure(action.address.clone(), format!("saving state: {}", e));
                    break;
                }
            }
        }

        result.duration_ms = started.elapsed().as_millis() as u64;
        result
    }

    fn resolve_for_apply(
        &self,
        address: &str,
        config: &Map<String, Value>,
        state: &GlobalState,
    ) -> anyhow::Result<Map<String, Value>> {
        let lookup = |a: &str, attribute: &str| state.lookup(a, attribute);
        let desired = aliform_core::resolve(config, lookup, Unresolved::Error)
            .with_context(|| format!("resolving references of {}", address))?;
        Ok(desired)
    }

    async fn create(&self, address: &str, state: &mut GlobalState) -> anyhow::Result<String> {
        let block = self
            .infra
            .resource(address)
            .with_context(|| format!("{} is not declared", address))?;
        let resource = self.resource_for(&block.resource_type)?;
        let desired = self.resolve_for_apply(address, &block.config, state)?;

        let errors = resource.schema().validate(&desired);
        if !errors.is_empty() {
            bail!("{}: {}", address, errors.join("; "));
        }

        let mut d = ResourceData::from_config(desired);
        let created = resource.create(&mut d).await;

        // A create can fail after the object exists (e.g. while waiting); keep tracking it
        if !d.is_gone() {
            state.set_resource(
                address.to_string(),
                ResourceState::new(d.id(), &block.resource_type)
                    .with_attributes(d.state_attributes()),
            );
        }
        created.with_context(|| format!("creating {}", address))?;

        Ok(format!("created ({})", d.id()))
    }

    async fn update(&self, address: &str, state: &mut GlobalState) -> anyhow::Result<String> {
        let block = self
            .infra
            .resource(address)
            .with_context(|| format!("{} is not declared", address))?;
        let prior = state
            .get_resource(address)
            .cloned()
            .with_context(|| format!("{} is not in state", address))?;
        let resource = self.resource_for(&block.resource_type)?;
        let desired = self.resolve_for_apply(address, &block.config, state)?;

        let mut d =
            ResourceData::from_state(&prior.id, prior.attributes.clone()).with_config(desired);
        resource
            .update(&mut d)
            .await
            .with_context(|| format!("updating {}", address))?;

        if d.is_gone() {
            state.remove_resource(address);
            bail!("{} disappeared during update", address);
        }
        let mut next = prior;
        next.refresh(d.id(), d.state_attributes());
        state.set_resource(address.to_string(), next);

        Ok(format!("updated ({})", d.id()))
    }

    async fn delete(&self, action: &Action, state: &mut GlobalState) -> anyhow::Result<String> {
        let prior = state
            .get_resource(&action.address)
            .cloned()
            .with_context(|| format!("{} is not in state", action.address))?;
        let resource = self.resource_for(&prior.resource_type)?;

        let mut d = ResourceData::from_state(&prior.id, prior.attributes);
        resource
            .delete(&mut d)
            .await
            .with_context(|| format!("destroying {}", action.address))?;
        state.remove_resource(&action.address);

        Ok(format!("destroyed ({})", prior.id))
    }

    async fn read_data_into(
        &self,
        address: &str,
        state: &mut GlobalState,
    ) -> anyhow::Result<String> {
        let (data_type, attributes, id) = self.read_data(address, state).await?;
        state.set_resource(
            address.to_string(),
            ResourceState::new(&id, data_type).with_attributes(attributes),
        );
        Ok(format!("read ({})", id))
    }

    /// Read a declared data source; returns its type, attributes and id
    pub async fn read_data(
        &self,
        address: &str,
        state: &GlobalState,
    ) -> anyhow::Result<(String, Map<String, Value>, String)> {
        let block = self
            .infra
            .data_source(address)
            .with_context(|| format!("{} is not declared", address))?;
        let data_source = self.data_source_for(&block.data_type)?;
        let desired = self.resolve_for_apply(address, &block.config, state)?;

        let errors = data_source.schema().validate(&desired);
        if !errors.is_empty() {
            bail!("{}: {}", address, errors.join("; "));
        }

        let mut d = ResourceData::from_config(desired);
        data_source
            .read(&mut d)
            .await
            .with_context(|| format!("reading {}", address))?;
        Ok((block.data_type.clone(), d.state_attributes(), d.id().to_string()))
    }

    /// Drop stored results of data sources that are no longer declared
    pub fn prune_data(&self, state: &mut GlobalState) {
        state
            .resources
            .retain(|address, _| !is_data(address) || self.infra.is_declared(address));
    }

    /// Adopt an existing remote object under `address`
    pub async fn import(
        &self,
        address: &str,
        id: &str,
        state: &mut GlobalState,
    ) -> anyhow::Result<ResourceState> {
        if let Some(existing) = state.get_resource(address) {
            bail!("{} is already managed (id {})", address, existing.id);
        }
        let resource_type = match self.infra.resource(address) {
            Some(block) => block.resource_type.clone(),
            None => {
                tracing::warn!(
                    %address,
                    "Importing a resource that is not declared; the next plan will destroy it"
                );
                match address.split_once('.') {
                    Some((type_name, name)) if !is_data(address) && !name.is_empty() => {
                        type_name.to_string()
                    }
                    _ => bail!("{} is not a resource address (expected type.name)", address),
                }
            }
        };
        let resource = self.resource_for(&resource_type)?;

        let d = resource
            .import(id)
            .await
            .with_context(|| format!("importing {}", address))?;
        if d.is_gone() {
            bail!("{} {} does not exist", resource_type, id);
        }

        let imported =
            ResourceState::new(d.id(), &resource_type).with_attributes(d.state_attributes());
        state.set_resource(address.to_string(), imported.clone());
        Ok(imported)
    }
}
