//! Polling a live object until a jsonpath query matches

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{debug, info};
use valet_core::cmd::Kubectl;
use valet_core::wait::{self, PollConfig};
use valet_core::InputParams;
use valet_engine::{Bindings, Field};

use crate::error::{Result, WorkflowError};
use crate::resource::{bind, require};

/// Waits until a jsonpath query on a live object returns an expected value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Condition {
    #[serde(rename = "type")]
    pub kube_type: String,
    pub name: String,
    /// Falls back to the `Namespace` value
    pub namespace: String,
    pub jsonpath: String,
    pub value: String,
    /// `120s` when unset
    pub timeout: String,
    /// `5s` when unset
    pub interval: String,
}

impl Bindings for Condition {
    fn fields(&mut self) -> Vec<Field<'_>> {
        vec![
            Field::new("type", &mut self.kube_type).template(),
            Field::new("name", &mut self.name).template(),
            Field::new("namespace", &mut self.namespace)
                .key("Namespace")
                .template(),
            Field::new("jsonpath", &mut self.jsonpath),
            Field::new("value", &mut self.value).template(),
            Field::new("timeout", &mut self.timeout)
                .default("120s")
                .template(),
            Field::new("interval", &mut self.interval)
                .default("5s")
                .template(),
        ]
    }
}

impl Condition {
    /// Check now, then poll until the value matches or the timeout elapses
    pub async fn ensure(&self, input: &InputParams) -> Result<()> {
        let condition = bind(self, input).await?;
        require("condition", "type", &condition.kube_type)?;
        require("condition", "name", &condition.name)?;
        require("condition", "jsonpath", &condition.jsonpath)?;

        let poll = PollConfig::new(
            wait::parse_duration("interval", &condition.interval)?,
            wait::parse_duration("timeout", &condition.timeout)?,
        );
        let cmd = Kubectl::get(&condition.kube_type, &condition.name)
            .namespace(&condition.namespace)
            .jsonpath(&condition.jsonpath)
            .build();
        let target = format!(
            "{} {}/{} {}",
            condition.kube_type, condition.namespace, condition.name, condition.jsonpath
        );

        info!(target = %target, expected = %condition.value, "waiting for condition");
        let last = Mutex::new(String::new());
        let met = wait::poll_until(poll, &input.cancel, || {
            let cmd = &cmd;
            let last = &last;
            let expected = condition.value.as_str();
            async move {
                let actual = input.output(cmd).await?;
                let actual = actual.trim().to_string();
                debug!(actual = %actual, expected, "condition check");
                let matched = actual == expected;
                *last.lock().unwrap_or_else(|e| e.into_inner()) = actual;
                Ok(matched)
            }
        })
        .await?;

        if met {
            return Ok(());
        }
        Err(WorkflowError::ConditionNotMet {
            target,
            expected: condition.value,
            actual: last.into_inner().unwrap_or_else(|e| e.into_inner()),
            timeout: condition.timeout,
        })
    }
}
