//! Interception actions issued against threatening catalog objects.
//!
//! The manager only creates, lists and removes actions. Status changes after deployment
//! are asserted by an outside operator through the record store; the states mean:
//! - `deployed`: launched, no approach data yet
//! - `approaching`: closing on the target, distance and ETA are meaningful
//! - `intercept_successful` / `intercept_failed`: terminal outcomes

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::{info, warn};

use crate::{
    bodies::sim_object::{OrbitalObject, ReferenceSatellite},
    error::InterceptorError,
    output,
    store::{Record, RecordStore, SortKey},
    threat::ThreatLevel,
};

#[derive(Serialize, Deserialize, Display, EnumString, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InterceptorStatus {
    Deployed,
    Approaching,
    InterceptSuccessful,
    InterceptFailed,
}

impl InterceptorStatus {
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Deployed | Self::Approaching)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_cancellable()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InterceptorAction {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    pub target_object_id: String,
    pub target_name: String,
    pub deployment_time: DateTime<Utc>,
    pub status: InterceptorStatus,
    pub distance_to_target: f64,       // km
    pub estimated_intercept_time: f64, // min
}

impl Record for InterceptorAction {
    fn id(&self) -> &str {
        &self.id
    }

    fn assign_identity(&mut self, id: String, created_date: DateTime<Utc>) {
        self.id = id;
        self.created_date = Some(created_date);
    }
}

impl InterceptorAction {
    pub fn to_output_form(&self) -> output::InterceptorOut {
        output::InterceptorOut {
            id: self.id.clone(),
            target_object_id: self.target_object_id.clone(),
            target_name: self.target_name.clone(),
            status: self.status.to_string(),
            deployment_time: self.deployment_time.to_rfc3339(),
            distance_to_target: self.distance_to_target,
            estimated_intercept_time: self.estimated_intercept_time,
        }
    }
}

pub struct InterceptorManager {
    store: Arc<dyn RecordStore<InterceptorAction>>,
    reference: ReferenceSatellite,
}

impl InterceptorManager {
    pub fn new(store: Arc<dyn RecordStore<InterceptorAction>>, reference: ReferenceSatellite) -> Self {
        Self { store, reference }
    }

    /// Deploy an interceptor against a currently threatening object.
    ///
    /// ### Argument
    /// * 'target' - Object as seen in the latest tick, must carry a time to impact.
    ///
    /// ### Return
    ///     The created action in `deployed` state, or `InvalidTarget` when the object
    ///     has no active threat. Nothing is created on failure.
    ///
    pub async fn deploy(&self, target: &OrbitalObject) -> Result<InterceptorAction, InterceptorError> {
        let time_to_impact = match target.threat.time_to_impact {
            Some(hours) => hours,
            None => {
                warn!(target = %target.name, "rejected deploy against non-threatening object");
                return Err(InterceptorError::InvalidTarget {
                    name: target.name.clone(),
                });
            }
        };

        let action = InterceptorAction {
            id: String::new(),
            created_date: None,
            target_object_id: target.id.clone(),
            target_name: target.name.clone(),
            deployment_time: Utc::now(),
            status: InterceptorStatus::Deployed,
            distance_to_target: (target.state.altitude - self.reference.altitude).abs(),
            estimated_intercept_time: time_to_impact * 60.0,
        };
        let created = self.store.create(action).await?;
        info!(
            id = %created.id,
            target = %created.target_name,
            eta_min = created.estimated_intercept_time,
            "interceptor deployed"
        );

        Ok(created)
    }

    /// Remove an action that is still deployed or approaching.
    pub async fn cancel(&self, action_id: &str) -> Result<(), InterceptorError> {
        let action = self
            .list()
            .await?
            .into_iter()
            .find(|a| a.id == action_id)
            .ok_or_else(|| InterceptorError::UnknownAction(action_id.to_string()))?;

        if !action.status.is_cancellable() {
            warn!(id = %action_id, status = %action.status, "rejected cancel");
            return Err(InterceptorError::NotCancellable {
                id: action.id,
                status: action.status,
            });
        }

        self.store.delete(action_id).await?;
        info!(id = %action_id, target = %action.target_name, "interceptor cancelled");

        Ok(())
    }

    /// All actions, most recently created first.
    pub async fn list(&self) -> Result<Vec<InterceptorAction>, InterceptorError> {
        Ok(self.store.list(SortKey::newest_first(), None).await?)
    }

    /// Deploy against every critical threat that has no live action targeting it.
    ///
    /// ### Argument
    /// * 'threats' - Ranked active threats from the latest tick.
    ///
    /// ### Return
    ///     The actions created by this call.
    ///
    pub async fn engage_critical(
        &self,
        threats: &[OrbitalObject],
    ) -> Result<Vec<InterceptorAction>, InterceptorError> {
        let live = self.list().await?;
        let mut created = Vec::new();

        for target in threats
            .iter()
            .filter(|t| t.threat.level == ThreatLevel::Critical)
        {
            let engaged = live
                .iter()
                .chain(created.iter())
                .any(|a| a.target_object_id == target.id && a.status.is_cancellable());
            if !engaged {
                created.push(self.deploy(target).await?);
            }
        }

        Ok(created)
    }

    /// Cancel every live action whose target no longer poses a threat.
    ///
    /// ### Argument
    /// * 'objects' - All tracked objects from the latest tick.
    ///
    /// ### Return
    ///     Ids of the cancelled actions.
    ///
    pub async fn stand_down(&self, objects: &[OrbitalObject]) -> Result<Vec<String>, InterceptorError> {
        let mut cancelled = Vec::new();

        for action in self.list().await? {
            let threatening = objects
                .iter()
                .any(|o| o.id == action.target_object_id && o.is_threat());
            if action.status.is_cancellable() && !threatening {
                self.cancel(&action.id).await?;
                cancelled.push(action.id);
            }
        }

        Ok(cancelled)
    }
}
