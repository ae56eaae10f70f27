use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::history::{DeltaAnchor, HistoryPoint};
use crate::nominal::NominalCycle;
use crate::profile::ModelProfile;
use crate::snapshot::MachineSnapshot;

/// Resident fleet state. The caller owns it and passes it into every
/// operation; writers (`record_snapshot`, profile rebuilds) need `&mut`,
/// queries only `&`, so synchronisation is left to whoever holds it.
#[derive(Debug, Default, Clone)]
pub struct FleetStore {
    pub(crate) latest: HashMap<String, MachineSnapshot>,
    pub(crate) history: HashMap<String, Vec<HistoryPoint>>,
    pub(crate) anchors: HashMap<String, DeltaAnchor>,
    pub(crate) profiles: HashMap<String, Arc<ModelProfile>>,
    pub(crate) nominal: HashMap<String, NominalCycle>,
    pub(crate) batches: Vec<String>,
}

impl FleetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops everything derived from snapshots ahead of a full re-ingestion.
    /// The nominal cycle table is configuration and survives.
    pub fn reset(&mut self) {
        self.latest.clear();
        self.history.clear();
        self.anchors.clear();
        self.profiles.clear();
        self.batches.clear();
    }

    pub fn snapshot(&self, unit_id: &str) -> Option<&MachineSnapshot> {
        self.latest.get(unit_id)
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &MachineSnapshot> {
        self.latest.values()
    }

    pub fn history(&self, unit_id: &str) -> &[HistoryPoint] {
        self.history.get(unit_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn history_point_count(&self) -> usize {
        self.history.values().map(Vec::len).sum()
    }

    pub fn profile(&self, model_id: &str) -> Option<Arc<ModelProfile>> {
        self.profiles.get(model_id).cloned()
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    pub(crate) fn install_profile(&mut self, profile: ModelProfile) -> Arc<ModelProfile> {
        let profile = Arc::new(profile);
        self.profiles
            .insert(profile.model_id.clone(), Arc::clone(&profile));
        profile
    }

    pub fn model_of(&self, unit_id: &str) -> Option<&str> {
        self.latest.get(unit_id).map(|s| s.model_id.as_str())
    }

    pub fn unit_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.latest.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Units whose latest snapshot carries `model_id`, in id order.
    pub fn units_of_model(&self, model_id: &str) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .latest
            .values()
            .filter(|s| s.model_id == model_id)
            .map(|s| s.unit_id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn model_ids(&self) -> Vec<&str> {
        self.latest
            .values()
            .map(|s| s.model_id.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn set_nominal_cycles(&mut self, cycles: impl IntoIterator<Item = NominalCycle>) {
        self.nominal.clear();
        for cycle in cycles {
            if cycle.model_id.trim().is_empty() {
                continue;
            }
            self.nominal.insert(cycle.model_id.clone(), cycle);
        }
    }

    pub fn nominal_cycle(&self, model_id: &str) -> Option<&NominalCycle> {
        self.nominal.get(model_id)
    }

    pub fn batches(&self) -> &[String] {
        &self.batches
    }
}
