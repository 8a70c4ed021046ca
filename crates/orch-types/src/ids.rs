//! Deterministic entity ids. These are identities, not random keys: the same
//! `(runId, station)` or `(runId, artifactType)` pair always produces the
//! same id, which is what makes upsert-based resume safe (spec §3).

use uuid::Uuid;

use crate::artifact::ArtifactType;
use crate::run::Station;

pub fn station_execution_id(run_id: Uuid, station: Station) -> String {
    format!("station_{run_id}_{}", station.as_str())
}

pub fn artifact_id(run_id: Uuid, kind: ArtifactType) -> String {
    format!("artifact_{run_id}_{}", kind.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_deterministic() {
        let run_id = Uuid::nil();
        assert_eq!(
            station_execution_id(run_id, Station::Intake),
            station_execution_id(run_id, Station::Intake)
        );
        assert_eq!(
            station_execution_id(run_id, Station::Intake),
            format!("station_{run_id}_intake")
        );
        assert_eq!(
            artifact_id(run_id, ArtifactType::WorkflowSummary),
            format!("artifact_{run_id}_workflow_summary")
        );
    }

    #[test]
    fn ids_vary_by_station_or_type() {
        let run_id = Uuid::nil();
        assert_ne!(
            station_execution_id(run_id, Station::Intake),
            station_execution_id(run_id, Station::Plan)
        );
    }
}
