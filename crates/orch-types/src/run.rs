use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Run status. Terminal set is `{Succeeded, Failed, Canceled}` — see
/// [`RunStatus::is_terminal`]. Allowed transitions (spec §3):
/// `Queued -> {Running, Canceled}`, `Running -> {Succeeded, Failed, Canceled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
            RunStatus::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(RunStatus::Queued),
            "running" => Some(RunStatus::Running),
            "succeeded" => Some(RunStatus::Succeeded),
            "failed" => Some(RunStatus::Failed),
            "canceled" => Some(RunStatus::Canceled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Succeeded | RunStatus::Failed | RunStatus::Canceled
        )
    }

    /// Whether `self -> next` is an allowed run transition (spec §3).
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        use RunStatus::*;
        matches!(
            (self, next),
            (Queued, Running) | (Queued, Canceled) | (Running, Succeeded) | (Running, Failed) | (Running, Canceled)
        )
    }
}

/// The fixed, ordered pipeline. A station of index `i` may only execute when
/// all stations `< i` are `Succeeded` (or `Skipped`) — spec §3 invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Station {
    Intake,
    Plan,
    Implement,
    Verify,
    CreatePr,
}

/// Fixed station order. Never reorder — `index()` and resume-index math
/// throughout `orch-engine` depend on this exact sequence.
pub const STATION_ORDER: [Station; 5] = [
    Station::Intake,
    Station::Plan,
    Station::Implement,
    Station::Verify,
    Station::CreatePr,
];

impl Station {
    pub fn as_str(&self) -> &'static str {
        match self {
            Station::Intake => "intake",
            Station::Plan => "plan",
            Station::Implement => "implement",
            Station::Verify => "verify",
            Station::CreatePr => "create_pr",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "intake" => Some(Station::Intake),
            "plan" => Some(Station::Plan),
            "implement" => Some(Station::Implement),
            "verify" => Some(Station::Verify),
            "create_pr" => Some(Station::CreatePr),
            _ => None,
        }
    }

    /// Zero-based index into [`STATION_ORDER`].
    pub fn index(&self) -> usize {
        STATION_ORDER
            .iter()
            .position(|s| s == self)
            .expect("Station variant missing from STATION_ORDER")
    }

    pub fn from_index(i: usize) -> Option<Station> {
        STATION_ORDER.get(i).copied()
    }

    pub fn next(&self) -> Option<Station> {
        Station::from_index(self.index() + 1)
    }

    pub fn is_terminal_station(&self) -> bool {
        matches!(self, Station::CreatePr)
    }

    /// Whether this station calls the Coderunner adapter (spec §4.3 step 6).
    pub fn uses_coderunner(&self) -> bool {
        matches!(self, Station::Implement | Station::Verify)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrMode {
    Draft,
    Ready,
}

impl PrMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrMode::Draft => "draft",
            PrMode::Ready => "ready",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PrMode::Draft),
            "ready" => Some(PrMode::Ready),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub repo_id: Uuid,
    pub issue_number: i64,
    pub goal: Option<String>,
    pub status: RunStatus,
    pub current_station: Option<Station>,
    pub requestor: String,
    pub base_branch: String,
    pub work_branch: Option<String>,
    pub pr_mode: PrMode,
    pub pr_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub heartbeat_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_order_is_fixed() {
        assert_eq!(Station::Intake.index(), 0);
        assert_eq!(Station::CreatePr.index(), 4);
        assert_eq!(Station::Plan.next(), Some(Station::Implement));
        assert_eq!(Station::CreatePr.next(), None);
    }

    #[test]
    fn run_status_terminal_set() {
        assert!(RunStatus::Succeeded.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Canceled.is_terminal());
        assert!(!RunStatus::Queued.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
    }

    #[test]
    fn run_status_transitions() {
        assert!(RunStatus::Queued.can_transition_to(RunStatus::Running));
        assert!(RunStatus::Queued.can_transition_to(RunStatus::Canceled));
        assert!(!RunStatus::Queued.can_transition_to(RunStatus::Succeeded));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Succeeded));
        assert!(!RunStatus::Succeeded.can_transition_to(RunStatus::Running));
    }
}
