use chrono::{DateTime, Utc};
use std::fmt;

/// What started a workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerKind {
    /// Fired by the cron schedule for the given minute.
    Schedule { scheduled_for: DateTime<Utc> },
    /// Started on demand, regardless of the schedule.
    Manual,
}

impl TriggerKind {
    /// Value exported to `run` steps as `NEWS_PAGES_EVENT`.
    pub fn event_name(&self) -> &'static str {
        match self {
            TriggerKind::Schedule { .. } => "schedule",
            TriggerKind::Manual => "workflow_dispatch",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKind::Schedule { scheduled_for } => {
                write!(f, "schedule ({})", scheduled_for.format("%Y-%m-%d %H:%M UTC"))
            }
            TriggerKind::Manual => f.write_str("manual dispatch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_names() {
        let scheduled = TriggerKind::Schedule {
            scheduled_for: Utc.with_ymd_and_hms(2024, 5, 1, 10, 5, 0).unwrap(),
        };
        assert_eq!(scheduled.event_name(), "schedule");
        assert_eq!(scheduled.to_string(), "schedule (2024-05-01 10:05 UTC)");
        assert_eq!(TriggerKind::Manual.event_name(), "workflow_dispatch");
    }
}
