//! The deployment workflow: triggers, ordered steps, and the publish to a pages branch.

pub mod lock;
pub mod publish;
pub mod runner;
pub mod schedule;
pub mod scheduler;
pub mod step;
pub mod trigger;

pub use publish::{GitPublisher, PublishOutcome};
pub use runner::{RunReport, StepReport, StepStatus, WorkflowRunner};
pub use schedule::CronSchedule;
pub use scheduler::Scheduler;
pub use step::{Step, StepKind};
pub use trigger::TriggerKind;
