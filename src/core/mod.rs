pub mod estimate;
pub mod recalculator;

pub use crate::domain::model::{
    Amount, FailedUpdate, FieldMapping, PatchOperation, Project, ProjectReport,
    RecalculationReport, UpdatedWorkItem, WorkItem, WorkItemEstimate,
};
pub use crate::domain::ports::{ConfigProvider, TrackerConnector, WorkItemTracker};
pub use crate::utils::error::Result;
