use crate::domain::model::{FieldMapping, PatchOperation, Project, WorkItem};
use crate::utils::error::Result;
use async_trait::async_trait;

/// The work item tracking service the recalculation reads from and writes to.
#[async_trait]
pub trait WorkItemTracker: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>>;
    async fn query_work_item_ids(&self, project: &str) -> Result<Vec<u32>>;
    async fn get_work_items(&self, ids: &[u32]) -> Result<Vec<WorkItem>>;
    async fn update_work_item(&self, id: u32, document: &[PatchOperation]) -> Result<()>;
}

/// Opens a tracker session authenticated with a caller-supplied token.
pub trait TrackerConnector: Send + Sync {
    type Tracker: WorkItemTracker + 'static;

    fn connect(&self, token: &str) -> Result<Self::Tracker>;
}

pub trait ConfigProvider: Send + Sync {
    fn organization_url(&self) -> &str;
    fn api_version(&self) -> &str;
    fn timeout_seconds(&self) -> u64;
    fn page_size(&self) -> usize;
    fn batch_size(&self) -> usize;
    fn target_projects(&self) -> &[String];
    fn fields(&self) -> &FieldMapping;
}
