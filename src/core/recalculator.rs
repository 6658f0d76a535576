use crate::core::{
    FailedUpdate, FieldMapping, ProjectReport, RecalculationReport, UpdatedWorkItem,
    WorkItemEstimate, WorkItemTracker,
};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;

/// Azure DevOps rejects `workitems?ids=` lists longer than this.
pub const MAX_BATCH_SIZE: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct RecalculationSettings {
    /// Projects to process by exact name. Empty means every project.
    pub target_projects: Vec<String>,
    pub fields: FieldMapping,
    pub batch_size: usize,
}

impl Default for RecalculationSettings {
    fn default() -> Self {
        Self {
            target_projects: Vec::new(),
            fields: FieldMapping::default(),
            batch_size: MAX_BATCH_SIZE,
        }
    }
}

impl RecalculationSettings {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self {
            target_projects: config.target_projects().to_vec(),
            fields: config.fields().clone(),
            batch_size: config.batch_size(),
        }
    }

    fn includes(&self, project: &str) -> bool {
        self.target_projects.is_empty() || self.target_projects.iter().any(|p| p == project)
    }
}

/// Walks the selected projects and writes the derived total back to every
/// work item that has all three inputs.
pub struct EstimateRecalculator<T: WorkItemTracker> {
    tracker: T,
    settings: RecalculationSettings,
}

impl<T: WorkItemTracker> EstimateRecalculator<T> {
    pub fn new(tracker: T, settings: RecalculationSettings) -> Self {
        Self { tracker, settings }
    }

    pub async fn run(&self) -> Result<RecalculationReport> {
        let projects = self.tracker.list_projects().await?;
        tracing::debug!("Found {} projects", projects.len());

        let mut report = RecalculationReport::default();
        for project in projects.iter().filter(|p| self.settings.includes(&p.name)) {
            tracing::info!("📁 Project: {}", project.name);
            let project_report = self.recalculate_project(&project.name).await?;
            tracing::info!(
                "📊 {}: {} updated, {} skipped, {} failed",
                project.name,
                project_report.updated.len(),
                project_report.skipped.len(),
                project_report.failed.len()
            );
            report.projects.push(project_report);
        }

        if report.projects.is_empty() {
            tracing::warn!(
                "⚠️ None of the target projects {:?} exist in the organization",
                self.settings.target_projects
            );
        }

        Ok(report)
    }

    pub async fn recalculate_project(&self, project: &str) -> Result<ProjectReport> {
        let mut report = ProjectReport {
            project: project.to_string(),
            ..Default::default()
        };

        let ids = self.tracker.query_work_item_ids(project).await?;
        if ids.is_empty() {
            tracing::info!("No work items found for project: {}", project);
            return Ok(report);
        }
        report.work_items_found = ids.len();

        let batch_size = self.settings.batch_size.clamp(1, MAX_BATCH_SIZE);
        for chunk in ids.chunks(batch_size) {
            let work_items = self.tracker.get_work_items(chunk).await?;

            for work_item in work_items {
                let fields = &self.settings.fields;
                let estimate = WorkItemEstimate::from_fields(&work_item.fields, fields);

                let Some(total) = estimate.total() else {
                    tracing::info!(
                        "⏭️ Work item {}: not enough data to compute the total (missing {})",
                        work_item.id,
                        estimate.missing_fields(fields).join(", ")
                    );
                    report.skipped.push(work_item.id);
                    continue;
                };
                let Some(document) = estimate.update_document(fields) else {
                    tracing::error!("❌ Work item {}: computed total {} is not a finite number", work_item.id, total);
                    report.failed.push(FailedUpdate {
                        id: work_item.id,
                        error: format!("computed total {} is not a finite number", total),
                    });
                    continue;
                };

                tracing::debug!("Work item {}: computed total {}", work_item.id, total);
                match self.tracker.update_work_item(work_item.id, &document).await {
                    Ok(()) => {
                        tracing::info!("✅ Work item {}: {} set to {}", work_item.id, fields.total, total);
                        report.updated.push(UpdatedWorkItem {
                            id: work_item.id,
                            total,
                        });
                    }
                    Err(e) => {
                        tracing::error!("❌ Failed to update work item {}: {}", work_item.id, e);
                        report.failed.push(FailedUpdate {
                            id: work_item.id,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        Ok(report)
    }
}
