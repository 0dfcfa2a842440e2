pub mod admin;
pub mod groups;
pub mod health;
pub mod import;

use std::sync::Arc;

use crate::events::EventSender;
use crate::import::SpreadsheetImporter;
use crate::repositories::{ProductBatchRepository, ProductGroupRepository, SeaOrmAllocationStore};
use crate::services::{
    group_queries::GroupQueryService, grouping::GroupingService,
    product_import::ProductImportService,
};
use sea_orm::DatabaseConnection;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub import: Arc<ProductImportService>,
    pub grouping: GroupingService,
    pub queries: Arc<GroupQueryService>,
}

impl AppServices {
    /// Wires every service against one database connection.
    ///
    /// The grouping service returned here is the one the scheduler must use
    /// as well, so that manual and scheduled runs share one run guard.
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        let batches = ProductBatchRepository::new(db.clone());
        let groups = ProductGroupRepository::new(db.clone());

        let mut import =
            ProductImportService::new(Arc::new(SpreadsheetImporter), batches.clone());
        let mut grouping = GroupingService::new(Arc::new(SeaOrmAllocationStore::new(db)));
        if let Some(sender) = event_sender {
            import = import.with_event_sender(sender.clone());
            grouping = grouping.with_event_sender(sender);
        }

        Self {
            import: Arc::new(import),
            grouping,
            queries: Arc::new(GroupQueryService::new(groups, batches)),
        }
    }
}
