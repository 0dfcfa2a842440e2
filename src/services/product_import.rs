use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{product_batch, BatchStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::import::{ImportError, ImportedRow, ProductImporter};
use crate::repositories::ProductBatchRepository;

/// A parsed row after trimming, checked before it becomes a batch.
#[derive(Debug, Clone, Validate)]
struct NewBatch {
    #[validate(length(min = 1, max = 300))]
    name: String,
    #[validate(length(max = 50))]
    unit: String,
    unit_price: Decimal,
    #[validate(range(min = 1))]
    quantity: i32,
}

impl From<&ImportedRow> for NewBatch {
    fn from(row: &ImportedRow) -> Self {
        Self {
            name: row.name.trim().to_string(),
            unit: row.unit.trim().to_string(),
            unit_price: row.unit_price.round_dp(2),
            quantity: row.quantity,
        }
    }
}

/// Turns parsed rows into new batches.
///
/// Rows with a non-positive quantity are dropped. Rows priced at or below zero
/// are kept; the next grouping run closes them without placing them. A row
/// that fails length validation rejects the whole import.
pub fn prepare_batches(
    rows: &[ImportedRow],
    now: DateTime<Utc>,
) -> Result<Vec<product_batch::Model>, ServiceError> {
    let mut batches = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        if row.quantity <= 0 {
            continue;
        }
        if row.unit_price.is_sign_negative() && !row.unit_price.is_zero() {
            warn!(row = index + 1, name = %row.name, price = %row.unit_price, "Importing row with negative price");
        }

        let candidate = NewBatch::from(row);
        candidate.validate().map_err(|e| {
            ServiceError::ValidationError(format!("Row {} ('{}'): {}", index + 1, candidate.name, e))
        })?;

        batches.push(product_batch::Model {
            id: Uuid::new_v4(),
            name: candidate.name,
            unit: candidate.unit,
            unit_price: candidate.unit_price,
            initial_quantity: candidate.quantity,
            remaining_quantity: candidate.quantity,
            status: BatchStatus::New,
            created_at: now,
            updated_at: None,
        });
    }

    Ok(batches)
}

/// Imports uploaded price lists as product batches.
#[derive(Clone)]
pub struct ProductImportService {
    importer: Arc<dyn ProductImporter>,
    batches: ProductBatchRepository,
    event_sender: Option<EventSender>,
}

impl ProductImportService {
    pub fn new(importer: Arc<dyn ProductImporter>, batches: ProductBatchRepository) -> Self {
        Self {
            importer,
            batches,
            event_sender: None,
        }
    }

    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    /// Parses `input` and stores every usable row as a new batch.
    ///
    /// Returns the number of batches created. Nothing is written when the
    /// document cannot be parsed or a row is invalid.
    #[instrument(skip(self, input), fields(size = input.len()))]
    pub async fn import(&self, input: &[u8]) -> Result<usize, ServiceError> {
        if input.is_empty() {
            return Err(ImportError::Empty.into());
        }

        let rows = self.importer.parse(input)?;
        let batches = prepare_batches(&rows, Utc::now())?;
        if batches.is_empty() {
            info!(parsed_rows = rows.len(), "Import contained no usable rows");
            return Ok(0);
        }

        let count = self.batches.add_batches(batches).await?;
        metrics::counter!("grouping.batches_imported", count as u64);
        info!(parsed_rows = rows.len(), imported = count, "Imported product batches");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::BatchesImported { count }).await {
                warn!(error = %e, "Failed to publish import event");
            }
        }

        Ok(count)
    }
}
