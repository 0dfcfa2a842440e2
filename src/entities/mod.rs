pub mod product_batch;
pub mod product_group;
pub mod product_group_item;

pub use product_batch::BatchStatus;
