pub mod group_queries;
pub mod grouping;
pub mod grouping_scheduler;
pub mod product_import;
