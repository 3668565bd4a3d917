pub mod filter;

pub use filter::{
    apply_quality_filters, filter_pass_flag, filter_sparse_field_bands,
    filter_zeropoint_outliers, restrict_primary_grid, QualityReport,
};
