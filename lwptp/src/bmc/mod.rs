//! Best master clock algorithm and the foreign master bookkeeping it runs on

pub mod bmca;
pub(crate) mod dataset_comparison;
pub mod foreign_master;
