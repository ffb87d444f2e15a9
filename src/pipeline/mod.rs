pub mod stage2_controls;
pub mod stage3_normalize;
pub mod stage4_aggregate;
pub mod stage5_fit;
pub mod stage6_report;
