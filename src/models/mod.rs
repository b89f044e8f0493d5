pub mod energy;
pub mod meter;

pub use energy::{
    Bucket, BucketResponse, BucketResult, EnergyDelta, EnergyReport, EnergyReportResponse,
    MeterListResponse, Period, QualityStats, Reading, Strategy,
};
pub use meter::{normalize_meter_id, Meter, MeterDirectory};
