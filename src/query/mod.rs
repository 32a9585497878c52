pub mod aggregate;
pub mod breakdowns;
pub mod stats;
pub mod timeseries;
