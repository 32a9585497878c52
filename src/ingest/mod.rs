pub mod pathname;
pub mod records;
pub mod referrer;
pub mod source;
pub mod traffic_source;
