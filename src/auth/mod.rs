pub mod azure;
pub mod google;

pub use google::ServiceAccountKey;
