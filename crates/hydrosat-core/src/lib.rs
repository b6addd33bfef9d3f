pub mod aggregate;
pub mod alerts;
pub mod cache;
pub mod change;
pub mod classify;
pub mod composite;
pub mod consts;
pub mod error;
pub mod imagery;
pub mod indices;
pub mod jobs;
pub mod monitor;
pub mod period;
pub mod raster;
pub mod region;
pub mod report;
