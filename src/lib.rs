//! Calendar - event storage service
//!
//! Stores calendar events in memory or in a relational database and serves
//! create/update/remove and day/week/month range queries over gRPC and a
//! REST/JSON gateway.

pub mod app;
pub mod config;
pub mod proto_ext;
pub mod server;
pub mod storage;
pub mod utils;

pub mod proto {
    tonic::include_proto!("calendar");
}
