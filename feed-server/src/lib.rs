//! Real-time subway arrivals server.
//!
//! Polls the MTA's GTFS-Realtime feeds, normalizes trip updates into a
//! per-station arrival list, and serves it over HTTP: a pull endpoint
//! (`/arrivals`) and a server-sent-events push stream (`/stream`).

pub mod config;
pub mod feed;
pub mod hub;
pub mod stations;
pub mod web;
