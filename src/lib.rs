//! Article Feed - a personal read-later list published as RSS
//!
//! Articles are saved through an authenticated JSON endpoint and served back
//! as an RSS 2.0 feed of the most recent entries.

pub mod config;
pub mod db;
pub mod feed;
pub mod memory;
pub mod routes;
pub mod xml;
