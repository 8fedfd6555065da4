//! Remote console client

mod client;

pub use client::RconClient;
