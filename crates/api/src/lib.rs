//! HTTP/JSON surface for the vaccine inventory system.

pub mod app;
