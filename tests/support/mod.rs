#![allow(dead_code)]

pub mod error;
pub mod proxy;
pub mod server;
