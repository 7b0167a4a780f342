#![forbid(unsafe_code)]

pub mod bind;
pub mod build;
pub mod cli;
pub mod config;
pub mod formats;
pub mod fragment;
pub mod logging;
pub mod manifest;
pub mod merge;
pub mod order;
pub mod title;
pub mod toc;
pub mod unit;
pub mod xml;
