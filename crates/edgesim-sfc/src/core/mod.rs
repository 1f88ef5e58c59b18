pub mod chain;
pub mod common;
pub mod config;
pub mod datacenter;
pub mod events;
pub mod logger;
pub mod monitoring;
pub mod network_map;
pub mod records;
pub mod registry;
pub mod resource_pool;
pub mod service;
pub mod site_selector;
pub mod solver;
pub mod strategies;
pub mod vm;
