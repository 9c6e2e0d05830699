pub mod catalog_config;
pub mod catalog_store;
pub mod match_result;
