pub mod app_state;
pub mod mapping_store;
