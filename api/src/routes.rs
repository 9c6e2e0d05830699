pub mod health_route;
pub mod json_payload;

pub mod search {
    pub mod search_payload;
    pub mod search_route;
}

pub mod mapping {
    pub mod save_mapping_route;
}

pub mod debug {
    pub mod debug_embedding_route;
}

pub mod invoice {
    pub mod process_pdf_route;
    pub mod sample_extraction;
}
