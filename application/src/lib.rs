pub mod answer_service;
pub mod index_service;
