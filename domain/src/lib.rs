pub mod chunker;
pub mod corpus;
pub mod models;
pub mod provider;
pub mod response;
pub mod retrieval;
