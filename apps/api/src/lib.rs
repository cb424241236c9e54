//! Job advisor relay: forwards a conversation to a hosted model with a fixed
//! résumé-selection instruction and hands the reply back.

pub mod config;
pub mod errors;
pub mod llm_client;
pub mod models;
pub mod relay;
pub mod routes;
pub mod state;
