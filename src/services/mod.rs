pub mod clock;
pub mod document_client;
pub mod gate;
pub mod metrics;
pub mod rate_window;
