// Declare all modules that are part of this library
pub mod config;
pub mod error;
pub mod session;
pub mod types {
    pub mod analysis;
}
pub mod client {
    pub mod gemini;
    pub mod schema;
}
pub mod export {
    pub mod pdf_report;
    pub mod text_report;
}
