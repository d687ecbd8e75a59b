pub mod generate_document;
pub mod health_check;
pub mod list_documents;

pub use generate_document::generate_document;
pub use health_check::health_check;
pub use list_documents::list_documents;
