pub mod synthesize_document;
