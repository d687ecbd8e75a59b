pub mod completion_port;
pub mod contribution_repository;
pub mod emne_repository;
pub mod master_document_repository;
