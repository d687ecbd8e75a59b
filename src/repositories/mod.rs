pub mod contribution_postgres_repository;
pub mod emne_postgres_repository;
pub mod master_document_postgres_repository;
pub mod openai_completion_repository;
