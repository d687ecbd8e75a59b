pub mod contribution;
pub mod emne;
pub mod generation_mode;
pub mod master_document;
