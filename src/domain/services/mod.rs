pub mod prompt_builder;
