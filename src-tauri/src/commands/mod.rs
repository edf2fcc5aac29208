pub mod catalog;
pub mod folders;
pub mod settings;
