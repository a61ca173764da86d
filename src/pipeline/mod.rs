pub mod extraction;
pub mod mapping;
pub mod rdm;
pub mod templates;
