pub mod czi;
pub mod form;
pub mod header;
pub mod lif;
pub mod nd2;
pub mod raw;
pub mod readme;
pub mod xml;
