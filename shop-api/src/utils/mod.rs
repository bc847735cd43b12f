pub mod pagination;
pub mod type_convert;
