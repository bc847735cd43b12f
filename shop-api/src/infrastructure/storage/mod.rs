pub mod uploads;

pub use uploads::{ImageStore, StoredUpload};
