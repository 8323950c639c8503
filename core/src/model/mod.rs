pub mod file_indices;
pub mod files;
pub mod locations;
pub mod records;
pub mod requests;
pub mod transfers;
