pub mod api;
pub mod directory;
pub mod error;
pub mod file_directory;
pub mod http_directory;
pub mod ngo;
