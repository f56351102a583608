pub mod ask;
pub mod index;
pub mod init;
pub mod recall;
pub mod status;
