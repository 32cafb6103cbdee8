pub mod aggregate;
pub mod generate;
pub mod init;
pub mod list_guessers;
pub mod train;
