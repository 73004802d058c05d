pub mod build;
pub mod init;
pub mod livereload;
pub mod serve;
