pub mod aggregate;
pub mod observation;
pub mod package;
pub mod request;
