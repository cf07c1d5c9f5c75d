pub mod annotations;
pub mod json;
pub mod markdown;
pub mod outputs;
pub mod text;
