pub mod block;
pub mod decode;
pub mod source;
