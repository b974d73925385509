pub mod bitcodec;
pub mod config;
pub mod container;
pub mod crypto;
pub mod metadata;
pub mod payload;
pub mod pipeline;
pub mod raster;

pub use config::StegConfig;
pub use container::StegError;
pub use crypto::CryptoError;
pub use payload::Payload;
pub use pipeline::batch::{run_batch, BatchJob, BatchOutcome};
pub use pipeline::decode::decode_file;
pub use pipeline::encode::encode_file;
pub use pipeline::hook::{NoopHook, ProgressHook, Stage};
pub use pipeline::{decode, decode_with, embed, embed_with, Decoded};
pub use raster::Image;
