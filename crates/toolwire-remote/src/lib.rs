pub mod chat;
pub mod dataset;

pub use chat::ChatClient;
pub use dataset::DatasetClient;
