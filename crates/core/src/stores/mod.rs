pub mod remote;

pub use remote::{RemoteIndexClient, RemoteStoreConfig};
