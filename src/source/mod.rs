// Source module - everything between a source URL and a loaded DataSet
pub mod fetcher;
pub mod filetype;
pub mod loader;

pub use fetcher::{
    default_registry, register_fetcher, retrieve_data, Fetch, FetcherRegistry, FileFetcher,
    HttpFetcher, RawData,
};
pub use filetype::Filetype;
pub use loader::load;
