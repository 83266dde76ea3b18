pub mod anilist_client;

pub use anilist_client::AniListClient;
