mod episodes;
mod podcasts;
mod schema;
mod types;

pub use schema::Database;
pub use types::{
    DatabaseError, Episode, ExistingEpisode, NewEpisode, NewPodcast, Podcast, PodcastPatch,
};
