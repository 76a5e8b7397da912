use tunnel_core::Url;
use tunnel_shortener::{DeletionPipeline, ShortenerService};

#[derive(Clone)]
pub struct AppState {
    pub shortener: ShortenerService,
    pub deletion: DeletionPipeline,
    base_url: String,
}

impl AppState {
    pub fn new(
        shortener: ShortenerService,
        deletion: DeletionPipeline,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            shortener,
            deletion,
            base_url: public_base_url.into(),
        }
    }

    /// The public short link of `url`, e.g. `http://localhost:8080/g1gsHibv`.
    pub fn short_link(&self, url: &Url) -> String {
        url.short_url.to_url(&self.base_url)
    }
}
