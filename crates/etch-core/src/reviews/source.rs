// Seam between the review controller and the data store.

use std::future::Future;

use etch_api::RestClient;

use super::model::Review;
use super::query::ReviewQuery;

/// Table holding service reviews.
pub const REVIEWS_TABLE: &str = "service_reviews";

/// Columns requested per review, with the reviewer's profile embedded as `user`.
pub const REVIEW_COLUMNS: &str = "*, user:profiles(id, full_name, avatar_url)";

/// Column holding the provider's reply.
pub const RESPONSE_COLUMN: &str = "provider_response";

/// Anything that can serve one page of reviews.
pub trait ReviewSource: Send + Sync + 'static {
    fn fetch_page(
        &self,
        query: &ReviewQuery,
    ) -> impl Future<Output = Result<Vec<Review>, etch_api::Error>> + Send;
}

impl ReviewSource for RestClient {
    async fn fetch_page(&self, query: &ReviewQuery) -> Result<Vec<Review>, etch_api::Error> {
        let mut request = self
            .table(REVIEWS_TABLE)
            .select(REVIEW_COLUMNS)
            .eq("service_id", &query.service_id)
            .order(query.sort.order_column(), query.sort.ascending());

        if let Some(rating) = query.filters.rating {
            request = request.eq("rating", rating);
        }
        request = match query.filters.has_response {
            Some(true) => request.not_null(RESPONSE_COLUMN),
            Some(false) => request.is_null(RESPONSE_COLUMN),
            None => request,
        };

        let (from, to) = query.range();
        request.range(from, to).fetch().await
    }
}
