// Aggregate statistics over a list of reviews.

use serde::Serialize;

use super::model::Review;

/// Average, count and per-star distribution of a set of reviews.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewSummary {
    pub average_rating: f64,
    pub total_reviews: u32,
    /// `distribution[0]` counts 1-star reviews, `distribution[4]` 5-star.
    pub distribution: [u32; 5],
}

impl ReviewSummary {
    /// Summarize `reviews`. Ratings outside 1..=5 are ignored.
    pub fn from_reviews(reviews: &[Review]) -> Self {
        let mut distribution = [0u32; 5];
        let mut total = 0u32;
        let mut sum = 0u32;

        for review in reviews {
            let Some(slot) = star_index(review.rating) else {
                continue;
            };
            distribution[slot] += 1;
            total += 1;
            sum = sum.saturating_add(u32::from(review.rating));
        }

        let average_rating = if total == 0 {
            0.0
        } else {
            f64::from(sum) / f64::from(total)
        };

        Self {
            average_rating,
            total_reviews: total,
            distribution,
        }
    }

    /// Reviews with exactly `stars` stars.
    pub fn count(&self, stars: u8) -> u32 {
        star_index(stars).map_or(0, |i| self.distribution[i])
    }

    /// `count` as a percentage of all reviews; 0 when there are none.
    pub fn percentage(&self, count: u32) -> f64 {
        if self.total_reviews == 0 {
            0.0
        } else {
            f64::from(count) / f64::from(self.total_reviews) * 100.0
        }
    }

    pub fn rating_percentage(&self, stars: u8) -> f64 {
        self.percentage(self.count(stars))
    }

    /// Screen-reader description of the whole summary.
    pub fn accessibility_label(&self) -> String {
        let distribution = (1u8..=5)
            .map(|stars| {
                let count = self.count(stars);
                format!("{count} {} with {stars} stars", plural(count))
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Average rating: {:.1} out of 5 stars. Based on {} {}. Distribution: {distribution}",
            self.average_rating,
            self.total_reviews,
            plural(self.total_reviews),
        )
    }

    /// Screen-reader description of one rating bar.
    pub fn rating_bar_label(&self, stars: u8) -> String {
        let count = self.count(stars);
        format!(
            "{stars} stars: {count} reviews, {:.0}%",
            self.rating_percentage(stars)
        )
    }
}

fn star_index(stars: u8) -> Option<usize> {
    (1..=5).contains(&stars).then(|| usize::from(stars - 1))
}

fn plural(count: u32) -> &'static str {
    if count == 1 { "review" } else { "reviews" }
}
