//! Review command handlers.

use tabled::Tabled;

use etch_config::Config;
use etch_core::{Review, ReviewFilters, ReviewListController, ReviewSource, ReviewSummary};

use crate::cli::{GlobalOpts, ReviewQueryArgs, ReviewsArgs, ReviewsCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

const COMMENT_WIDTH: usize = 60;
const BAR_WIDTH: u32 = 20;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ReviewRow {
    #[tabled(rename = "Rating")]
    rating: String,
    #[tabled(rename = "Reviewer")]
    reviewer: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Comment")]
    comment: String,
    #[tabled(rename = "Response")]
    response: String,
}

impl ReviewRow {
    fn new(review: &Review, color: bool) -> Self {
        Self {
            rating: output::stars(review.rating, color),
            reviewer: review.user.full_name.clone(),
            date: review.created_at.format("%Y-%m-%d").to_string(),
            comment: truncate(&review.comment, COMMENT_WIDTH),
            response: if review.response.is_some() { "yes" } else { "-" }.into(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ReviewsArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    match args.command {
        ReviewsCommand::List { query, pages, all } => {
            let controller = controller(&query, global, cfg)?;
            let limit = if all { None } else { Some(pages) };
            load_pages(&controller, limit, global).await?;

            let state = controller.state();
            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &state.reviews,
                |r| ReviewRow::new(r, color),
                |r| r.id.clone(),
            );
            output::print_output(&out, global.quiet);

            if state.has_more && !global.quiet {
                eprintln!(
                    "Showing {} reviews. More available: use --pages {} or --all",
                    state.reviews.len(),
                    state.page + 1
                );
            }
            Ok(())
        }

        ReviewsCommand::Summary { query } => {
            let controller = controller(&query, global, cfg)?;
            load_pages(&controller, None, global).await?;

            let summary = controller.summary();
            let color = output::should_color(&global.color);
            let out = output::render_single(
                &global.output,
                &summary,
                |s| summary_detail(s, color),
                |s| format!("{:.1}\t{}", s.average_rating, s.total_reviews),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

fn controller(
    query: &ReviewQueryArgs,
    global: &GlobalOpts,
    cfg: &Config,
) -> Result<ReviewListController<impl ReviewSource>, CliError> {
    let review_config = config::review_config(global, query.service.as_deref(), cfg)?;
    tracing::debug!(service_id = %review_config.service_id, "review controller built");
    ReviewListController::from_config_with_view(&review_config, filters(query), query.sort.into())
        .map_err(Into::into)
}

fn filters(query: &ReviewQueryArgs) -> ReviewFilters {
    let has_response = if query.answered {
        Some(true)
    } else if query.unanswered {
        Some(false)
    } else {
        None
    };
    ReviewFilters {
        rating: query.rating,
        has_response,
    }
}

/// Load page 1, then keep appending until `limit` pages (or every page).
async fn load_pages<S: ReviewSource>(
    controller: &ReviewListController<S>,
    limit: Option<u32>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let spinner = util::spinner(global, "Loading reviews");
    controller.load().await?;

    loop {
        let state = controller.state();
        spinner.set_message(format!("Loaded {} reviews", state.reviews.len()));
        if !state.has_more || limit.is_some_and(|n| state.page >= n) {
            break;
        }
        controller.load_more().await?;
    }

    spinner.finish_and_clear();
    Ok(())
}

fn summary_detail(summary: &ReviewSummary, color: bool) -> String {
    let mut lines = vec![
        format!(
            "{:.1} out of 5  ({} reviews)",
            summary.average_rating, summary.total_reviews
        ),
        String::new(),
    ];
    for stars in (1u8..=5).rev() {
        let count = summary.count(stars);
        lines.push(format!(
            "{} {} {:>3.0}%  ({count})",
            output::stars(stars, color),
            bar(count, summary.total_reviews),
            summary.rating_percentage(stars),
        ));
    }
    lines.join("\n")
}

fn bar(count: u32, total: u32) -> String {
    let filled = if total == 0 {
        0
    } else {
        usize::try_from(count.saturating_mul(BAR_WIDTH) / total).unwrap_or(0)
    };
    let width = usize::try_from(BAR_WIDTH).unwrap_or(0);
    format!("{}{}", "█".repeat(filled), "░".repeat(width.saturating_sub(filled)))
}

fn truncate(text: &str, max: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= max {
        return single_line;
    }
    let cut: String = single_line.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_scales_to_width() {
        assert_eq!(bar(0, 0).chars().count(), 20);
        assert_eq!(bar(5, 10).chars().filter(|c| *c == '█').count(), 10);
        assert_eq!(bar(10, 10).chars().filter(|c| *c == '░').count(), 0);
    }

    #[test]
    fn truncate_flattens_and_shortens() {
        assert_eq!(truncate("short\ntext", 60), "short text");
        let long = "x".repeat(80);
        let out = truncate(&long, 10);
        assert_eq!(out.chars().count(), 10);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn summary_detail_lists_five_star_first() {
        let summary = ReviewSummary {
            average_rating: 4.0,
            total_reviews: 2,
            distribution: [0, 0, 1, 0, 1],
        };
        let text = summary_detail(&summary, false);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("4.0 out of 5"));
        assert!(lines[2].starts_with("★★★★★"));
        assert!(lines[6].starts_with("★☆☆☆☆"));
    }
}
