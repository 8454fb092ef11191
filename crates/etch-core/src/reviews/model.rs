// Review domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// The reviewer as embedded in a review row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewUser {
    pub id: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// One review of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub service_id: String,
    pub user_id: String,
    /// 1 through 5.
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    /// The provider's reply, if any.
    #[serde(default, alias = "provider_response")]
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    pub user: ReviewUser,
}

/// Declarative filters. `None` means "don't filter on this".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewFilters {
    pub rating: Option<u8>,
    pub has_response: Option<bool>,
}

impl ReviewFilters {
    pub fn rating(rating: u8) -> Self {
        Self {
            rating: Some(rating),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.has_response.is_none()
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReviewSort {
    #[default]
    Newest,
    Oldest,
    Highest,
    Lowest,
}

impl ReviewSort {
    /// Column the data store orders by.
    pub fn order_column(self) -> &'static str {
        match self {
            Self::Newest | Self::Oldest => "created_at",
            Self::Highest | Self::Lowest => "rating",
        }
    }

    pub fn ascending(self) -> bool {
        matches!(self, Self::Oldest | Self::Lowest)
    }
}
