use serde::{Deserialize, Serialize};

use crate::{boxoffice, error::AppError};

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieCreate {
    pub title: String,
    pub genre: String,
    pub release_date: String,
    pub distributor: Option<String>,
    pub budget: Option<i64>,
    pub mpa_rating: Option<String>,
}

impl MovieCreate {
    /// Shape checks only; the release date is not checked for calendar
    /// validity beyond its `YYYY-MM-DD` layout.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty()
            || self.genre.trim().is_empty()
            || self.release_date.trim().is_empty()
        {
            return Err(AppError::Validation(
                "title, genre and releaseDate are required".to_string(),
            ));
        }
        let date = self.release_date.as_bytes();
        if date.len() != 10 || date[4] != b'-' || date[7] != b'-' {
            return Err(AppError::Validation("invalid releaseDate format".to_string()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub release_date: String,
    pub genre: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distributor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mpa_rating: Option<String>,
    pub box_office: Option<BoxOffice>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxOffice {
    pub revenue: Revenue,
    pub currency: String,
    pub source: String,
    pub last_updated: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Revenue {
    pub worldwide: i64,
    #[serde(rename = "openingWeekendUSA", skip_serializing_if = "Option::is_none")]
    pub opening_weekend_usa: Option<i64>,
}

impl BoxOffice {
    /// Normalizes an upstream record into the stored enrichment shape.
    ///
    /// Worldwide revenue defaults to zero when the upstream omits it, but an
    /// absent opening-weekend figure stays absent so it remains
    /// distinguishable from a reported zero.
    pub fn from_upstream(rec: boxoffice::BoxOfficeRecord) -> Self {
        Self {
            revenue: Revenue {
                worldwide: rec.revenue.worldwide.unwrap_or(0),
                opening_weekend_usa: rec.revenue.opening_weekend_usa,
            },
            currency: rec.currency,
            source: rec.source,
            last_updated: rec.last_updated,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoviePage {
    pub items: Vec<Movie>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RatingSubmit {
    pub rating: f64,
}

impl RatingSubmit {
    /// Accepts half-point steps from 0.5 through 5.0.
    pub fn validate(&self) -> Result<(), AppError> {
        if !(0.5..=5.0).contains(&self.rating) || (self.rating * 2.0).fract() != 0.0 {
            return Err(AppError::Validation("rating out of range".to_string()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingResult {
    pub movie_title: String,
    pub rater_id: String,
    pub rating: f64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingAggregate {
    pub average: f64,
    pub count: i64,
}
