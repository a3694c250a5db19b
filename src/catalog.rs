use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    entities::{box_office, movie, rating},
    error::{AppError, AppResult},
    models::{BoxOffice, Movie, MovieCreate, MoviePage, RatingAggregate, RatingResult, Revenue},
};

#[derive(Clone, Debug, Default)]
pub struct ListFilter {
    pub query: Option<String>,
    pub year: Option<String>,
    pub genre: Option<String>,
    pub limit: u64,
    pub cursor: Option<String>,
}

/// Data access layer over the catalogue tables. All mutations run on the
/// single pooled connection, each inside its own transaction.
#[derive(Clone)]
pub struct Catalog {
    db: DatabaseConnection,
}

impl Catalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Inserts a movie and, when present, its box office row in one
    /// transaction. A duplicate title is absorbed silently: the movie insert
    /// is skipped, the call still succeeds. The enrichment upsert is keyed by
    /// the freshly assigned id and attempted regardless of the skip.
    pub async fn create_movie(
        &self,
        candidate: MovieCreate,
        enrichment: Option<BoxOffice>,
    ) -> AppResult<Movie> {
        let id = Uuid::now_v7().to_string();

        let txn = self.db.begin().await?;

        let inserted = movie::Entity::insert(movie::ActiveModel {
            id: Set(id.clone()),
            title: Set(candidate.title.clone()),
            release_date: Set(candidate.release_date.clone()),
            genre: Set(candidate.genre.clone()),
            distributor: Set(candidate.distributor.clone()),
            budget: Set(candidate.budget),
            mpa_rating: Set(candidate.mpa_rating.clone()),
            ..Default::default()
        })
        .on_conflict(OnConflict::column(movie::Column::Title).do_nothing().to_owned())
        .exec_without_returning(&txn)
        .await?;

        if inserted == 0 {
            debug!(title = %candidate.title, "title already in catalogue, insert skipped");
        }

        if let Some(bo) = &enrichment {
            box_office::Entity::insert(box_office::ActiveModel {
                movie_id: Set(id.clone()),
                currency: Set(bo.currency.clone()),
                source: Set(bo.source.clone()),
                last_updated: Set(bo.last_updated.clone()),
                revenue_worldwide: Set(bo.revenue.worldwide),
                revenue_opening_weekend_usa: Set(bo.revenue.opening_weekend_usa),
            })
            .on_conflict(
                OnConflict::column(box_office::Column::MovieId)
                    .update_columns([
                        box_office::Column::Currency,
                        box_office::Column::Source,
                        box_office::Column::LastUpdated,
                        box_office::Column::RevenueWorldwide,
                        box_office::Column::RevenueOpeningWeekendUsa,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        }

        txn.commit().await?;

        Ok(Movie {
            id,
            title: candidate.title,
            release_date: candidate.release_date,
            genre: candidate.genre,
            distributor: candidate.distributor,
            budget: candidate.budget,
            mpa_rating: candidate.mpa_rating,
            box_office: enrichment,
        })
    }

    /// Filtered listing ordered by ascending id. Fetches one row past the
    /// limit to decide whether a further page exists; `next_cursor` is the id
    /// of the last returned row, usable as a strict lower bound.
    pub async fn list_movies(&self, filter: ListFilter) -> AppResult<MoviePage> {
        let mut select = movie::Entity::find().find_also_related(box_office::Entity);

        if let Some(q) = &filter.query {
            // instr keeps the match case-sensitive, unlike LIKE.
            select = select.filter(Expr::cust_with_values("instr(title, ?) > 0", [q.clone()]));
        }
        if let Some(year) = &filter.year {
            select = select
                .filter(Expr::cust_with_values("substr(release_date, 1, 4) = ?", [year.clone()]));
        }
        if let Some(genre) = &filter.genre {
            select = select.filter(movie::Column::Genre.eq(genre.clone()));
        }
        if let Some(cursor) = &filter.cursor {
            select = select.filter(movie::Column::Id.gt(cursor.clone()));
        }

        let mut rows = select
            .order_by_asc(movie::Column::Id)
            .limit(filter.limit.saturating_add(1))
            .all(&self.db)
            .await?;

        let next_cursor = if rows.len() as u64 > filter.limit {
            rows.truncate(filter.limit as usize);
            rows.last().map(|(m, _)| m.id.clone())
        } else {
            None
        };

        let items = rows.into_iter().map(|(m, bo)| movie_from_row(m, bo)).collect();
        Ok(MoviePage { items, next_cursor })
    }

    /// Upserts the rating for `(movie, rater)`. The returned flag is true
    /// when this rater had no previous rating for the movie.
    pub async fn submit_rating(
        &self,
        title: &str,
        rater_id: &str,
        value: f64,
    ) -> AppResult<(RatingResult, bool)> {
        let movie = self
            .movie_by_title(title)
            .await?
            .ok_or(AppError::NotFound("movie not found"))?;

        let existing = rating::Entity::find_by_id((movie.id.clone(), rater_id.to_string()))
            .one(&self.db)
            .await?;

        let txn = self.db.begin().await?;
        rating::Entity::insert(rating::ActiveModel {
            movie_id: Set(movie.id),
            rater_id: Set(rater_id.to_string()),
            rating: Set(value),
            updated_at: Set(jiff::Timestamp::now().to_string()),
        })
        .on_conflict(
            OnConflict::columns([rating::Column::MovieId, rating::Column::RaterId])
                .update_columns([rating::Column::Rating, rating::Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;
        txn.commit().await?;

        let result = RatingResult {
            movie_title: title.to_string(),
            rater_id: rater_id.to_string(),
            rating: value,
        };
        Ok((result, existing.is_none()))
    }

    /// Mean of all ratings for the movie, rounded half-away-from-zero at the
    /// tenths digit. A movie with zero ratings reports not-found, the same as
    /// an unknown title.
    pub async fn rating_aggregate(&self, title: &str) -> AppResult<RatingAggregate> {
        let movie = self
            .movie_by_title(title)
            .await?
            .ok_or(AppError::NotFound("movie not found"))?;

        let rows = rating::Entity::find()
            .filter(rating::Column::MovieId.eq(movie.id))
            .all(&self.db)
            .await?;

        if rows.is_empty() {
            return Err(AppError::NotFound("no ratings"));
        }

        let count = rows.len() as i64;
        let mean = rows.iter().map(|r| r.rating).sum::<f64>() / count as f64;
        let average = (mean * 10.0).round() / 10.0;

        Ok(RatingAggregate { average, count })
    }

    async fn movie_by_title(&self, title: &str) -> AppResult<Option<movie::Model>> {
        Ok(movie::Entity::find()
            .filter(movie::Column::Title.eq(title))
            .one(&self.db)
            .await?)
    }
}

fn movie_from_row(row: movie::Model, enrichment: Option<box_office::Model>) -> Movie {
    Movie {
        id: row.id,
        title: row.title,
        release_date: row.release_date,
        genre: row.genre,
        distributor: row.distributor,
        budget: row.budget,
        mpa_rating: row.mpa_rating,
        box_office: enrichment.map(|b| BoxOffice {
            revenue: Revenue {
                worldwide: b.revenue_worldwide,
                opening_weekend_usa: b.revenue_opening_weekend_usa,
            },
            currency: b.currency,
            source: b.source,
            last_updated: b.last_updated,
        }),
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{ConnectionTrait, Statement};

    use super::*;
    use crate::db::connect_and_migrate;

    async fn catalog() -> Catalog {
        let db = connect_and_migrate("sqlite::memory:").await.expect("open in-memory db");
        Catalog::new(db)
    }

    fn candidate(title: &str, genre: &str, date: &str) -> MovieCreate {
        MovieCreate {
            title: title.to_string(),
            genre: genre.to_string(),
            release_date: date.to_string(),
            distributor: None,
            budget: None,
            mpa_rating: None,
        }
    }

    fn enrichment(worldwide: i64, opening: Option<i64>) -> BoxOffice {
        BoxOffice {
            revenue: Revenue { worldwide, opening_weekend_usa: opening },
            currency: "USD".to_string(),
            source: "boxofficemojo".to_string(),
            last_updated: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    fn page_filter(limit: u64, cursor: Option<String>) -> ListFilter {
        ListFilter { limit, cursor, ..Default::default() }
    }

    #[tokio::test]
    async fn created_movie_round_trips_through_listing() {
        let catalog = catalog().await;
        catalog
            .create_movie(candidate("Heat", "Crime", "1995-12-15"), Some(enrichment(187_000_000, Some(8_445_656))))
            .await
            .unwrap();

        let page = catalog.list_movies(page_filter(20, None)).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.next_cursor.is_none());

        let movie = &page.items[0];
        assert_eq!(movie.title, "Heat");
        assert_eq!(movie.release_date, "1995-12-15");
        let bo = movie.box_office.as_ref().expect("enrichment present");
        assert_eq!(bo.revenue.worldwide, 187_000_000);
        assert_eq!(bo.revenue.opening_weekend_usa, Some(8_445_656));
        assert_eq!(bo.currency, "USD");
    }

    #[tokio::test]
    async fn unenriched_movie_lists_without_box_office() {
        let catalog = catalog().await;
        catalog.create_movie(candidate("Pi", "Thriller", "1998-07-10"), None).await.unwrap();

        let page = catalog.list_movies(page_filter(20, None)).await.unwrap();
        assert!(page.items[0].box_office.is_none());
    }

    #[tokio::test]
    async fn duplicate_title_succeeds_and_keeps_single_row() {
        let catalog = catalog().await;
        catalog.create_movie(candidate("Heat", "Crime", "1995-12-15"), None).await.unwrap();
        catalog.create_movie(candidate("Heat", "Drama", "2001-01-01"), None).await.unwrap();

        let page = catalog.list_movies(page_filter(20, None)).await.unwrap();
        assert_eq!(page.items.len(), 1);
        // The first insert won; the second was a silent no-op.
        assert_eq!(page.items[0].genre, "Crime");
    }

    #[tokio::test]
    async fn pagination_walk_yields_full_set_in_ascending_id_order() {
        let catalog = catalog().await;
        for i in 0..25 {
            catalog
                .create_movie(candidate(&format!("Movie {i:02}"), "Drama", "2020-01-01"), None)
                .await
                .unwrap();
        }

        let mut ids = Vec::new();
        let mut cursor = None;
        let mut pages = 0;
        loop {
            let page = catalog.list_movies(page_filter(10, cursor.clone())).await.unwrap();
            pages += 1;
            ids.extend(page.items.iter().map(|m| m.id.clone()));
            match page.next_cursor {
                Some(next) => {
                    assert_eq!(Some(&next), ids.last(), "cursor must be the last returned id");
                    cursor = Some(next);
                },
                None => break,
            }
        }

        assert_eq!(pages, 3);
        assert_eq!(ids.len(), 25);
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(ids, sorted, "pages concatenate to a duplicate-free ascending set");
    }

    #[tokio::test]
    async fn exact_page_boundary_has_no_dangling_cursor() {
        let catalog = catalog().await;
        for i in 0..10 {
            catalog
                .create_movie(candidate(&format!("Movie {i:02}"), "Drama", "2020-01-01"), None)
                .await
                .unwrap();
        }

        let page = catalog.list_movies(page_filter(10, None)).await.unwrap();
        assert_eq!(page.items.len(), 10);
        assert!(page.next_cursor.is_none(), "no further page exists");
    }

    #[tokio::test]
    async fn filters_combine_conjunctively() {
        let catalog = catalog().await;
        catalog.create_movie(candidate("Alien", "Horror", "1979-05-25"), None).await.unwrap();
        catalog.create_movie(candidate("Aliens", "Action", "1986-07-18"), None).await.unwrap();
        catalog.create_movie(candidate("Alien 3", "Horror", "1992-05-22"), None).await.unwrap();

        let page = catalog
            .list_movies(ListFilter {
                query: Some("Alien".to_string()),
                year: Some("1979".to_string()),
                genre: Some("Horror".to_string()),
                limit: 20,
                cursor: None,
            })
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "Alien");
    }

    #[tokio::test]
    async fn title_filter_is_case_sensitive_substring() {
        let catalog = catalog().await;
        catalog.create_movie(candidate("Alien", "Horror", "1979-05-25"), None).await.unwrap();

        let miss = catalog
            .list_movies(ListFilter { query: Some("alien".to_string()), limit: 20, ..Default::default() })
            .await
            .unwrap();
        assert!(miss.items.is_empty());

        let hit = catalog
            .list_movies(ListFilter { query: Some("lie".to_string()), limit: 20, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(hit.items.len(), 1);
    }

    #[tokio::test]
    async fn second_rating_from_same_rater_updates_in_place() {
        let catalog = catalog().await;
        catalog.create_movie(candidate("Heat", "Crime", "1995-12-15"), None).await.unwrap();

        let (_, created) = catalog.submit_rating("Heat", "rater-1", 3.0).await.unwrap();
        assert!(created);

        let (result, created) = catalog.submit_rating("Heat", "rater-1", 4.5).await.unwrap();
        assert!(!created);
        assert_eq!(result.rating, 4.5);

        let rows = rating::Entity::find().all(catalog.db()).await.unwrap();
        assert_eq!(rows.len(), 1, "one row per (movie, rater) pair");
        assert_eq!(rows[0].rating, 4.5);
    }

    #[tokio::test]
    async fn ratings_from_distinct_raters_accumulate() {
        let catalog = catalog().await;
        catalog.create_movie(candidate("Heat", "Crime", "1995-12-15"), None).await.unwrap();

        catalog.submit_rating("Heat", "rater-1", 3.0).await.unwrap();
        let (_, created) = catalog.submit_rating("Heat", "rater-2", 4.0).await.unwrap();
        assert!(created);

        let agg = catalog.rating_aggregate("Heat").await.unwrap();
        assert_eq!(agg.count, 2);
    }

    #[tokio::test]
    async fn aggregate_rounds_half_away_from_zero_at_tenths() {
        let catalog = catalog().await;
        catalog.create_movie(candidate("Heat", "Crime", "1995-12-15"), None).await.unwrap();

        catalog.submit_rating("Heat", "rater-1", 1.0).await.unwrap();
        catalog.submit_rating("Heat", "rater-2", 2.0).await.unwrap();
        catalog.submit_rating("Heat", "rater-3", 2.0).await.unwrap();

        let agg = catalog.rating_aggregate("Heat").await.unwrap();
        assert_eq!(agg.average, 1.7);
        assert_eq!(agg.count, 3);
    }

    #[tokio::test]
    async fn aggregate_without_ratings_reports_not_found() {
        let catalog = catalog().await;
        catalog.create_movie(candidate("Heat", "Crime", "1995-12-15"), None).await.unwrap();

        let err = catalog.rating_aggregate("Heat").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn rating_an_unknown_movie_reports_not_found() {
        let catalog = catalog().await;
        let err = catalog.submit_rating("Ghost", "rater-1", 3.0).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_enrichment_insert_rolls_back_the_movie() {
        let catalog = catalog().await;
        let db = catalog.db();
        db.execute(Statement::from_string(
            db.get_database_backend(),
            "DROP TABLE box_office".to_string(),
        ))
        .await
        .unwrap();

        let err = catalog
            .create_movie(candidate("Heat", "Crime", "1995-12-15"), Some(enrichment(1, None)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));

        let rows = movie::Entity::find().all(catalog.db()).await.unwrap();
        assert!(rows.is_empty(), "movie insert must not survive the failed transaction");
    }
}
