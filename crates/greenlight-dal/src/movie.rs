use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use futures::TryStreamExt as _;
use garde::Validate;
use greenlight_types::{Runtime, Violations};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow as _, Row};
use tracing::debug;

use crate::{
    error::{Error, Result},
    filters::Filters,
    ChosenRow, Metadata, DEFAULT_QUERY_TIMEOUT,
};

pub const MAX_TITLE_BYTES: usize = 500;
pub const MIN_YEAR: i32 = 1888;
pub const MAX_GENRES: usize = 5;

fn is_zero(v: &i32) -> bool {
    *v == 0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[garde(context(MovieRules))]
pub struct Movie {
    #[garde(skip)]
    pub id: i64,
    #[serde(skip)]
    #[garde(skip)]
    pub created_at: Option<time::PrimitiveDateTime>,
    #[garde(custom(check_title))]
    pub title: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    #[garde(custom(check_year))]
    pub year: i32,
    #[serde(default, skip_serializing_if = "Runtime::is_zero")]
    #[garde(custom(check_runtime))]
    pub runtime: Runtime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[garde(custom(check_genres))]
    pub genres: Vec<String>,
    #[garde(skip)]
    pub version: i64,
}

impl Movie {
    pub fn new(
        title: impl Into<String>,
        year: i32,
        runtime: impl Into<Runtime>,
        genres: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Movie {
            title: title.into(),
            year,
            runtime: runtime.into(),
            genres: genres.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

impl sqlx::FromRow<'_, ChosenRow> for Movie {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        Ok(Movie {
            id: row.try_get("id")?,
            created_at: Some(row.try_get("created_at")?),
            title: row.try_get("title")?,
            year: row.try_get("year")?,
            runtime: Runtime::new(row.try_get("runtime")?),
            genres: row.try_get::<Json<Vec<String>>, _>("genres")?.0,
            version: row.try_get("version")?,
        })
    }
}

/// Reference point for the time dependent movie rules.
#[derive(Debug, Clone)]
pub struct MovieRules {
    pub current_year: i32,
}

impl Default for MovieRules {
    fn default() -> Self {
        MovieRules {
            current_year: time::OffsetDateTime::now_utc().year(),
        }
    }
}

fn check_title(value: &str, _ctx: &MovieRules) -> garde::Result {
    if value.is_empty() {
        Err(garde::Error::new("must be provided"))
    } else if value.len() > MAX_TITLE_BYTES {
        Err(garde::Error::new("must not be more than 500 bytes long"))
    } else {
        Ok(())
    }
}

fn check_year(value: &i32, ctx: &MovieRules) -> garde::Result {
    if *value == 0 {
        Err(garde::Error::new("must be provided"))
    } else if *value < MIN_YEAR {
        Err(garde::Error::new("must be greater than 1888"))
    } else if *value > ctx.current_year {
        Err(garde::Error::new("must not be in the future"))
    } else {
        Ok(())
    }
}

fn check_runtime(value: &Runtime, _ctx: &MovieRules) -> garde::Result {
    if value.is_zero() {
        Err(garde::Error::new("must be provided"))
    } else if value.minutes() < 0 {
        Err(garde::Error::new("must be a positive integer"))
    } else {
        Ok(())
    }
}

fn check_genres(value: &[String], _ctx: &MovieRules) -> garde::Result {
    let unique = value.iter().collect::<HashSet<_>>().len() == value.len();
    if value.is_empty() {
        Err(garde::Error::new("must be provided"))
    } else if value.len() > MAX_GENRES {
        Err(garde::Error::new("must not contain more than 5 genres"))
    } else if !unique {
        Err(garde::Error::new("must not contain duplicate values"))
    } else {
        Ok(())
    }
}

pub fn validate_movie(movie: &Movie) -> Violations {
    validate_movie_with(movie, &MovieRules::default())
}

pub fn validate_movie_with(movie: &Movie, rules: &MovieRules) -> Violations {
    match movie.validate_with(rules) {
        Ok(()) => Violations::new(),
        Err(report) => report.into(),
    }
}

pub type MovieRepository = MovieRepositoryImpl<sqlx::Pool<crate::ChosenDB>>;

pub struct MovieRepositoryImpl<E> {
    executor: E,
    query_timeout: Duration,
}

impl<'c, E> MovieRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, operation).await {
            Ok(res) => Ok(res?),
            Err(_) => {
                debug!("Database operation exceeded {:?}", self.query_timeout);
                Err(Error::Timeout(self.query_timeout))
            }
        }
    }

    /// Stores a validated movie, filling in the store assigned `id`,
    /// `created_at` and initial `version`.
    pub async fn insert(&self, movie: &mut Movie) -> Result<()> {
        const SQL: &str = r#"
        INSERT INTO movies (title, year, runtime, genres)
        VALUES (?, ?, ?, ?)
        RETURNING id, created_at, version
        "#;
        let (id, created_at, version) = self
            .bounded(
                sqlx::query_as::<_, (i64, time::PrimitiveDateTime, i64)>(SQL)
                    .bind(&movie.title)
                    .bind(movie.year)
                    .bind(movie.runtime.minutes())
                    .bind(Json(&movie.genres))
                    .fetch_one(&self.executor),
            )
            .await?;

        movie.id = id;
        movie.created_at = Some(created_at);
        movie.version = version;
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<Movie> {
        const SQL: &str = r#"
        SELECT id, created_at, title, year, runtime, genres, version
        FROM movies
        WHERE id = ?
        "#;
        if id < 1 {
            return Err(Error::RecordNotFound(format!("Movie {id}")));
        }
        self.bounded(
            sqlx::query_as::<_, Movie>(SQL)
                .bind(id)
                .fetch_optional(&self.executor),
        )
        .await?
        .ok_or_else(|| Error::RecordNotFound(format!("Movie {id}")))
    }

    /// Writes the movie back only if the stored version still equals
    /// `movie.version`. On success the bumped version is stored into `movie`
    /// and returned. A missing row and a stale version are both reported as
    /// [`Error::EditConflict`].
    pub async fn update(&self, movie: &mut Movie) -> Result<i64> {
        const SQL: &str = r#"
        UPDATE movies
        SET title = ?, year = ?, runtime = ?, genres = ?, version = version + 1
        WHERE id = ? AND version = ?
        RETURNING version
        "#;
        let new_version = self
            .bounded(
                sqlx::query_scalar::<_, i64>(SQL)
                    .bind(&movie.title)
                    .bind(movie.year)
                    .bind(movie.runtime.minutes())
                    .bind(Json(&movie.genres))
                    .bind(movie.id)
                    .bind(movie.version)
                    .fetch_optional(&self.executor),
            )
            .await?;

        match new_version {
            Some(version) => {
                movie.version = version;
                Ok(version)
            }
            None => {
                debug!(
                    "No movie {} with version {}, reporting edit conflict",
                    movie.id, movie.version
                );
                Err(Error::EditConflict {
                    id: movie.id,
                    version: movie.version,
                })
            }
        }
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if id < 1 {
            return Err(Error::RecordNotFound(format!("Movie {id}")));
        }
        let res = self
            .bounded(
                sqlx::query("DELETE FROM movies WHERE id = ?")
                    .bind(id)
                    .execute(&self.executor),
            )
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound(format!("Movie {id}")))
        } else {
            Ok(())
        }
    }

    /// Lists movies matching every word of `title` (empty matches all) and
    /// carrying all of `genres` (empty matches all), one page at a time.
    ///
    /// The total number of matches is taken from a window aggregate of the
    /// same query, so a page past the end yields empty metadata.
    pub async fn get_all(
        &self,
        title: &str,
        genres: &[String],
        filters: &Filters,
    ) -> Result<(Vec<Movie>, Metadata)> {
        let order = filters.order()?;
        let search = title_search_query(title);
        if search.as_deref() == Some("") {
            debug!("Title query {title:?} has no searchable words");
            return Ok((Vec::new(), Metadata::default()));
        }

        let title_condition = if search.is_some() {
            "AND id IN (SELECT rowid FROM movies_fts WHERE movies_fts MATCH ?)"
        } else {
            ""
        };
        let sql = format!(
            r#"
            SELECT count(*) OVER() AS total_records, id, created_at, title, year, runtime, genres, version
            FROM movies
            WHERE NOT EXISTS (
                SELECT 1 FROM json_each(?) AS wanted
                WHERE wanted.value NOT IN (SELECT value FROM json_each(movies.genres))
            )
            {title_condition}
            ORDER BY {order}, id ASC
            LIMIT ? OFFSET ?
            "#
        );

        let (movies, total_records) = self
            .bounded(async {
                let mut query = sqlx::query(&sql).bind(Json(genres));
                if let Some(search) = &search {
                    query = query.bind(search);
                }
                let mut rows = query
                    .bind(filters.limit())
                    .bind(filters.offset())
                    .fetch(&self.executor);

                let mut movies = Vec::new();
                let mut total_records: i64 = 0;
                while let Some(row) = rows.try_next().await? {
                    if movies.is_empty() {
                        total_records = row.try_get("total_records")?;
                    }
                    movies.push(Movie::from_row(&row)?);
                }
                Ok::<_, sqlx::Error>((movies, total_records))
            })
            .await?;

        let metadata = Metadata::calculate(total_records, filters.page, filters.page_size);
        Ok((movies, metadata))
    }
}

/// Turns free text into an FTS5 query requiring every word.
///
/// `None` for blank input (no title filter). `Some("")` when the input is
/// not blank but contains no word characters, which matches nothing.
fn title_search_query(title: &str) -> Option<String> {
    if title.is_empty() {
        return None;
    }
    let terms = title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| format!("\"{}\"", w))
        .collect::<Vec<_>>();
    Some(terms.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn casablanca() -> Movie {
        Movie::new("Casablanca", 1942, 102, ["drama", "romance", "war"])
    }

    fn rules() -> MovieRules {
        MovieRules { current_year: 2024 }
    }

    #[test]
    fn test_valid_movie() {
        assert!(validate_movie_with(&casablanca(), &rules()).is_empty());
        assert!(validate_movie(&casablanca()).is_empty());
    }

    fn single_violation(movie: Movie, field: &str, message: &str) {
        let violations = validate_movie_with(&movie, &rules());
        assert_eq!(violations.len(), 1, "{violations}");
        assert_eq!(violations.get(field), Some(message));
    }

    #[test]
    fn test_title_rules() {
        let mut movie = casablanca();
        movie.title = String::new();
        single_violation(movie, "title", "must be provided");

        let mut movie = casablanca();
        movie.title = "x".repeat(501);
        single_violation(movie, "title", "must not be more than 500 bytes long");

        // limit is in bytes, not characters
        let mut movie = casablanca();
        movie.title = "é".repeat(251);
        single_violation(movie, "title", "must not be more than 500 bytes long");

        let mut movie = casablanca();
        movie.title = "x".repeat(500);
        assert!(validate_movie_with(&movie, &rules()).is_empty());
    }

    #[test]
    fn test_year_rules() {
        let mut movie = casablanca();
        movie.year = 0;
        single_violation(movie, "year", "must be provided");

        let mut movie = casablanca();
        movie.year = 1887;
        single_violation(movie, "year", "must be greater than 1888");

        let mut movie = casablanca();
        movie.year = 2025;
        single_violation(movie, "year", "must not be in the future");

        let mut movie = casablanca();
        movie.year = 2024;
        assert!(validate_movie_with(&movie, &rules()).is_empty());
    }

    #[test]
    fn test_runtime_rules() {
        let mut movie = casablanca();
        movie.runtime = Runtime::new(0);
        single_violation(movie, "runtime", "must be provided");

        let mut movie = casablanca();
        movie.runtime = Runtime::new(-10);
        single_violation(movie, "runtime", "must be a positive integer");
    }

    #[test]
    fn test_genres_rules() {
        let mut movie = casablanca();
        movie.genres = vec![];
        single_violation(movie, "genres", "must be provided");

        let mut movie = casablanca();
        movie.genres = ["a", "b", "c", "d", "e", "f"].map(String::from).to_vec();
        single_violation(movie, "genres", "must not contain more than 5 genres");

        let mut movie = casablanca();
        movie.genres = ["drama", "war", "drama"].map(String::from).to_vec();
        single_violation(movie, "genres", "must not contain duplicate values");
    }

    #[test]
    fn test_all_rules_evaluated() {
        let movie = Movie::default();
        let violations = validate_movie_with(&movie, &rules());
        assert_eq!(violations.len(), 4);
        for field in ["title", "year", "runtime", "genres"] {
            assert!(violations.contains(field), "missing {field}");
        }
    }

    #[test]
    fn test_movie_json() {
        let mut movie = casablanca();
        movie.id = 1;
        movie.version = 1;
        let json = serde_json::to_value(&movie).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 1,
                "title": "Casablanca",
                "year": 1942,
                "runtime": "102",
                "genres": ["drama", "romance", "war"],
                "version": 1
            })
        );

        let json = serde_json::to_value(Movie::default()).unwrap();
        assert_eq!(json, serde_json::json!({"id": 0, "title": "", "version": 0}));
    }

    #[test]
    fn test_title_search_query() {
        assert_eq!(title_search_query(""), None);
        assert_eq!(
            title_search_query("the Club").as_deref(),
            Some(r#""the" "Club""#)
        );
        assert_eq!(
            title_search_query(r#"club" OR "x"#).as_deref(),
            Some(r#""club" "OR" "x""#)
        );
        assert_eq!(title_search_query(" !? ").as_deref(), Some(""));
    }
}
