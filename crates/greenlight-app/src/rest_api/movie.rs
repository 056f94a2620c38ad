use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json,
};
use greenlight_dal::movie::{validate_movie, Movie, MovieRepository};
use greenlight_types::{Runtime, Violations};
use http::{header, HeaderMap, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{
    error::{ApiError, ApiResult},
    repository_from_request,
    rest_api::paging::Paging,
    state::AppState,
};

repository_from_request!(MovieRepository);

pub const EXPECTED_VERSION_HEADER: &str = "x-expected-version";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateMovie {
    pub title: String,
    pub year: i32,
    pub runtime: Runtime,
    pub genres: Option<Vec<String>>,
}

/// Partial update, absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateMovie {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime: Option<Runtime>,
    pub genres: Option<Vec<String>>,
}

impl UpdateMovie {
    fn sends_empty_genres(&self) -> bool {
        self.genres.as_ref().is_some_and(Vec::is_empty)
    }

    fn apply(self, movie: &mut Movie) {
        if let Some(title) = self.title {
            movie.title = title;
        }
        if let Some(year) = self.year {
            movie.year = year;
        }
        if let Some(runtime) = self.runtime {
            movie.runtime = runtime;
        }
        if let Some(genres) = self.genres {
            movie.genres = genres;
        }
    }
}

/// Movie rules plus the distinction between omitted and empty `genres`,
/// which is lost once the input becomes a [`Movie`].
fn validate_input(movie: &Movie, sent_empty_genres: bool) -> ApiResult<()> {
    let mut violations = Violations::new();
    if sent_empty_genres {
        violations.add("genres", "must contain at least 1 genre");
    }
    violations.merge(validate_movie(movie));
    violations.into_result()?;
    Ok(())
}

/// Ids that are not positive integers name no resource.
fn read_id(raw: &str) -> ApiResult<i64> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(ApiError::ResourceNotFound(format!("Movie {raw}"))),
    }
}

fn check_expected_version(headers: &HeaderMap, movie: &Movie) -> ApiResult<()> {
    if let Some(expected) = headers.get(EXPECTED_VERSION_HEADER) {
        if expected.to_str().ok() != Some(movie.version.to_string().as_str()) {
            return Err(ApiError::EditConflict(format!(
                "Movie {} is at version {}, client expected {:?}",
                movie.id, movie.version, expected
            )));
        }
    }
    Ok(())
}

pub async fn create(
    repository: MovieRepository,
    payload: Result<Json<CreateMovie>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) = payload?;
    let sent_empty_genres = input.genres.as_ref().is_some_and(Vec::is_empty);
    let mut movie = Movie::new(
        input.title,
        input.year,
        input.runtime,
        input.genres.unwrap_or_default(),
    );
    validate_input(&movie, sent_empty_genres)?;

    repository.insert(&mut movie).await?;
    debug!("Created movie {}", movie.id);

    let location = format!("/v1/movies/{}", movie.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(json!({ "movie": movie })),
    ))
}

pub async fn show(
    Path(id): Path<String>,
    repository: MovieRepository,
) -> ApiResult<impl IntoResponse> {
    let id = read_id(&id)?;
    let movie = repository.get(id).await?;
    Ok(Json(json!({ "movie": movie })))
}

pub async fn update(
    Path(id): Path<String>,
    repository: MovieRepository,
    headers: HeaderMap,
    payload: Result<Json<UpdateMovie>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = read_id(&id)?;
    let mut movie = repository.get(id).await?;
    check_expected_version(&headers, &movie)?;

    let Json(input) = payload?;
    let sent_empty_genres = input.sends_empty_genres();
    input.apply(&mut movie);
    validate_input(&movie, sent_empty_genres)?;

    repository.update(&mut movie).await?;
    Ok(Json(json!({ "movie": movie })))
}

pub async fn delete(
    Path(id): Path<String>,
    repository: MovieRepository,
) -> ApiResult<impl IntoResponse> {
    let id = read_id(&id)?;
    repository.delete(id).await?;
    Ok(Json(json!({ "message": "movie successfully deleted" })))
}

pub async fn list(
    repository: MovieRepository,
    State(state): State<AppState>,
    paging: Result<Query<Paging>, axum::extract::rejection::QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(paging) = paging?;
    let config = state.config();
    let listing = paging.into_listing(config.default_page_size, config.sort_safelist.clone())?;

    let (movies, metadata) = repository
        .get_all(&listing.title, &listing.genres, &listing.filters)
        .await?;
    Ok(Json(json!({ "movies": movies, "metadata": metadata })))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).patch(update).delete(delete))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_id() {
        assert_eq!(read_id("42").unwrap(), 42);
        for raw in ["0", "-1", "abc", "1.5", ""] {
            assert!(matches!(read_id(raw), Err(ApiError::ResourceNotFound(_))));
        }
    }

    #[test]
    fn test_apply_partial_update() {
        let mut movie = Movie::new("Casablanca", 1942, 102, ["drama", "romance", "war"]);
        let input: UpdateMovie = serde_json::from_str(r#"{"year": 1943}"#).unwrap();
        input.apply(&mut movie);
        assert_eq!(movie.year, 1943);
        assert_eq!(movie.title, "Casablanca");
        assert_eq!(movie.runtime, Runtime::new(102));

        let input: UpdateMovie =
            serde_json::from_str(r#"{"runtime": "105", "genres": ["drama"]}"#).unwrap();
        input.apply(&mut movie);
        assert_eq!(movie.runtime, Runtime::new(105));
        assert_eq!(movie.genres, ["drama"]);
    }

    #[test]
    fn test_empty_genres_message() {
        let mut movie = Movie::new("Casablanca", 1942, 102, Vec::<String>::new());
        let Err(ApiError::ValidationFailed(violations)) = validate_input(&movie, false) else {
            panic!("missing genres must fail");
        };
        assert_eq!(violations.get("genres"), Some("must be provided"));

        let Err(ApiError::ValidationFailed(violations)) = validate_input(&movie, true) else {
            panic!("empty genres must fail");
        };
        assert_eq!(violations.len(), 1);
        assert_eq!(violations.get("genres"), Some("must contain at least 1 genre"));

        movie.genres = vec!["drama".to_string()];
        assert!(validate_input(&movie, false).is_ok());

        let input: UpdateMovie = serde_json::from_str(r#"{"genres": []}"#).unwrap();
        assert!(input.sends_empty_genres());
        let input: UpdateMovie = serde_json::from_str(r#"{"year": 1943}"#).unwrap();
        assert!(!input.sends_empty_genres());
    }

    #[test]
    fn test_reject_unknown_fields() {
        assert!(serde_json::from_str::<CreateMovie>(r#"{"title": "x", "rating": 5}"#).is_err());
        assert!(serde_json::from_str::<UpdateMovie>(r#"{"id": 5}"#).is_err());
        assert!(serde_json::from_str::<CreateMovie>(r#"{"runtime": 102}"#).is_err());
    }

    #[test]
    fn test_expected_version() {
        let mut movie = Movie::new("Casablanca", 1942, 102, ["drama"]);
        movie.id = 1;
        movie.version = 2;

        let mut headers = HeaderMap::new();
        assert!(check_expected_version(&headers, &movie).is_ok());
        headers.insert(EXPECTED_VERSION_HEADER, "2".parse().unwrap());
        assert!(check_expected_version(&headers, &movie).is_ok());
        headers.insert(EXPECTED_VERSION_HEADER, "1".parse().unwrap());
        assert!(matches!(
            check_expected_version(&headers, &movie),
            Err(ApiError::EditConflict(_))
        ));
    }
}
