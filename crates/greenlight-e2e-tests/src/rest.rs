use anyhow::{anyhow, Result};
use greenlight_dal::{movie::Movie, Metadata};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct MovieEnvelope {
    pub movie: Movie,
}

#[derive(Debug, Deserialize)]
pub struct MovieList {
    pub movies: Vec<Movie>,
    pub metadata: Metadata,
}

pub fn movie_payload(title: &str, year: i32, runtime: i32, genres: &[&str]) -> serde_json::Value {
    json!({
        "title": title,
        "year": year,
        "runtime": runtime.to_string(),
        "genres": genres,
    })
}

pub async fn create_movie<T>(client: &reqwest::Client, base_url: &Url, payload: &T) -> Result<Movie>
where
    T: serde::Serialize,
{
    let api_url = base_url.join("v1/movies")?;

    let response = client.post(api_url).json(payload).send().await?;
    info!("Response: {:#?}", response);
    if response.status() != StatusCode::CREATED {
        return Err(anyhow!("Unexpected status {}", response.status()));
    }
    let envelope: MovieEnvelope = response.json().await?;
    Ok(envelope.movie)
}
