use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    AppState,
    error::AppResult,
    extract::{AppJson, AppPath, AppQuery},
    models::{DirectorView, GenreView, MovieFilter, MovieView, NameInput, NamePatch},
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/movies/", get(list_movies))
        .route("/movies/{id}", get(get_movie))
        .route("/directors/", get(list_directors).post(create_director))
        .route(
            "/directors/{id}",
            get(get_director).put(replace_director).patch(patch_director).delete(delete_director),
        )
        .route("/genres/", get(list_genres).post(create_genre))
        .route(
            "/genres/{id}",
            get(get_genre).put(replace_genre).patch(patch_genre).delete(delete_genre),
        )
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http())
}

pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    AppQuery(filter): AppQuery<MovieFilter>,
) -> AppResult<Json<Vec<MovieView>>> {
    let movies = state.catalog.list_movies(filter).await?;
    Ok(Json(movies.into_iter().map(MovieView::from).collect()))
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<MovieView>> {
    Ok(Json(state.catalog.get_movie(id).await?.into()))
}

pub async fn list_directors(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<DirectorView>>> {
    let directors = state.catalog.list_directors().await?;
    Ok(Json(directors.into_iter().map(DirectorView::from).collect()))
}

pub async fn get_director(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<DirectorView>> {
    Ok(Json(state.catalog.get_director(id).await?.into()))
}

pub async fn create_director(
    State(state): State<Arc<AppState>>,
    AppJson(input): AppJson<NameInput>,
) -> AppResult<StatusCode> {
    state.catalog.create_director(input.name).await?;
    Ok(StatusCode::CREATED)
}

pub async fn replace_director(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i32>,
    AppJson(input): AppJson<NameInput>,
) -> AppResult<StatusCode> {
    state.catalog.replace_director(id, input.name).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn patch_director(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i32>,
    AppJson(patch): AppJson<NamePatch>,
) -> AppResult<StatusCode> {
    state.catalog.patch_director(id, &patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_director(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i32>,
) -> AppResult<StatusCode> {
    state.catalog.delete_director(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_genres(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<GenreView>>> {
    let genres = state.catalog.list_genres().await?;
    Ok(Json(genres.into_iter().map(GenreView::from).collect()))
}

pub async fn get_genre(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<GenreView>> {
    Ok(Json(state.catalog.get_genre(id).await?.into()))
}

pub async fn create_genre(
    State(state): State<Arc<AppState>>,
    AppJson(input): AppJson<NameInput>,
) -> AppResult<StatusCode> {
    state.catalog.create_genre(input.name).await?;
    Ok(StatusCode::CREATED)
}

pub async fn replace_genre(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i32>,
    AppJson(input): AppJson<NameInput>,
) -> AppResult<StatusCode> {
    state.catalog.replace_genre(id, input.name).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn patch_genre(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i32>,
    AppJson(patch): AppJson<NamePatch>,
) -> AppResult<StatusCode> {
    state.catalog.patch_genre(id, &patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_genre(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i32>,
) -> AppResult<StatusCode> {
    state.catalog.delete_genre(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, header},
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        catalog::Catalog,
        db::testing::{memory_catalog, seed_movie},
    };

    async fn app() -> (Router, Catalog) {
        let catalog = memory_catalog().await;
        let state = Arc::new(AppState { catalog: catalog.clone() });
        (router(state), catalog)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            },
            None => Body::empty(),
        };

        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let (status, body) = send(app, Method::GET, uri, None).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn post_director_returns_created_with_empty_body() {
        let (app, _) = app().await;

        let (status, body) =
            send(&app, Method::POST, "/directors/", Some(json!({"name": "Nolan"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body.is_empty());

        let (status, director) = get_json(&app, "/directors/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(director, json!({"id": 1, "name": "Nolan"}));
    }

    #[tokio::test]
    async fn movies_filtered_by_new_director() {
        let (app, catalog) = app().await;
        send(&app, Method::POST, "/directors/", Some(json!({"name": "Nolan"}))).await;
        seed_movie(catalog.db(), "Memento", Some(1), Some(1)).await;
        seed_movie(catalog.db(), "Heat", Some(1), Some(2)).await;

        let (status, movies) = get_json(&app, "/movies/?director_id=1").await;
        assert_eq!(status, StatusCode::OK);
        let movies = movies.as_array().unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0]["title"], "Memento");
        assert_eq!(movies[0]["director_id"], 1);
    }

    #[tokio::test]
    async fn movie_filters_combine() {
        let (app, catalog) = app().await;
        seed_movie(catalog.db(), "A", Some(1), Some(2)).await;
        seed_movie(catalog.db(), "B", Some(1), Some(3)).await;
        seed_movie(catalog.db(), "C", Some(4), Some(2)).await;

        let titles = |v: Value| -> Vec<String> {
            v.as_array()
                .unwrap()
                .iter()
                .map(|m| m["title"].as_str().unwrap().to_string())
                .collect()
        };

        let (_, both) = get_json(&app, "/movies/?genre_id=1&director_id=2").await;
        assert_eq!(titles(both), ["A"]);

        let (_, genre_only) = get_json(&app, "/movies/?genre_id=1").await;
        assert_eq!(titles(genre_only), ["A", "B"]);

        let (_, unfiltered) = get_json(&app, "/movies/?genre_id=&director_id=").await;
        assert_eq!(titles(unfiltered), ["A", "B", "C"]);

        let (status, _) = send(&app, Method::GET, "/movies/?genre_id=comedy", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_movie_by_id() {
        let (app, catalog) = app().await;
        let movie = seed_movie(catalog.db(), "Solaris", None, Some(7)).await;

        let (status, body) = get_json(&app, &format!("/movies/{}", movie.id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Solaris");
        assert_eq!(body["year"], 2010);
        assert_eq!(body["rating"], 8.5);
        assert!(body["genre_id"].is_null());
        assert_eq!(body["director_id"], 7);
        assert!(body.get("director").is_none());

        let (status, body) = get_json(&app, "/movies/404").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn put_director_persists_or_fails() {
        let (app, catalog) = app().await;
        let director = catalog.create_director("Nolan".into()).await.unwrap();

        let uri = format!("/directors/{}", director.id);
        let (status, body) = send(&app, Method::PUT, &uri, Some(json!({"name": "X"}))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
        assert_eq!(catalog.get_director(director.id).await.unwrap().name, "X");

        let (status, _) =
            send(&app, Method::PUT, "/directors/999", Some(json!({"name": "X"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::PUT, &uri, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn patch_director_without_name_keeps_it() {
        let (app, catalog) = app().await;
        let director = catalog.create_director("Nolan".into()).await.unwrap();
        let uri = format!("/directors/{}", director.id);

        let (status, _) = send(&app, Method::PATCH, &uri, Some(json!({}))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(catalog.get_director(director.id).await.unwrap().name, "Nolan");

        let (status, _) = send(&app, Method::PATCH, &uri, Some(json!({"name": ""}))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(catalog.get_director(director.id).await.unwrap().name, "Nolan");

        let (status, _) = send(&app, Method::PATCH, &uri, Some(json!({"name": "Kubrick"}))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(catalog.get_director(director.id).await.unwrap().name, "Kubrick");

        let (status, _) =
            send(&app, Method::PATCH, "/directors/999", Some(json!({"name": "Kubrick"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_genre_leaves_movies_with_dangling_id() {
        let (app, catalog) = app().await;
        let genre = catalog.create_genre("Horror".into()).await.unwrap();
        seed_movie(catalog.db(), "The Thing", Some(genre.id), None).await;

        let uri = format!("/genres/{}", genre.id);
        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());

        let (status, _) = get_json(&app, &uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, movies) = get_json(&app, &format!("/movies/?genre_id={}", genre.id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(movies[0]["genre_id"], genre.id);

        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn genre_crud_round() {
        let (app, _) = app().await;

        let (status, _) =
            send(&app, Method::POST, "/genres/", Some(json!({"name": "Drama"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        send(&app, Method::POST, "/genres/", Some(json!({"name": "Комедия"}))).await;

        let (_, genres) = get_json(&app, "/genres/").await;
        assert_eq!(genres, json!([{"id": 1, "name": "Drama"}, {"id": 2, "name": "Комедия"}]));

        let (status, _) =
            send(&app, Method::PATCH, "/genres/1", Some(json!({"name": "Melodrama"}))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) =
            send(&app, Method::PUT, "/genres/2", Some(json!({"name": "Comedy"}))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, genres) = get_json(&app, "/genres/").await;
        assert_eq!(genres, json!([{"id": 1, "name": "Melodrama"}, {"id": 2, "name": "Comedy"}]));
    }

    #[tokio::test]
    async fn malformed_bodies_are_bad_requests() {
        let (app, _) = app().await;

        let (status, body) =
            send(&app, Method::POST, "/directors/", Some(json!({"name": "Nolan", "id": 3}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["code"], "malformed");

        let (status, _) = send(&app, Method::POST, "/genres/", Some(json!({"title": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::POST, "/genres/", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::DELETE, "/genres/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, directors) = get_json(&app, "/directors/").await;
        assert_eq!(directors, json!([]));
    }
}
