use axum::{
    extract::Path,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use include_dir::{Dir, include_dir};
use mime_guess::from_path;

pub static ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/assets");

/// Route prefix the assets are mounted under
pub const STATIC_PREFIX: &str = "/static";

/// Look up an embedded file by its path relative to the assets root
pub fn get(path: &str) -> Option<&'static [u8]> {
    ASSETS
        .get_file(path.trim_start_matches('/'))
        .map(|file| file.contents())
}

/// Every embedded file as `(relative path, contents)`
pub fn files() -> impl Iterator<Item = (&'static str, &'static [u8])> {
    ASSETS
        .files()
        .filter_map(|file| file.path().to_str().map(|path| (path, file.contents())))
}

/// Handler for `GET /static/{*path}`
pub async fn serve_static(Path(path): Path<String>) -> Response {
    match ASSETS.get_file(path.trim_start_matches('/')) {
        Some(file) => {
            let mime = from_path(file.path()).first_or_octet_stream();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.to_string()),
                    (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
                ],
                file.contents(),
            )
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
