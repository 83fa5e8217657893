use axum::extract::Path;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use rust_embed::Embed;

/// Stylesheets and images compiled into the binary.
#[derive(Embed)]
#[folder = "assets/"]
struct SiteAssets;

fn etag(hash: [u8; 32]) -> String {
    let hex: String = hash[..8].iter().map(|b| format!("{:02x}", b)).collect();
    format!("\"{}\"", hex)
}

pub async fn serve(Path(path): Path<String>, headers: HeaderMap) -> Response {
    let Some(file) = SiteAssets::get(&path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let tag = etag(file.metadata.sha256_hash());
    let unchanged = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == tag);
    if unchanged {
        return (StatusCode::NOT_MODIFIED, [(header::ETAG, tag)]).into_response();
    }

    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                mime_guess::from_path(&path)
                    .first_or_octet_stream()
                    .to_string(),
            ),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
            (header::ETAG, tag),
        ],
        file.data.into_owned(),
    )
        .into_response()
}
