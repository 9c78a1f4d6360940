//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3.0 document for the Lookalike API.

use utoipa::OpenApi;

use crate::handlers::{
    CompareResponse, HealthResponse, MatchHit, ReadyResponse, UploadResponse,
};

/// Lookalike API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lookalike - Image Matching API",
        version = "0.1.0",
        description = r#"
## Perceptual-Hash Image Matching API

Lookalike finds images in a reference catalog that match, resemble, or are
contained in a submitted image.

### How It Works

1. Reference images in `ourImages/` are indexed at startup
2. **Upload** more images via `POST /upload`
3. **Compare** any image via `POST /compare`
4. Each comparison is classified as `exact`, `similar`, `partial` or `none`

Images are fingerprinted with a 256-bit block-mean-value hash of a 64×64
grayscale thumbnail. Similarity is the share of matching hex symbols.
When the whole image matches nothing, overlapping 64×64 crops are tried.
"#,
        license(
            name = "MIT OR Apache-2.0",
            url = "https://github.com/ArthurDEV44/lookalike/blob/main/LICENSE"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Catalog", description = "Add images to the reference catalog"),
        (name = "Matching", description = "Search the catalog for similar images"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::upload::upload_handler,
        crate::handlers::compare::compare_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            UploadResponse,
            CompareResponse,
            MatchHit,
        )
    )
)]
pub struct ApiDoc;
