//! CORS layer, grounded on the teacher's `api/middleware/cors.rs`.

use tower_http::cors::CorsLayer;

pub fn cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_layer_builds_without_panic() {
        let _ = cors_layer();
    }
}
