//! Request classification.
//!
//! Exclusion runs first: non-GET methods and extension-scheme URLs are never
//! intercepted. Everything else maps to one strategy or falls through to the
//! platform's own network handling.

use folio_core::url::is_extension_url;
use folio_core::{Destination, Request, RequestMode};
use url::Url;

/// Image extensions served cache-first, matched case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "svg", "webp"];

/// Strategy selected for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Non-GET or extension origin, left untouched.
    Excluded,
    /// Network first with preload, falling back to cache then offline page.
    Navigation,
    /// Cache first.
    Image,
    /// Stale-while-revalidate for scripts, styles and fonts.
    Asset,
    /// No rule matched. Not intercepted.
    Unmatched,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Excluded => "excluded",
            Route::Navigation => "navigation",
            Route::Image => "image",
            Route::Asset => "asset",
            Route::Unmatched => "unmatched",
        }
    }
}

/// Whether the request is kept away from every strategy.
pub fn is_excluded(request: &Request) -> bool {
    !request.is_get() || is_extension_url(&request.url)
}

/// Pick the strategy for an intercepted request.
pub fn route(request: &Request, font_cdn: &Url) -> Route {
    if is_excluded(request) {
        return Route::Excluded;
    }
    classify(request, font_cdn)
}

/// Classify a request that already passed exclusion.
pub fn classify(request: &Request, font_cdn: &Url) -> Route {
    if request.mode == RequestMode::Navigate {
        return Route::Navigation;
    }

    if request.destination == Destination::Image || has_image_extension(request.url.path()) {
        return Route::Image;
    }

    if matches!(request.destination, Destination::Style | Destination::Script | Destination::Font)
        || request.url.origin() == font_cdn.origin()
    {
        return Route::Asset;
    }

    Route::Unmatched
}

fn has_image_extension(path: &str) -> bool {
    match path.rsplit_once('.') {
        Some((_, ext)) if !ext.contains('/') => IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)),
        _ => false,
    }
}
