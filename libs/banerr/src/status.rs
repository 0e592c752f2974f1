//! Reason-phrase registry for the client/server error range (400-599)

use http::StatusCode;

/// Fallback phrase for codes without a registered reason.
pub const UNKNOWN_ERROR: &str = "Unknown Error";

/// Look up the canonical reason phrase for an HTTP error status.
///
/// Total over all of `u16`: registered codes in the 400-599 range map to
/// their IANA reason phrase, everything else maps to [`UNKNOWN_ERROR`].
#[must_use]
pub fn reason_phrase(status: u16) -> &'static str {
    if !(400..=599).contains(&status) {
        return UNKNOWN_ERROR;
    }
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or(UNKNOWN_ERROR)
}

/// Clamp an arbitrary numeric status into the error range.
///
/// Anything outside 400-599 (including success and redirect codes) becomes
/// 500 Internal Server Error. Construction never fails on bad input.
#[must_use]
pub fn normalize_status(status: u16) -> StatusCode {
    if !(400..=599).contains(&status) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn registered_codes_have_phrases() {
        assert_eq!(reason_phrase(400), "Bad Request");
        assert_eq!(reason_phrase(404), "Not Found");
        assert_eq!(reason_phrase(405), "Method Not Allowed");
        assert_eq!(reason_phrase(418), "I'm a teapot");
        assert_eq!(reason_phrase(500), "Internal Server Error");
        assert_eq!(reason_phrase(511), "Network Authentication Required");
    }

    #[test]
    fn unregistered_in_range_falls_back() {
        assert_eq!(reason_phrase(419), UNKNOWN_ERROR);
        assert_eq!(reason_phrase(599), UNKNOWN_ERROR);
    }

    #[test]
    fn out_of_range_falls_back() {
        assert_eq!(reason_phrase(200), UNKNOWN_ERROR);
        assert_eq!(reason_phrase(302), UNKNOWN_ERROR);
        assert_eq!(reason_phrase(0), UNKNOWN_ERROR);
        assert_eq!(reason_phrase(1000), UNKNOWN_ERROR);
    }

    #[test]
    fn normalize_clamps_to_500() {
        assert_eq!(normalize_status(200), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(normalize_status(399), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(normalize_status(600), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(normalize_status(0), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn normalize_keeps_valid_error_codes() {
        assert_eq!(normalize_status(404), StatusCode::NOT_FOUND);
        assert_eq!(normalize_status(599).as_u16(), 599);
    }
}
