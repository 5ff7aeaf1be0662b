//! Well-known header names (RFC 2616 §14) grouped the way the RFC groups them,
//! plus the `Response-Needed` extension header.

pub mod request {
    pub const ACCEPT: &str = "Accept";
    pub const ACCEPT_ENCODING: &str = "Accept-Encoding";
    pub const ACCEPT_LANGUAGE: &str = "Accept-Language";
    pub const AUTHORIZATION: &str = "Authorization";
    pub const COOKIE: &str = "Cookie";
    pub const COOKIE2: &str = "Cookie2";
    pub const EXPECT: &str = "Expect";
    pub const FROM: &str = "From";
    pub const HOST: &str = "Host";
    pub const IF_MATCH: &str = "If-Match";
    pub const IF_MODIFIED_SINCE: &str = "If-Modified-Since";
    pub const IF_NONE_MATCH: &str = "If-None-Match";
    pub const IF_RANGE: &str = "If-Range";
    pub const IF_UNMODIFIED_SINCE: &str = "If-Unmodified-Since";
    pub const MAX_FORWARDS: &str = "Max-Forwards";
    pub const PROXY_AUTHORIZATION: &str = "Proxy-Authorization";
    pub const RANGE: &str = "Range";
    pub const REFERER: &str = "Referer";
    pub const TE: &str = "TE";
    pub const USER_AGENT: &str = "User-Agent";

    pub const ALL: &[&str] = &[
        ACCEPT,
        ACCEPT_ENCODING,
        ACCEPT_LANGUAGE,
        AUTHORIZATION,
        COOKIE,
        COOKIE2,
        EXPECT,
        FROM,
        HOST,
        IF_MATCH,
        IF_MODIFIED_SINCE,
        IF_NONE_MATCH,
        IF_RANGE,
        IF_UNMODIFIED_SINCE,
        MAX_FORWARDS,
        PROXY_AUTHORIZATION,
        RANGE,
        REFERER,
        TE,
        USER_AGENT,
    ];
}

pub mod response {
    pub const ACCEPT_RANGES: &str = "Accept-Ranges";
    pub const AGE: &str = "Age";
    pub const SET_COOKIE: &str = "Set-Cookie";
    pub const SET_COOKIE2: &str = "Set-Cookie2";
    pub const ETAG: &str = "ETag";
    pub const LOCATION: &str = "Location";
    pub const PROXY_AUTHENTICATE: &str = "Proxy-Authenticate";
    pub const RETRY_AFTER: &str = "Retry-After";
    pub const SERVER: &str = "Server";
    pub const VARY: &str = "Vary";
    pub const WWW_AUTHENTICATE: &str = "WWW-Authenticate";

    pub const ALL: &[&str] = &[
        ACCEPT_RANGES,
        AGE,
        SET_COOKIE,
        SET_COOKIE2,
        ETAG,
        LOCATION,
        PROXY_AUTHENTICATE,
        RETRY_AFTER,
        SERVER,
        VARY,
        WWW_AUTHENTICATE,
    ];
}

pub mod general {
    pub const CACHE_CONTROL: &str = "Cache-Control";
    pub const CONNECTION: &str = "Connection";
    pub const DATE: &str = "Date";
    pub const PRAGMA: &str = "Pragma";
    pub const PROXY_CONNECTION: &str = "Proxy-Connection";
    pub const TRAILER: &str = "Trailer";
    pub const TRANSFER_ENCODING: &str = "Transfer-Encoding";
    pub const UPGRADE: &str = "Upgrade";
    pub const VIA: &str = "Via";
    pub const WARNING: &str = "Warning";
    /// Lets a client tell the server that no reply is wanted.
    pub const RESPONSE_NEEDED: &str = "Response-Needed";

    pub const ALL: &[&str] = &[
        CACHE_CONTROL,
        CONNECTION,
        DATE,
        PRAGMA,
        PROXY_CONNECTION,
        TRAILER,
        TRANSFER_ENCODING,
        UPGRADE,
        VIA,
        WARNING,
        RESPONSE_NEEDED,
    ];
}

pub mod entity {
    pub const ALLOW: &str = "Allow";
    pub const CONTENT_ENCODING: &str = "Content-Encoding";
    pub const CONTENT_LANGUAGE: &str = "Content-Language";
    pub const CONTENT_LENGTH: &str = "Content-Length";
    pub const CONTENT_LOCATION: &str = "Content-Location";
    pub const CONTENT_RANGE: &str = "Content-Range";
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const EXPIRES: &str = "Expires";
    pub const LAST_MODIFIED: &str = "Last-Modified";

    pub const ALL: &[&str] = &[
        ALLOW,
        CONTENT_ENCODING,
        CONTENT_LANGUAGE,
        CONTENT_LENGTH,
        CONTENT_LOCATION,
        CONTENT_RANGE,
        CONTENT_TYPE,
        EXPIRES,
        LAST_MODIFIED,
    ];
}

/// Transfer-coding names.
pub mod transfer_encoding {
    pub const CHUNKED: &str = "chunked";
    pub const IDENTITY: &str = "identity";
    pub const GZIP: &str = "gzip";
    pub const COMPRESS: &str = "compress";
    pub const DEFLATE: &str = "deflate";
}

/// Returns `true` when `name` appears in any of the well-known tables.
pub fn is_known(name: &str) -> bool {
    [request::ALL, response::ALL, general::ALL, entity::ALL]
        .iter()
        .flat_map(|table| table.iter())
        .any(|known| known.eq_ignore_ascii_case(name))
}
