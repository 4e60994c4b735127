//! Route methods.

use std::fmt;
use std::str::FromStr;

use crate::error::RouteError;

/// The method a route is registered for.
///
/// [`Method::All`] binds every request method that has no specific
/// registration on the same path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    /// Any method without a specific binding.
    All,
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `PATCH`
    Patch,
    /// `OPTIONS`
    Options,
    /// `HEAD`
    Head,
}

impl Method {
    /// Every method, `All` first.
    pub const VARIANTS: [Method; 8] = [
        Self::All,
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Delete,
        Self::Patch,
        Self::Options,
        Self::Head,
    ];

    /// Returns the upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
        }
    }

    /// Maps a request method. Methods outside the supported set map to `None`.
    #[must_use]
    pub fn from_http(method: &http::Method) -> Option<Self> {
        match *method {
            http::Method::GET => Some(Self::Get),
            http::Method::POST => Some(Self::Post),
            http::Method::PUT => Some(Self::Put),
            http::Method::DELETE => Some(Self::Delete),
            http::Method::PATCH => Some(Self::Patch),
            http::Method::OPTIONS => Some(Self::Options),
            http::Method::HEAD => Some(Self::Head),
            _ => None,
        }
    }

    /// Returns the concrete request method, or `None` for `All`.
    #[must_use]
    pub fn to_http(self) -> Option<http::Method> {
        match self {
            Self::All => None,
            Self::Get => Some(http::Method::GET),
            Self::Post => Some(http::Method::POST),
            Self::Put => Some(http::Method::PUT),
            Self::Delete => Some(http::Method::DELETE),
            Self::Patch => Some(http::Method::PATCH),
            Self::Options => Some(http::Method::OPTIONS),
            Self::Head => Some(http::Method::HEAD),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::VARIANTS
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| RouteError::UnknownMethod(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("All".parse::<Method>().unwrap(), Method::All);
        assert!(matches!(
            "TRACE".parse::<Method>(),
            Err(RouteError::UnknownMethod(m)) if m == "TRACE"
        ));
    }

    #[test]
    fn test_http_mapping() {
        assert_eq!(Method::from_http(&http::Method::PATCH), Some(Method::Patch));
        assert_eq!(Method::from_http(&http::Method::TRACE), None);
        assert_eq!(Method::All.to_http(), None);
        assert_eq!(Method::Head.to_http(), Some(http::Method::HEAD));
    }
}
