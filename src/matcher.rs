use http::Method;
use std::fmt;

///
/// The single method and path a responder answers on.
///
#[derive(Clone, PartialEq, Debug)]
pub(crate) struct Route {
    method: Method,
    path: String,
}

///
/// Why a request was turned away by a `Route`.
///
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Rejection {
    /// The path is not the configured one, whatever the method
    PathNotFound,
    /// The path is right but the method isn't
    MethodNotAllowed,
}

impl Route {
    pub(crate) fn new(method: Method, path: impl Into<String>) -> Self {
        Route {
            method,
            path: path.into(),
        }
    }

    pub(crate) fn method(&self) -> &Method {
        &self.method
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    ///
    /// Paths are compared exactly, without the query. Methods are compared
    /// ignoring the letter case.
    ///
    pub(crate) fn check(&self, method: &str, path_and_query: &str) -> Result<(), Rejection> {
        let path = path_and_query
            .split_once('?')
            .map_or(path_and_query, |(path, _)| path);

        if path != self.path {
            Err(Rejection::PathNotFound)
        } else if !method.eq_ignore_ascii_case(self.method.as_str()) {
            Err(Rejection::MethodNotAllowed)
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_method_and_path() {
        let route = Route::new(Method::GET, "/hello");

        assert_eq!(Ok(()), route.check("GET", "/hello"));
    }

    #[test]
    fn test_ignores_the_query() {
        let route = Route::new(Method::GET, "/hello");

        assert_eq!(Ok(()), route.check("GET", "/hello?foo=bar"));
        assert_eq!(Ok(()), route.check("GET", "/hello?"));
    }

    #[test]
    fn test_method_letter_case_is_ignored() {
        let route = Route::new(Method::POST, "/");

        assert_eq!(Ok(()), route.check("post", "/"));
    }

    #[test]
    fn test_path_is_case_sensitive() {
        let route = Route::new(Method::GET, "/hello");

        assert_eq!(Err(Rejection::PathNotFound), route.check("GET", "/Hello"));
        assert_eq!(Err(Rejection::PathNotFound), route.check("GET", "/hello/"));
    }

    #[test]
    fn test_unknown_path_wins_over_wrong_method() {
        let route = Route::new(Method::GET, "/does/exist");

        assert_eq!(Err(Rejection::PathNotFound), route.check("POST", "/doesnt/exist"));
    }

    #[test]
    fn test_wrong_method_on_known_path() {
        let route = Route::new(Method::GET, "/does/exist");

        assert_eq!(Err(Rejection::MethodNotAllowed), route.check("POST", "/does/exist"));
    }

    #[test]
    fn test_display() {
        let route = Route::new(Method::PUT, "/a/b");

        assert_eq!("PUT /a/b", route.to_string());
    }
}
