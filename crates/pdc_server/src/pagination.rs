//! Page-number pagination over list results.
//!
//! `page` is 1-based; `page_size=-1` turns pagination off and returns the
//! bare list. The page window is resolved from the query first so the store
//! only loads the rows it returns.

use axum::http::Uri;
use pdc_core::error::PdcError;
use pdc_core::filter::QueryParams;
use pdc_core::page::{Page, Paged};
use serde::Serialize;
use url::{form_urlencoded, Url};

#[derive(Debug, Clone)]
pub struct PageConfig {
    pub page_size: usize,
    pub max_page_size: usize,
    /// Base for absolute `next`/`previous` links; relative links otherwise.
    pub public_url: Option<Url>,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_page_size: 100,
            public_url: None,
        }
    }
}

/// Decode a raw query string into ordered pairs.
pub fn query_params(raw: Option<&str>) -> QueryParams {
    let pairs = raw
        .map(|q| {
            form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default();
    QueryParams::new(pairs)
}

fn invalid_page() -> PdcError {
    PdcError::NotFound("Invalid page.".into())
}

fn link(uri: &Uri, params: &QueryParams, page: usize, config: &PageConfig) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params.pairs().filter(|(k, _)| *k != "page") {
        query.append_pair(key, value);
    }
    if page > 1 {
        query.append_pair("page", &page.to_string());
    }
    let query = query.finish();

    if let Some(base) = &config.public_url {
        if let Ok(mut url) = base.join(uri.path()) {
            url.set_query((!query.is_empty()).then_some(query.as_str()));
            return url.to_string();
        }
    }
    if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{query}", uri.path())
    }
}

/// What a list request asks for, read before the store is queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// `page_size=-1`
    Unpaginated,
    Numbered { number: usize, size: usize },
}

impl PageRequest {
    pub fn from_query(params: &QueryParams, config: &PageConfig) -> Result<Self, PdcError> {
        let size = match params.first("page_size") {
            Some("-1") => return Ok(Self::Unpaginated),
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n.min(config.max_page_size),
                _ => config.page_size,
            },
            None => config.page_size,
        };
        let number = match params.first("page") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(invalid_page)?,
            None => 1,
        };
        Ok(Self::Numbered { number, size })
    }

    /// Window handed to the store; `None` fetches the whole list.
    pub fn window(&self) -> Option<Page> {
        match *self {
            Self::Unpaginated => None,
            Self::Numbered { number, size } => Some(Page::numbered(number, size)),
        }
    }
}

/// A list response: the paginated envelope or, with `page_size=-1`, the
/// bare list.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Page(PageBody<T>),
    All(Vec<T>),
}

#[derive(Debug, Serialize)]
pub struct PageBody<T> {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Wrap the window the store returned in the paginated envelope.
pub fn paginate<T>(
    paged: Paged<T>,
    request: PageRequest,
    params: &QueryParams,
    uri: &Uri,
    config: &PageConfig,
) -> Result<Listing<T>, PdcError> {
    let PageRequest::Numbered { number, size } = request else {
        return Ok(Listing::All(paged.items));
    };
    let pages = paged.count.div_ceil(size).max(1);
    if number > pages {
        return Err(invalid_page());
    }
    Ok(Listing::Page(PageBody {
        count: paged.count,
        next: (number < pages).then(|| link(uri, params, number + 1, config)),
        previous: (number > 1).then(|| link(uri, params, number - 1, config)),
        results: paged.items,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn list(
        items: Vec<usize>,
        query: &str,
        uri: &str,
        config: &PageConfig,
    ) -> Result<Value, PdcError> {
        let uri: Uri = uri.parse().unwrap();
        let params = query_params(Some(query));
        let request = PageRequest::from_query(&params, config)?;
        let paged = Paged::slice(items, request.window());
        let listing = paginate(paged, request, &params, &uri, config)?;
        Ok(serde_json::to_value(listing).unwrap())
    }

    fn run(n: usize, query: &str) -> Result<Value, PdcError> {
        let uri = format!("/rest_api/v1/arches/?{query}");
        list((0..n).collect(), query, &uri, &PageConfig::default())
    }

    #[test]
    fn first_page_links_forward() {
        let body = run(45, "").unwrap();
        assert_eq!(body["count"], json!(45));
        assert_eq!(body["results"].as_array().unwrap().len(), 20);
        assert_eq!(body["next"], json!("/rest_api/v1/arches/?page=2"));
        assert_eq!(body["previous"], Value::Null);
    }

    #[test]
    fn previous_of_second_page_drops_page_param() {
        let body = run(45, "name=x&page=2").unwrap();
        assert_eq!(body["previous"], json!("/rest_api/v1/arches/?name=x"));
        assert_eq!(body["next"], json!("/rest_api/v1/arches/?name=x&page=3"));
        assert_eq!(body["results"][0], json!(20));
    }

    #[test]
    fn page_size_is_capped_and_can_be_disabled() {
        let body = run(150, "page_size=500").unwrap();
        assert_eq!(body["results"].as_array().unwrap().len(), 100);

        let body = run(150, "page_size=-1").unwrap();
        assert_eq!(body.as_array().unwrap().len(), 150);
    }

    #[test]
    fn store_window_follows_page_params() {
        let config = PageConfig::default();
        let params = query_params(Some("page=3&page_size=10"));
        let request = PageRequest::from_query(&params, &config).unwrap();
        assert_eq!(request.window(), Some(Page { offset: 20, limit: 10 }));

        let params = query_params(Some("page_size=-1&page=zero"));
        let request = PageRequest::from_query(&params, &config).unwrap();
        assert_eq!(request, PageRequest::Unpaginated);
        assert_eq!(request.window(), None);
    }

    #[test]
    fn page_past_the_end_is_not_found() {
        assert_eq!(run(5, "page=2").unwrap_err().http_status(), 404);
        assert_eq!(run(5, "page=zero").unwrap_err().http_status(), 404);
        assert!(run(0, "page=1").is_ok());
    }

    #[test]
    fn envelope_keeps_declared_key_order() {
        let uri: Uri = "/rest_api/v1/arches/".parse().unwrap();
        let params = query_params(None);
        let request = PageRequest::from_query(&params, &PageConfig::default()).unwrap();
        let listing = paginate(
            Paged::slice(vec![1, 2], request.window()),
            request,
            &params,
            &uri,
            &PageConfig::default(),
        )
        .unwrap();
        assert_eq!(
            serde_json::to_string(&listing).unwrap(),
            r#"{"count":2,"next":null,"previous":null,"results":[1,2]}"#
        );
    }

    #[test]
    fn absolute_links_with_public_url() {
        let config = PageConfig {
            public_url: Some(Url::parse("https://pdc.example.com/").unwrap()),
            ..PageConfig::default()
        };
        let body = list((0..30).collect(), "", "/rest_api/v1/repos/", &config).unwrap();
        assert_eq!(
            body["next"],
            json!("https://pdc.example.com/rest_api/v1/repos/?page=2")
        );
    }
}
