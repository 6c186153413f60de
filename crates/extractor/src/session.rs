use async_trait::async_trait;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, COOKIE, HeaderMap, HeaderValue, REFERER, SET_COOKIE, USER_AGENT,
};
use reqwest::{Client, StatusCode};
use tracing::debug;

use challenge_solver::CookieSet;

use crate::default::DEFAULT_UA;
use crate::error::ExtractError;
use crate::target::RoomTarget;

/// One HTTP fetch attempt against a room page. Handed to the challenge
/// detector right after the fetch and not retained across attempts.
#[derive(Debug)]
pub struct FetchResult {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// The seam the retry orchestrator drives. Implemented by
/// [`ExtractionSession`] for real traffic and by scripted doubles in tests.
#[async_trait]
pub trait RoomFetcher: Send + Sync {
    async fn fetch(&mut self, target: &RoomTarget) -> Result<FetchResult, ExtractError>;

    /// Overwrite-by-key merge of recovered cookies into the session state.
    fn merge_cookies(&mut self, recovered: CookieSet);
}

/// Cookie-bearing scraping session.
///
/// Owns the only mutable cookie state in the pipeline; the `&mut` receivers
/// keep merges and fetches serialized, so no fetch ever observes a cookie
/// set mutated mid-flight. Concurrent extractions for different targets get
/// independent sessions by constructing independent values.
#[derive(Debug, Clone)]
pub struct ExtractionSession {
    client: Client,
    headers: HeaderMap,
    cookies: CookieSet,
}

impl ExtractionSession {
    pub fn new(client: Client) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_UA));
        headers.insert(
            REFERER,
            HeaderValue::from_static("https://www.douyin.com/"),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
        );

        Self {
            client,
            headers,
            cookies: CookieSet::default(),
        }
    }

    pub fn cookies(&self) -> &CookieSet {
        &self.cookies
    }

    pub fn add_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    /// Import cookies from a `name1=value1; name2=value2` string, as copied
    /// from a browser or passed on the command line.
    pub fn set_cookies_from_string(&mut self, cookie_string: &str) {
        for part in cookie_string.split(&[';', '\n'][..]).map(str::trim) {
            let Some((name, value)) = part.split_once('=') else {
                continue;
            };
            let name = name.trim();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                continue;
            }
            self.cookies.insert(name.to_owned(), value.to_owned());
        }
    }

    fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }

        let mut header = String::with_capacity(
            self.cookies
                .iter()
                .map(|(k, v)| k.len() + 1 + v.len() + 2)
                .sum(),
        );
        for (name, value) in &self.cookies {
            if !header.is_empty() {
                header.push_str("; ");
            }
            header.push_str(name);
            header.push('=');
            header.push_str(value);
        }
        Some(header)
    }

    /// Capture `Set-Cookie` response headers back into the store, the way a
    /// browser would carry them into the next request.
    fn store_response_cookies(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(SET_COOKIE).iter() {
            if let Ok(cookie_str) = value.to_str()
                && let Some(cookie_part) = cookie_str.split(';').next()
                && let Some((name, value)) = cookie_part.split_once('=')
            {
                let name = name.trim();
                let value = value.trim();
                if name.is_empty() || value.is_empty() {
                    continue;
                }
                debug!(cookie = name, "storing response cookie");
                self.cookies.insert(name.to_owned(), value.to_owned());
            }
        }
    }
}

#[async_trait]
impl RoomFetcher for ExtractionSession {
    async fn fetch(&mut self, target: &RoomTarget) -> Result<FetchResult, ExtractError> {
        let mut headers = self.headers.clone();
        if let Some(cookie_header) = self.cookie_header() {
            match HeaderValue::from_str(&cookie_header) {
                Ok(value) => {
                    headers.insert(COOKIE, value);
                }
                Err(e) => debug!(error = %e, "skipping malformed cookie header"),
            }
        }

        let response = self
            .client
            .get(target.url())
            .headers(headers)
            .send()
            .await?;
        self.store_response_cookies(response.headers());

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        debug!(
            room = target.room_id(),
            %status,
            bytes = body.len(),
            "fetched room page"
        );

        Ok(FetchResult {
            status,
            headers,
            body,
        })
    }

    fn merge_cookies(&mut self, recovered: CookieSet) {
        debug!(count = recovered.len(), "merging recovered cookies into session");
        self.cookies.extend(recovered);
    }
}
