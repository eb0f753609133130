use super::BookProvider;
use crate::book::Book;
use crate::error::{Error, Result};
use reqwest::Url;
use scraper::Html;
use serde::Deserialize;
use std::time::Duration;

const BASE_URL: &str = "https://nl.go.kr/NL/search/openApi/search.do";
const DETAIL_URL: &str = "https://nl.go.kr/NL/search/detail";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// National Library of Korea open search API.
#[derive(Debug, Clone)]
pub struct NlBooksApi {
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct NlResponse {
    #[serde(default)]
    items: Vec<NlItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct NlItem {
    title_info: String,
    author_info: String,
    pub_info: String,
    isbn: String,
    description: String,
    cover_url: String,
    publish_year: String,
}

impl NlBooksApi {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Points the client at another endpoint, e.g. a local mirror.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_search_url(&self, query: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("kwd", query)
            .append_pair("apiType", "json");
        Ok(url)
    }
}

impl BookProvider for NlBooksApi {
    fn search(&self, query: &str, _locale: Option<&str>) -> Result<Vec<Book>> {
        let url = self.build_search_url(query)?;
        log::debug!("nl search: kwd={query:?}");

        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let resp = client.get(url).send()?.error_for_status()?;
        let body = resp.text()?;
        parse_search_response(&body)
    }
}

fn parse_search_response(body: &str) -> Result<Vec<Book>> {
    let data: NlResponse = serde_json::from_str(body)?;
    Ok(data.items.into_iter().map(into_book).collect())
}

fn into_book(item: NlItem) -> Book {
    let author = clean_text(&item.author_info);
    let isbn = clean_text(&item.isbn);
    let link = format!("{DETAIL_URL}/{isbn}");

    Book {
        title: clean_text(&item.title_info),
        authors: vec![author.clone()],
        author: Some(author),
        publisher: Some(clean_text(&item.pub_info)),
        description: Some(clean_text(&item.description)),
        cover_url: Some(item.cover_url.trim().to_string()),
        publish_date: Some(clean_text(&item.publish_year)),
        link: Some(link),
        isbn: Some(isbn),
        ..Default::default()
    }
}

/// Search results wrap matched keywords in highlight markup
/// (`<span class="searching_txt">`). Keep only the text, with entities
/// decoded.
fn clean_text(raw: &str) -> String {
    let text = if raw.contains('<') {
        Html::parse_fragment(raw)
            .root_element()
            .text()
            .collect::<String>()
    } else {
        html_escape::decode_html_entities(raw).into_owned()
    };
    text.trim().to_string()
}
