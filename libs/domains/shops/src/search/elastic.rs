use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{SearchConfig, ShopDocument, ShopSearchIndex, ShopSearchQuery};
use crate::error::{SearchError, SearchResult};
use crate::models::{Page, PageRequest};

/// Elasticsearch-compatible index client speaking the REST API directly
#[derive(Clone)]
pub struct ElasticShopIndex {
    client: Client,
    config: SearchConfig,
}

impl ElasticShopIndex {
    pub fn new(config: SearchConfig) -> SearchResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.index_url(), path);
        let builder = self.client.request(method, url);

        match &self.config.username {
            Some(username) => builder.basic_auth(username, self.config.password.as_deref()),
            None => builder,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    total: TotalHits,
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct TotalHits {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: ShopDocument,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

/// Turn a non-2xx response into [`SearchError::Status`]
async fn check(response: Response) -> SearchResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(SearchError::Status {
        status: status.as_u16(),
        body,
    })
}

fn index_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "id": { "type": "long" },
                "name": {
                    "type": "text",
                    "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } }
                },
                "created_at": { "type": "date", "format": "yyyy-MM-dd" },
                "in_vacations": { "type": "boolean" },
                "nb_products": { "type": "long" },
                "opening_hours": {
                    "properties": {
                        "day": { "type": "keyword" },
                        "open_at": { "type": "keyword" },
                        "close_at": { "type": "keyword" }
                    }
                }
            }
        }
    })
}

/// Escape the characters `wildcard` queries treat specially
fn escape_wildcard(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '*' | '?') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub(crate) fn build_search_body(query: &ShopSearchQuery, page: PageRequest) -> Value {
    json!({
        "from": page.offset(),
        "size": page.size(),
        "track_total_hits": true,
        "sort": [{ "id": { "order": "asc" } }],
        "query": {
            "bool": {
                "filter": [
                    {
                        "wildcard": {
                            "name.keyword": {
                                "value": format!("*{}*", escape_wildcard(&query.name)),
                                "case_insensitive": true
                            }
                        }
                    },
                    {
                        "range": {
                            "created_at": {
                                "gt": query.created_after.to_string(),
                                "lt": query.created_before.to_string()
                            }
                        }
                    },
                    { "term": { "in_vacations": query.in_vacations } }
                ]
            }
        }
    })
}

#[async_trait]
impl ShopSearchIndex for ElasticShopIndex {
    async fn ensure_index(&self) -> SearchResult<()> {
        let response = self.request(Method::HEAD, "").send().await?;
        if response.status().is_success() {
            debug!(index = %self.config.index, "Search index already exists");
            return Ok(());
        }
        if response.status() != StatusCode::NOT_FOUND {
            return check(response).await.map(|_| ());
        }

        let response = self
            .request(Method::PUT, "")
            .json(&index_mapping())
            .send()
            .await?;

        match check(response).await {
            Ok(_) => {
                info!(index = %self.config.index, "Created search index");
                Ok(())
            }
            // Lost a creation race with another instance
            Err(SearchError::Status { status: 400, body })
                if body.contains("resource_already_exists_exception") =>
            {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn upsert(&self, doc: ShopDocument) -> SearchResult<()> {
        let path = format!("/_doc/{}?refresh=wait_for", doc.id);
        let response = self.request(Method::PUT, &path).json(&doc).send().await?;
        check(response).await?;

        debug!(shop_id = doc.id, "Indexed shop document");
        Ok(())
    }

    async fn delete(&self, id: i64) -> SearchResult<bool> {
        let path = format!("/_doc/{id}?refresh=wait_for");
        let response = self.request(Method::DELETE, &path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(shop_id = id, "Shop document already absent");
            return Ok(false);
        }

        check(response).await?;
        debug!(shop_id = id, "Deleted shop document");
        Ok(true)
    }

    async fn search(&self, query: ShopSearchQuery, page: PageRequest) -> SearchResult<Page<ShopDocument>> {
        let response = self
            .request(Method::POST, "/_search")
            .json(&build_search_body(&query, page))
            .send()
            .await?;

        let bytes = check(response).await?.bytes().await?;
        let parsed: SearchResponse = serde_json::from_slice(&bytes)?;

        let docs = parsed.hits.hits.into_iter().map(|hit| hit.source).collect();
        Ok(Page::new(docs, page, parsed.hits.total.value))
    }

    async fn count(&self) -> SearchResult<u64> {
        let response = self.request(Method::GET, "/_count").send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(0);
        }

        let bytes = check(response).await?.bytes().await?;
        let parsed: CountResponse = serde_json::from_slice(&bytes)?;
        Ok(parsed.count)
    }
}
