//! Web research against a Tavily-compatible search API.

use super::ToolResult;
use crate::config::ResearchSettings;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

/// Arguments for `webResearch`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebResearchArgs {
    pub query: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

fn default_max_results() -> u32 {
    5
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Successful research payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchFindings {
    pub results: Vec<ResearchResult>,
    /// Provider-synthesized summary, when it returned one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub query: String,
}

/// Outcome of a research call.
#[derive(Debug, Clone, PartialEq)]
pub enum ResearchOutcome {
    Found(ResearchFindings),
    /// No credential configured; the conversation continues on suggestions.
    Degraded {
        error: String,
        suggestions: Vec<ResearchResult>,
    },
    Failed {
        error: String,
    },
}

impl ResearchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ResearchOutcome::Found(_))
    }

    /// Results carried by the outcome, fallback suggestions included.
    pub fn results(&self) -> &[ResearchResult] {
        match self {
            ResearchOutcome::Found(findings) => &findings.results,
            ResearchOutcome::Degraded { suggestions, .. } => suggestions,
            ResearchOutcome::Failed { .. } => &[],
        }
    }

    pub fn into_tool_result(self) -> ToolResult {
        match self {
            ResearchOutcome::Found(findings) => ToolResult::ok(&findings),
            ResearchOutcome::Degraded { error, suggestions } => {
                let mut extra = Map::new();
                extra.insert("results".to_string(), json!(suggestions));
                ToolResult::failure_with(error, extra)
            }
            ResearchOutcome::Failed { error } => {
                let mut extra = Map::new();
                extra.insert("results".to_string(), json!([]));
                ToolResult::failure_with(error, extra)
            }
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    score: Option<f64>,
}

/// Web research executor.
pub struct WebResearcher {
    client: reqwest::Client,
    settings: ResearchSettings,
}

impl WebResearcher {
    pub fn new(settings: ResearchSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    /// Whether a provider credential is configured.
    pub fn is_configured(&self) -> bool {
        self.settings.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Run a research query. Never fails; see `ResearchOutcome`.
    pub async fn research(&self, args: &WebResearchArgs) -> ResearchOutcome {
        let Some(api_key) = self.settings.api_key.as_deref().filter(|k| !k.is_empty()) else {
            warn!("TAVILY_API_KEY not configured, returning research suggestion");
            return ResearchOutcome::Degraded {
                error: "Search API key not configured. Set TAVILY_API_KEY to enable web research; \
                        falling back to basic suggestions."
                    .to_string(),
                suggestions: vec![fallback_suggestion(&args.query)],
            };
        };

        info!("Researching '{}' (max {} results)", args.query, args.max_results);

        match self.search(api_key, args).await {
            Ok(findings) => ResearchOutcome::Found(findings),
            Err(e) => {
                warn!("Web research failed: {}", e);
                ResearchOutcome::Failed {
                    error: format!("Web research failed: {}", e),
                }
            }
        }
    }

    async fn search(&self, api_key: &str, args: &WebResearchArgs) -> Result<ResearchFindings, String> {
        let body = json!({
            "api_key": api_key,
            "query": format!("{} tutorial learning course", args.query),
            "search_depth": self.settings.search_depth,
            "max_results": args.max_results,
            "include_answer": true,
            "include_domains": self.settings.include_domains,
        });

        let response = self
            .client
            .post(&self.settings.api_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("search API returned {}", response.status()));
        }

        let data: SearchResponse = response.json().await.map_err(|e| e.to_string())?;

        Ok(ResearchFindings {
            results: data
                .results
                .into_iter()
                .map(|hit| ResearchResult {
                    title: hit.title,
                    url: hit.url,
                    snippet: hit.content.or(hit.snippet).unwrap_or_default(),
                    score: hit.score,
                })
                .collect(),
            answer: data.answer.filter(|a| !a.is_empty()),
            query: args.query.clone(),
        })
    }
}

/// Suggestion returned when no search credential is available.
fn fallback_suggestion(query: &str) -> ResearchResult {
    let search_terms = format!("learn {} tutorial", query);
    let url = url::Url::parse_with_params("https://www.google.com/search", &[("q", search_terms.as_str())])
        .map(|u| u.to_string())
        .unwrap_or_else(|_| "https://www.google.com/search".to_string());

    ResearchResult {
        title: format!("Learn {}", query),
        url,
        snippet: format!(
            "Research suggestion: Search for tutorials and courses about {}",
            query
        ),
        score: None,
    }
}

impl From<ResearchOutcome> for Value {
    fn from(outcome: ResearchOutcome) -> Self {
        outcome.into_tool_result().payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};

    #[test]
    fn test_args_defaults() {
        let args: WebResearchArgs = serde_json::from_value(json!({ "query": "rust" })).unwrap();
        assert_eq!(args.max_results, 5);
        assert!(serde_json::from_value::<WebResearchArgs>(json!({ "maxResults": 3 })).is_err());
    }

    #[tokio::test]
    async fn test_missing_credential_degrades_with_suggestion() {
        let researcher = WebResearcher::new(ResearchSettings::default());
        assert!(!researcher.is_configured());

        let outcome = researcher
            .research(&WebResearchArgs {
                query: "graph databases".to_string(),
                max_results: 5,
            })
            .await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.results().len(), 1);
        assert_eq!(outcome.results()[0].title, "Learn graph databases");
        assert!(outcome.results()[0].url.starts_with("https://www.google.com/search?q=learn"));

        let result = outcome.into_tool_result();
        assert!(!result.success);
        assert_eq!(result.payload["results"].as_array().unwrap().len(), 1);
        assert!(result.error().unwrap().contains("TAVILY_API_KEY"));
    }

    #[tokio::test]
    async fn test_search_against_fake_provider() {
        async fn search(Json(body): Json<Value>) -> Json<Value> {
            assert_eq!(body["query"], json!("sql tutorial learning course"));
            assert_eq!(body["include_answer"], json!(true));
            assert!(body["include_domains"].as_array().unwrap().contains(&json!("dev.to")));
            Json(json!({
                "answer": "SQL is a query language.",
                "results": [
                    { "title": "SQL Basics", "url": "https://dev.to/sql", "content": "Intro", "score": 0.9 }
                ]
            }))
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, Router::new().route("/search", post(search)))
                .await
                .unwrap();
        });

        let researcher = WebResearcher::new(ResearchSettings {
            api_url: format!("http://{}/search", addr),
            api_key: Some("tvly-test".to_string()),
            ..ResearchSettings::default()
        });

        let outcome = researcher
            .research(&WebResearchArgs {
                query: "sql".to_string(),
                max_results: 3,
            })
            .await;

        match outcome {
            ResearchOutcome::Found(findings) => {
                assert_eq!(findings.results.len(), 1);
                assert_eq!(findings.results[0].snippet, "Intro");
                assert_eq!(findings.answer.as_deref(), Some("SQL is a query language."));
                assert_eq!(findings.query, "sql");
            }
            other => panic!("Expected findings, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_provider_error_is_tagged_failure() {
        let researcher = WebResearcher::new(ResearchSettings {
            api_url: "http://127.0.0.1:9/search".to_string(),
            api_key: Some("tvly-test".to_string()),
            ..ResearchSettings::default()
        });

        let outcome = researcher
            .research(&WebResearchArgs {
                query: "sql".to_string(),
                max_results: 3,
            })
            .await;

        assert!(matches!(outcome, ResearchOutcome::Failed { .. }));
        assert!(outcome.results().is_empty());
    }
}
