//! Polymath, the research agent
//!
//! Searches the web, extracts data, and links concepts across domains.
//! Concept connections accumulate in a shared knowledge graph for the
//! process lifetime.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::complete_text;
use crate::agent::Agent;
use crate::llm::Provider;
use crate::tools::{ParamSpec, ParamType, SearchClient, Tool, ToolSchema};

const ROLE: &str = "cross-domain researcher and synthesizer";

const DESCRIPTION: &str = "A researcher able to dig through multiple sources, extract \
and analyze the information that matters, connect concepts across scientific fields, \
spot hidden patterns, and turn them into actionable insights.";

/// Build the Polymath agent with its four tools
pub fn build(provider: Option<Arc<dyn Provider>>) -> crate::error::Result<Agent> {
    let graph = new_knowledge_graph();
    let search = SearchClient::new().map_err(|e| crate::error::AgentError::Config(e.to_string()))?;

    let mut agent = Agent::new("polymath", ROLE, DESCRIPTION)
        .with_provider(provider.clone())
        .with_temperature(0.3);

    agent.register_tool(Arc::new(ComprehensiveSearchTool { search }))?;
    agent.register_tool(Arc::new(ExtractDataTool {
        provider: provider.clone(),
    }))?;
    agent.register_tool(Arc::new(ConnectConceptsTool {
        provider,
        graph: graph.clone(),
    }))?;
    agent.register_tool(Arc::new(GenerateInsightsTool { graph }))?;

    Ok(agent)
}

// ============================================================================
// Knowledge graph
// ============================================================================

/// A recorded link between two concepts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub concept_a: String,
    pub concept_b: String,
    pub connection_type: String,
    pub confidence: f32,
    pub explanation: String,
}

/// Concept -> its outgoing connections
pub type KnowledgeGraph = HashMap<String, Vec<Connection>>;

/// Graph shared between the connect and insight tools
pub type SharedKnowledgeGraph = Arc<RwLock<KnowledgeGraph>>;

/// Create an empty shared knowledge graph
pub fn new_knowledge_graph() -> SharedKnowledgeGraph {
    Arc::new(RwLock::new(HashMap::new()))
}

// ============================================================================
// comprehensive_search
// ============================================================================

struct ComprehensiveSearchTool {
    search: SearchClient,
}

#[derive(Debug, Deserialize)]
struct ComprehensiveSearchInput {
    query: String,
    sources: Option<Vec<String>>,
    depth: String,
}

/// Map a search depth to the number of results fetched
fn depth_to_limit(depth: &str) -> usize {
    match depth {
        "shallow" => 3,
        "deep" => 10,
        _ => 5,
    }
}

#[async_trait]
impl Tool for ComprehensiveSearchTool {
    fn name(&self) -> &str {
        "comprehensive_search"
    }

    fn description(&self) -> &str {
        "Search the web and return ranked results"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![
            ParamSpec::required("query", ParamType::String, "Search query"),
            ParamSpec::optional("sources", ParamType::Array, "Source kinds to search"),
            ParamSpec::optional("depth", ParamType::String, "shallow, medium, or deep")
                .with_default(json!("medium")),
        ])
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let input: ComprehensiveSearchInput = serde_json::from_value(args.clone())?;

        let sources = input
            .sources
            .unwrap_or_else(|| vec!["web".to_string(), "news".to_string()]);
        let limit = depth_to_limit(&input.depth);

        let hits = self.search.search(&input.query, limit).await?;

        Ok(json!({
            "query": input.query,
            "sources_searched": sources,
            "total_results": hits.len(),
            "top_results": hits,
            "timestamp": chrono::Utc::now(),
        }))
    }
}

// ============================================================================
// extract_data
// ============================================================================

struct ExtractDataTool {
    provider: Option<Arc<dyn Provider>>,
}

#[derive(Debug, Deserialize)]
struct ExtractDataInput {
    content: String,
    data_type: String,
}

#[async_trait]
impl Tool for ExtractDataTool {
    fn name(&self) -> &str {
        "extract_data"
    }

    fn description(&self) -> &str {
        "Extract data of a given kind from a block of text"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![
            ParamSpec::required("content", ParamType::String, "Text to extract from"),
            ParamSpec::required("data_type", ParamType::String, "Kind of data wanted"),
        ])
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let input: ExtractDataInput = serde_json::from_value(args.clone())?;

        let prompt = format!(
            "Extract data of kind '{}' from the following text:\n\n\
             {}\n\n\
             Reply with the extracted data as JSON.",
            input.data_type, input.content
        );

        let extraction = complete_text(&self.provider, prompt, 0.3).await?;

        // Keep the structured form when the model produced valid JSON
        let extracted: Value = serde_json::from_str(extraction.trim())
            .unwrap_or_else(|_| json!({ "raw": extraction }));

        Ok(json!({
            "data_type": input.data_type,
            "extracted_data": extracted,
            "content_length": input.content.len(),
        }))
    }
}

// ============================================================================
// connect_concepts
// ============================================================================

struct ConnectConceptsTool {
    provider: Option<Arc<dyn Provider>>,
    graph: SharedKnowledgeGraph,
}

#[derive(Debug, Deserialize)]
struct ConnectConceptsInput {
    concepts: Vec<String>,
    domains: Option<Vec<String>>,
}

#[async_trait]
impl Tool for ConnectConceptsTool {
    fn name(&self) -> &str {
        "connect_concepts"
    }

    fn description(&self) -> &str {
        "Link two or more concepts across domains and record the connections"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![
            ParamSpec::required("concepts", ParamType::Array, "Concepts to connect"),
            ParamSpec::optional("domains", ParamType::Array, "Domains to draw from"),
        ])
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let input: ConnectConceptsInput = serde_json::from_value(args.clone())?;
        if input.concepts.len() < 2 {
            anyhow::bail!("at least two concepts are required");
        }

        let domains = input.domains.unwrap_or_else(|| {
            vec![
                "technology".to_string(),
                "science".to_string(),
                "business".to_string(),
            ]
        });

        let prompt = format!(
            "Find connections between the following concepts, drawn from \
             different domains:\n\n\
             Concepts: {}\n\
             Domains: {}\n\n\
             For each pair of concepts, identify:\n\
             1. whether there is a similarity\n\
             2. whether they complement each other\n\
             3. what the link is good for",
            serde_json::to_string(&input.concepts)?,
            serde_json::to_string(&domains)?,
        );

        let analysis = complete_text(&self.provider, prompt, 0.3).await?;

        // Record every pair into the shared graph
        let mut connections_count = 0;
        {
            let mut graph = self.graph.write().expect("graph lock poisoned");
            for (i, concept_a) in input.concepts.iter().enumerate() {
                for concept_b in &input.concepts[i + 1..] {
                    graph.entry(concept_a.clone()).or_default().push(Connection {
                        concept_a: concept_a.clone(),
                        concept_b: concept_b.clone(),
                        connection_type: "complementary".to_string(),
                        confidence: 0.7,
                        explanation: analysis.clone(),
                    });
                    connections_count += 1;
                }
            }
        }

        Ok(json!({
            "concepts": input.concepts,
            "domains": domains,
            "analysis": analysis,
            "connections_count": connections_count,
        }))
    }
}

// ============================================================================
// generate_insights
// ============================================================================

struct GenerateInsightsTool {
    graph: SharedKnowledgeGraph,
}

#[derive(Debug, Deserialize)]
struct GenerateInsightsInput {
    data: Value,
    context: String,
}

#[async_trait]
impl Tool for GenerateInsightsTool {
    fn name(&self) -> &str {
        "generate_insights"
    }

    fn description(&self) -> &str {
        "Summarize patterns across a data set and the accumulated knowledge graph"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![
            ParamSpec::required("data", ParamType::Object, "Data to analyze"),
            ParamSpec::optional("context", ParamType::String, "Analysis context")
                .with_default(json!("")),
        ])
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let input: GenerateInsightsInput = serde_json::from_value(args.clone())?;

        let graph = self.graph.read().expect("graph lock poisoned");
        let connection_total: usize = graph.values().map(|v| v.len()).sum();

        // The most connected concepts are the likeliest pattern anchors
        let mut ranked: Vec<(&String, usize)> =
            graph.iter().map(|(k, v)| (k, v.len())).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        let patterns: Vec<String> = ranked
            .iter()
            .take(5)
            .map(|(concept, count)| format!("{} ({} connections)", concept, count))
            .collect();

        let field_count = input.data.as_object().map(|o| o.len()).unwrap_or(0);

        Ok(json!({
            "context": input.context,
            "data_fields": field_count,
            "known_connections": connection_total,
            "patterns": patterns,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_to_limit() {
        assert_eq!(depth_to_limit("shallow"), 3);
        assert_eq!(depth_to_limit("medium"), 5);
        assert_eq!(depth_to_limit("deep"), 10);
        assert_eq!(depth_to_limit("bogus"), 5);
    }

    #[tokio::test]
    async fn test_connect_concepts_records_pairs() {
        // Provider failure is fine for the graph bookkeeping test only if
        // the tool errors first; use a scripted provider instead.
        struct FixedProvider;

        #[async_trait]
        impl Provider for FixedProvider {
            async fn complete(
                &self,
                _r: crate::llm::CompletionRequest,
            ) -> crate::error::Result<crate::llm::CompletionResponse> {
                Ok(crate::llm::CompletionResponse {
                    content: "these overlap".to_string(),
                    model: "fixed".to_string(),
                    usage: None,
                })
            }
            fn model(&self) -> &str {
                "fixed"
            }
        }

        let graph = new_knowledge_graph();
        let tool = ConnectConceptsTool {
            provider: Some(Arc::new(FixedProvider)),
            graph: graph.clone(),
        };

        let result = tool
            .execute(&json!({"concepts": ["rust", "reliability", "embedded"]}))
            .await
            .unwrap();

        // Three concepts -> three pairs
        assert_eq!(result["connections_count"], json!(3));

        let graph = graph.read().unwrap();
        assert_eq!(graph["rust"].len(), 2);
        assert_eq!(graph["reliability"].len(), 1);
        assert_eq!(graph["rust"][0].explanation, "these overlap");
    }

    #[tokio::test]
    async fn test_connect_concepts_needs_two() {
        let tool = ConnectConceptsTool {
            provider: None,
            graph: new_knowledge_graph(),
        };
        let err = tool
            .execute(&json!({"concepts": ["loneliness"]}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("at least two"));
    }

    #[tokio::test]
    async fn test_generate_insights_ranks_concepts() {
        let graph = new_knowledge_graph();
        {
            let mut g = graph.write().unwrap();
            for other in ["b", "c", "d"] {
                g.entry("a".to_string()).or_default().push(Connection {
                    concept_a: "a".to_string(),
                    concept_b: other.to_string(),
                    connection_type: "complementary".to_string(),
                    confidence: 0.7,
                    explanation: String::new(),
                });
            }
            g.entry("b".to_string()).or_default().push(Connection {
                concept_a: "b".to_string(),
                concept_b: "c".to_string(),
                connection_type: "complementary".to_string(),
                confidence: 0.7,
                explanation: String::new(),
            });
        }

        let tool = GenerateInsightsTool { graph };
        let result = tool
            .execute(&json!({"data": {"x": 1, "y": 2}, "context": "test"}))
            .await
            .unwrap();

        assert_eq!(result["known_connections"], json!(4));
        assert_eq!(result["data_fields"], json!(2));
        let patterns = result["patterns"].as_array().unwrap();
        assert!(patterns[0].as_str().unwrap().starts_with("a (3"));
    }

    #[tokio::test]
    async fn test_extract_data_without_provider_fails() {
        let tool = ExtractDataTool { provider: None };
        let err = tool
            .execute(&json!({"content": "abc", "data_type": "emails"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no LLM provider"));
    }

    #[test]
    fn test_build_registers_all_tools() {
        let agent = build(None).unwrap();
        let names: Vec<String> = agent.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "comprehensive_search",
                "extract_data",
                "connect_concepts",
                "generate_insights"
            ]
        );
    }
}
