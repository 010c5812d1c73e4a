//! MicroCEO, the executive agent
//!
//! Manages a budget ledger and produces market analyses, business plans,
//! and performance reports. The ledger is shared state between the budget
//! and reporting tools; amounts are kept in minor currency units so the
//! arithmetic stays exact.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::complete_text;
use crate::agent::Agent;
use crate::llm::Provider;
use crate::tools::{ParamSpec, ParamType, Tool, ToolSchema};

const ROLE: &str = "chief executive agent";

const DESCRIPTION: &str = "An executive decision-maker able to analyze markets, plan \
and run projects from scratch, manage budgets and resources effectively, and size up \
competitors and opportunities.";

/// Build the MicroCEO agent with its four tools
pub fn build(
    initial_budget_cents: i64,
    currency: impl Into<String>,
    provider: Option<Arc<dyn Provider>>,
) -> crate::error::Result<Agent> {
    let ledger = new_ledger(initial_budget_cents, currency);

    let mut agent = Agent::new("ceo", ROLE, DESCRIPTION)
        .with_provider(provider.clone())
        .with_temperature(0.5);

    agent.register_tool(Arc::new(MarketAnalysisTool {
        provider: provider.clone(),
    }))?;
    agent.register_tool(Arc::new(BusinessPlanTool {
        provider,
        ledger: ledger.clone(),
    }))?;
    agent.register_tool(Arc::new(BudgetTool {
        ledger: ledger.clone(),
    }))?;
    agent.register_tool(Arc::new(GenerateReportTool { ledger }))?;

    Ok(agent)
}

// ============================================================================
// Ledger
// ============================================================================

/// One recorded expense
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub amount_cents: i64,
    pub category: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// Budget ledger in minor currency units
#[derive(Debug)]
pub struct Ledger {
    pub balance_cents: i64,
    pub currency: String,
    pub expenses: Vec<Expense>,
}

/// Ledger shared between the budget and reporting tools
pub type SharedLedger = Arc<Mutex<Ledger>>;

/// Create a fresh shared ledger
pub fn new_ledger(initial_cents: i64, currency: impl Into<String>) -> SharedLedger {
    Arc::new(Mutex::new(Ledger {
        balance_cents: initial_cents,
        currency: currency.into(),
        expenses: Vec::new(),
    }))
}

/// Convert a JSON decimal amount to minor units
fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Convert minor units back to a JSON decimal amount
fn to_major(cents: i64) -> f64 {
    cents as f64 / 100.0
}

// ============================================================================
// market_analysis
// ============================================================================

struct MarketAnalysisTool {
    provider: Option<Arc<dyn Provider>>,
}

#[derive(Debug, Deserialize)]
struct MarketAnalysisInput {
    market: String,
    scope: String,
}

#[async_trait]
impl Tool for MarketAnalysisTool {
    fn name(&self) -> &str {
        "market_analysis"
    }

    fn description(&self) -> &str {
        "Analyze a target market and its competitors"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![
            ParamSpec::required("market", ParamType::String, "Market or product name"),
            ParamSpec::optional("scope", ParamType::String, "Scope of the analysis")
                .with_default(json!("global")),
        ])
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let input: MarketAnalysisInput = serde_json::from_value(args.clone())?;

        let prompt = format!(
            "Analyze the following market: {}\n\
             Analysis scope: {}\n\n\
             Provide a thorough analysis covering:\n\
             1. market size and expected growth\n\
             2. main players and competitors\n\
             3. current and future trends\n\
             4. opportunities and threats\n\
             5. target customer segments\n\
             6. common pricing strategies",
            input.market, input.scope
        );

        let analysis = complete_text(&self.provider, prompt, 0.5).await?;

        Ok(json!({
            "market": input.market,
            "scope": input.scope,
            "analysis": analysis,
            "timestamp": Utc::now(),
        }))
    }
}

// ============================================================================
// business_plan
// ============================================================================

struct BusinessPlanTool {
    provider: Option<Arc<dyn Provider>>,
    ledger: SharedLedger,
}

#[derive(Debug, Deserialize)]
struct BusinessPlanInput {
    project_name: String,
    description: String,
    target_audience: String,
}

#[async_trait]
impl Tool for BusinessPlanTool {
    fn name(&self) -> &str {
        "business_plan"
    }

    fn description(&self) -> &str {
        "Create a complete business plan for a project"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![
            ParamSpec::required("project_name", ParamType::String, "Name of the project"),
            ParamSpec::required("description", ParamType::String, "What the project is"),
            ParamSpec::optional("target_audience", ParamType::String, "Intended audience")
                .with_default(json!("general")),
        ])
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let input: BusinessPlanInput = serde_json::from_value(args.clone())?;

        let (balance, currency) = {
            let ledger = self.ledger.lock().expect("ledger lock poisoned");
            (to_major(ledger.balance_cents), ledger.currency.clone())
        };

        let prompt = format!(
            "Create a complete business plan for the following project:\n\n\
             Project name: {}\n\
             Description: {}\n\
             Target audience: {}\n\n\
             Available budget: {} {}\n\n\
             The plan must include:\n\
             1. executive summary\n\
             2. product/service description\n\
             3. market analysis\n\
             4. marketing strategy\n\
             5. financial plan\n\
             6. implementation timeline",
            input.project_name, input.description, input.target_audience, balance, currency
        );

        let plan = complete_text(&self.provider, prompt, 0.5).await?;

        Ok(json!({
            "plan_id": format!("plan_{}", Utc::now().format("%Y%m%d_%H%M%S")),
            "project_name": input.project_name,
            "plan": plan,
        }))
    }
}

// ============================================================================
// budget_management
// ============================================================================

struct BudgetTool {
    ledger: SharedLedger,
}

#[derive(Debug, Deserialize)]
struct BudgetInput {
    action: String,
    amount: Option<f64>,
    category: Option<String>,
    description: Option<String>,
}

#[async_trait]
impl Tool for BudgetTool {
    fn name(&self) -> &str {
        "budget_management"
    }

    fn description(&self) -> &str {
        "Manage the budget and track expenses: allocate, spend, or report"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![
            ParamSpec::required(
                "action",
                ParamType::String,
                "One of: allocate, spend, report",
            ),
            ParamSpec::optional("amount", ParamType::Number, "Amount in major units"),
            ParamSpec::optional("category", ParamType::String, "Expense category"),
            ParamSpec::optional("description", ParamType::String, "Expense description"),
        ])
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let input: BudgetInput = serde_json::from_value(args.clone())?;
        let mut ledger = self.ledger.lock().expect("ledger lock poisoned");

        match input.action.as_str() {
            "allocate" => {
                let amount = input
                    .amount
                    .ok_or_else(|| anyhow::anyhow!("amount is required for allocate"))?;
                ledger.balance_cents += to_cents(amount);

                Ok(json!({
                    "action": "allocated",
                    "amount": amount,
                    "new_balance": to_major(ledger.balance_cents),
                }))
            }
            "spend" => {
                let amount = input
                    .amount
                    .ok_or_else(|| anyhow::anyhow!("amount is required for spend"))?;
                let cents = to_cents(amount);
                if cents > ledger.balance_cents {
                    anyhow::bail!(
                        "insufficient budget: balance is {} {}",
                        to_major(ledger.balance_cents),
                        ledger.currency
                    );
                }

                ledger.balance_cents -= cents;
                let category = input.category.unwrap_or_else(|| "general".to_string());
                ledger.expenses.push(Expense {
                    amount_cents: cents,
                    category: category.clone(),
                    description: input.description.unwrap_or_default(),
                    timestamp: Utc::now(),
                });

                Ok(json!({
                    "action": "spent",
                    "amount": amount,
                    "category": category,
                    "new_balance": to_major(ledger.balance_cents),
                }))
            }
            "report" => {
                let total: i64 = ledger.expenses.iter().map(|e| e.amount_cents).sum();
                Ok(json!({
                    "current_balance": to_major(ledger.balance_cents),
                    "currency": ledger.currency,
                    "total_expenses": to_major(total),
                    "transaction_count": ledger.expenses.len(),
                }))
            }
            other => anyhow::bail!("unknown action '{}'; expected allocate, spend, or report", other),
        }
    }
}

// ============================================================================
// generate_report
// ============================================================================

struct GenerateReportTool {
    ledger: SharedLedger,
}

#[derive(Debug, Deserialize)]
struct GenerateReportInput {
    report_type: String,
    period: String,
}

#[async_trait]
impl Tool for GenerateReportTool {
    fn name(&self) -> &str {
        "generate_report"
    }

    fn description(&self) -> &str {
        "Produce a performance report from the ledger"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![
            ParamSpec::required("report_type", ParamType::String, "Kind of report"),
            ParamSpec::optional("period", ParamType::String, "Reporting period")
                .with_default(json!("monthly")),
        ])
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let input: GenerateReportInput = serde_json::from_value(args.clone())?;
        let ledger = self.ledger.lock().expect("ledger lock poisoned");

        let total: i64 = ledger.expenses.iter().map(|e| e.amount_cents).sum();
        let by_category = {
            let mut map = std::collections::BTreeMap::new();
            for expense in &ledger.expenses {
                *map.entry(expense.category.clone()).or_insert(0i64) += expense.amount_cents;
            }
            map.into_iter()
                .map(|(category, cents)| json!({"category": category, "total": to_major(cents)}))
                .collect::<Vec<_>>()
        };

        Ok(json!({
            "report_id": format!("rpt_{}", Utc::now().format("%Y%m%d_%H%M%S")),
            "report_type": input.report_type,
            "period": input.period,
            "current_balance": to_major(ledger.balance_cents),
            "currency": ledger.currency,
            "resources_used": to_major(total),
            "transaction_count": ledger.expenses.len(),
            "expenses_by_category": by_category,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget_tool() -> (BudgetTool, SharedLedger) {
        let ledger = new_ledger(100_000, "USD"); // 1000.00
        (
            BudgetTool {
                ledger: ledger.clone(),
            },
            ledger,
        )
    }

    #[tokio::test]
    async fn test_allocate_and_report() {
        let (tool, _ledger) = budget_tool();

        let result = tool
            .execute(&json!({"action": "allocate", "amount": 250.5}))
            .await
            .unwrap();
        assert_eq!(result["new_balance"], json!(1250.5));

        let report = tool.execute(&json!({"action": "report"})).await.unwrap();
        assert_eq!(report["current_balance"], json!(1250.5));
        assert_eq!(report["transaction_count"], json!(0));
    }

    #[tokio::test]
    async fn test_spend_records_expense() {
        let (tool, ledger) = budget_tool();

        let result = tool
            .execute(&json!({
                "action": "spend",
                "amount": 99.99,
                "category": "marketing",
                "description": "launch ads"
            }))
            .await
            .unwrap();
        assert_eq!(result["new_balance"], json!(900.01));

        let ledger = ledger.lock().unwrap();
        assert_eq!(ledger.expenses.len(), 1);
        assert_eq!(ledger.expenses[0].amount_cents, 9999);
        assert_eq!(ledger.expenses[0].category, "marketing");
    }

    #[tokio::test]
    async fn test_overspend_fails() {
        let (tool, ledger) = budget_tool();

        let err = tool
            .execute(&json!({"action": "spend", "amount": 5000.0}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("insufficient budget"));

        // Balance untouched
        assert_eq!(ledger.lock().unwrap().balance_cents, 100_000);
    }

    #[tokio::test]
    async fn test_spend_requires_amount() {
        let (tool, _ledger) = budget_tool();
        let err = tool.execute(&json!({"action": "spend"})).await.unwrap_err();
        assert!(err.to_string().contains("amount is required"));
    }

    #[tokio::test]
    async fn test_unknown_action_fails() {
        let (tool, _ledger) = budget_tool();
        let err = tool
            .execute(&json!({"action": "siphon", "amount": 1.0}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown action"));
    }

    #[tokio::test]
    async fn test_generate_report_groups_by_category() {
        let ledger = new_ledger(50_000, "EUR");
        let budget = BudgetTool {
            ledger: ledger.clone(),
        };
        budget
            .execute(&json!({"action": "spend", "amount": 10.0, "category": "tools"}))
            .await
            .unwrap();
        budget
            .execute(&json!({"action": "spend", "amount": 5.0, "category": "tools"}))
            .await
            .unwrap();
        budget
            .execute(&json!({"action": "spend", "amount": 20.0, "category": "ads"}))
            .await
            .unwrap();

        let report_tool = GenerateReportTool { ledger };
        let report = report_tool
            .execute(&json!({"report_type": "performance", "period": "monthly"}))
            .await
            .unwrap();

        assert_eq!(report["resources_used"], json!(35.0));
        let by_category = report["expenses_by_category"].as_array().unwrap();
        assert_eq!(by_category.len(), 2);
        assert_eq!(by_category[0]["category"], "ads");
        assert_eq!(by_category[0]["total"], json!(20.0));
    }

    #[test]
    fn test_cents_round_trip() {
        assert_eq!(to_cents(10.01), 1001);
        assert_eq!(to_major(1001), 10.01);
        // No float drift once amounts are in minor units
        assert_eq!(to_cents(0.1) + to_cents(0.2), to_cents(0.3));
    }

    #[test]
    fn test_build_registers_all_tools() {
        let agent = build(100_000, "USD", None).unwrap();
        let names: Vec<String> = agent.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "market_analysis",
                "business_plan",
                "budget_management",
                "generate_report"
            ]
        );
    }
}
