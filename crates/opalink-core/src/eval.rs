//! Prepared queries and evaluation.
//!
//! A [`PreparedQuery`] holds an engine that already has its modules parsed and
//! its data loaded. Every evaluation clones that engine, sets the caller's
//! input on the clone, and runs the query there, so concurrent evaluations
//! never observe each other and the prepared state is never mutated.

use regorus::{Engine, QueryResults, Value};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{OpaLinkError, Result};

/// One expression of a result entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionValue {
    pub value: JsonValue,
    pub text: String,
}

/// One satisfying assignment of the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub expressions: Vec<ExpressionValue>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub bindings: Map<String, JsonValue>,
}

/// Compiled, evaluation-ready query.
pub struct PreparedQuery {
    query: String,
    template: Engine,
}

impl std::fmt::Debug for PreparedQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedQuery")
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

impl PreparedQuery {
    /// Wrap an engine that has already been warmed up with `query`.
    pub(crate) fn new(query: String, engine: Engine) -> Self {
        Self {
            query,
            template: engine,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Boolean decision.
    ///
    /// No result, no expression, or a non-boolean first expression all yield
    /// `false`. Non-boolean values are not coerced, so a policy returning
    /// `"yes"` or `1` reads the same as one that is undefined.
    pub fn eval_bool(&self, input: &str) -> Result<bool> {
        let results = self.run(input)?;
        let first = results
            .result
            .iter()
            .find(|r| is_defined(&r.expressions))
            .and_then(|r| r.expressions.first());
        match first.map(|e| &e.value) {
            Some(Value::Bool(b)) => Ok(*b),
            _ => Ok(false),
        }
    }

    /// Full result set. Undefined yields an empty vector, not an error.
    pub fn eval(&self, input: &str) -> Result<Vec<ResultEntry>> {
        let results = self.run(input)?;
        results
            .result
            .iter()
            .filter(|r| is_defined(&r.expressions))
            .map(|r| {
                let expressions = r
                    .expressions
                    .iter()
                    .map(|e| {
                        Ok(ExpressionValue {
                            value: to_json(&e.value)?,
                            text: e.text.to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                let bindings = match to_json(&r.bindings)? {
                    JsonValue::Object(m) => m,
                    _ => Map::new(),
                };
                Ok(ResultEntry {
                    expressions,
                    bindings,
                })
            })
            .collect()
    }

    /// Full result set serialized as JSON text.
    pub fn eval_json(&self, input: &str) -> Result<String> {
        let entries = self.eval(input)?;
        serde_json::to_string(&entries).map_err(|e| OpaLinkError::Evaluation(e.to_string()))
    }

    /// Typed evaluation: serialize `input`, deserialize the first expression value.
    pub fn eval_value<T, V>(&self, input: &T) -> Result<V>
    where
        T: Serialize + ?Sized,
        V: DeserializeOwned,
    {
        let input = serde_json::to_string(input)
            .map_err(|e| OpaLinkError::ParseFailure(e.to_string()))?;
        let entries = self.eval(&input)?;
        let value = entries
            .into_iter()
            .next()
            .and_then(|r| r.expressions.into_iter().next())
            .map(|e| e.value)
            .ok_or_else(|| OpaLinkError::Evaluation("undefined".into()))?;
        serde_json::from_value(value).map_err(|e| OpaLinkError::Evaluation(e.to_string()))
    }

    fn run(&self, input: &str) -> Result<QueryResults> {
        let input =
            Value::from_json_str(input).map_err(|e| OpaLinkError::ParseFailure(e.to_string()))?;
        let mut engine = self.template.clone();
        engine.set_input(input);
        engine
            .eval_query(self.query.clone(), false)
            .map_err(|e| OpaLinkError::Evaluation(e.to_string()))
    }
}

fn is_defined(expressions: &[regorus::Expression]) -> bool {
    expressions.iter().all(|e| !matches!(e.value, Value::Undefined))
}

fn to_json(v: &Value) -> Result<JsonValue> {
    serde_json::to_value(v).map_err(|e| OpaLinkError::Evaluation(e.to_string()))
}
