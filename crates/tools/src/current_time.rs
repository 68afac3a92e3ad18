//! Current time tool: answers "what day is it?" style questions.
//!
//! Returns the current date and time, optionally shifted to a fixed UTC
//! offset. The clock is injectable so results are testable.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde_json::{Map, Value};
use toolpilot_core::error::ToolError;
use toolpilot_core::tool::{Tool, ToolResult};

type Clock = fn() -> DateTime<Utc>;

pub struct CurrentTimeTool {
    clock: Clock,
}

impl CurrentTimeTool {
    pub fn new() -> Self {
        Self { clock: Utc::now }
    }

    /// Use a fixed clock (for tests and replays).
    pub fn with_clock(clock: Clock) -> Self {
        Self { clock }
    }
}

impl Default for CurrentTimeTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Tell the current date and time. Optionally takes a UTC offset in hours."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "utc_offset_hours": {
                    "type": "integer",
                    "description": "Hours east of UTC (default: 0)",
                    "minimum": -12,
                    "maximum": 14
                }
            }
        })
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<ToolResult, ToolError> {
        let offset_hours = match args.get("utc_offset_hours") {
            None | Some(Value::Null) => 0,
            Some(v) => v.as_i64().ok_or_else(|| {
                ToolError::InvalidArguments(format!("utc_offset_hours must be an integer, got {v}"))
            })?,
        };

        let offset = i32::try_from(offset_hours)
            .ok()
            .filter(|h| (-12..=14).contains(h))
            .and_then(|h| FixedOffset::east_opt(h * 3600))
            .ok_or_else(|| {
                ToolError::InvalidArguments(format!("utc_offset_hours out of range: {offset_hours}"))
            })?;

        let now = (self.clock)().with_timezone(&offset);
        let output = format!(
            "The current date and time is {} ({}), UTC{}",
            now.format("%Y-%m-%d %H:%M:%S"),
            now.format("%A"),
            offset
        );

        Ok(ToolResult {
            output,
            data: Some(serde_json::json!({
                "iso8601": now.to_rfc3339(),
                "weekday": now.format("%A").to_string(),
            })),
        })
    }
}
