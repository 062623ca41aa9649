use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{input_rows, to_pipeline};
use crate::ops;
use crate::MedidoresPlugin;

pub struct Metrics;

impl PluginCommand for Metrics {
    type Plugin = MedidoresPlugin;

    fn name(&self) -> &str {
        "medidores metrics"
    }

    fn description(&self) -> &str {
        "Summary metrics for speed-meter records"
    }

    fn extra_description(&self) -> &str {
        "Counts, approval/rejection/expired rates, distinct states and cities, nominal speed stats. With --trends, returns the result distribution, validity by month, and verifications per year instead."
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::table(), Type::record())
            .switch("trends", "Return trend aggregations instead", None)
            .named(
                "years",
                SyntaxShape::Int,
                "Years of verifications for --trends (default: 5)",
                Some('y'),
            )
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["inmetro", "stats", "summary", "approval", "rate"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![
            Example {
                example: "open medidores.json | medidores metrics",
                description: "Approval rate, expired count, and speed stats",
                result: None,
            },
            Example {
                example: "open medidores.json | medidores metrics --trends --years 3",
                description: "Trend aggregations over the last three years",
                result: None,
            },
        ]
    }

    fn run(
        &self,
        _plugin: &MedidoresPlugin,
        _engine: &EngineInterface,
        call: &EvaluatedCall,
        input: PipelineData,
    ) -> Result<PipelineData, LabeledError> {
        let rows = input_rows(input);
        let result = if call.has_flag("trends")? {
            let years = call.get_flag::<i64>("years")?.unwrap_or(5).max(0) as usize;
            ops::op_trends(&rows, years)
        } else {
            ops::op_metrics(&rows)
        };
        to_pipeline(result, call.head)
    }
}
